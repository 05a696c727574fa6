//! SurvStat CLI

mod config;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use sv_data::{DataFrame, generate};
use sv_inference::{
    ModelSpec, anova, compare, compare_with_ols, fit_bayes, fit_ols, is_nested, select,
};

use config::{PipelineConfig, read_pipeline_config};

#[derive(Parser)]
#[command(name = "survstat")]
#[command(about = "SurvStat - survey satisfaction regression pipeline")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

/// Which synthetic survey to work on.
#[derive(Args, Clone, Copy)]
struct DataArgs {
    /// Generator seed
    #[arg(long, default_value = "555")]
    seed: u64,

    /// Number of respondents
    #[arg(long, default_value = "500")]
    n: usize,
}

impl DataArgs {
    fn config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.generator.seed = self.seed;
        cfg.generator.n_respondents = self.n;
        cfg
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: generate, inspect, fit, compare, sample
    Run {
        /// Pipeline config (YAML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the generator seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of respondents
        #[arg(long)]
        n: Option<usize>,

        /// Write the full report as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for plot artifacts (JSON)
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Simulate the respondent table
    Generate {
        #[command(flatten)]
        data: DataArgs,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summaries, correlations, skew and collinearity checks
    Inspect {
        #[command(flatten)]
        data: DataArgs,

        /// Write the inspection report as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ordinary least squares for one formula
    Fit {
        /// Model formula, e.g. "overall ~ clean + aroma + value:more_than_2child"
        #[arg(short, long)]
        formula: String,

        /// Z-score numeric predictors before fitting
        #[arg(long)]
        standardize: bool,

        #[command(flatten)]
        data: DataArgs,

        /// Write the fit as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two models (R², adjusted R², nested F-test, selection)
    Compare {
        /// Smaller (or first) model formula
        #[arg(long)]
        small: String,

        /// Larger (or second) model formula
        #[arg(long)]
        large: String,

        /// Significance level for selection
        #[arg(long, default_value = "0.05")]
        alpha: f64,

        #[command(flatten)]
        data: DataArgs,

        /// Write the comparison as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bayesian linear regression via Gibbs sampling
    Bayes {
        /// Model formula
        #[arg(short, long)]
        formula: String,

        /// Kept draws per chain
        #[arg(long, default_value = "10000")]
        samples: usize,

        /// Burn-in iterations per chain
        #[arg(long, default_value = "1000")]
        burnin: usize,

        /// Number of chains (run in parallel)
        #[arg(long, default_value = "1")]
        chains: usize,

        /// Thinning interval
        #[arg(long, default_value = "1")]
        thin: usize,

        /// Sampler seed
        #[arg(long, default_value = "555")]
        mcmc_seed: u64,

        #[command(flatten)]
        data: DataArgs,

        /// Write the posterior summary as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, seed, n, output, artifacts } => {
            cmd_run(config.as_ref(), seed, n, output.as_ref(), artifacts.as_ref())
        }
        Commands::Generate { data, output } => cmd_generate(data, output.as_ref()),
        Commands::Inspect { data, output } => cmd_inspect(data, output.as_ref()),
        Commands::Fit { formula, standardize, data, output } => {
            cmd_fit(&formula, standardize, data, output.as_ref())
        }
        Commands::Compare { small, large, alpha, data, output } => {
            cmd_compare(&small, &large, alpha, data, output.as_ref())
        }
        Commands::Bayes { formula, samples, burnin, chains, thin, mcmc_seed, data, output } => {
            let mut cfg = data.config();
            cfg.bayes.n_samples = samples;
            cfg.bayes.burn_in = burnin;
            cfg.bayes.n_chains = chains;
            cfg.bayes.thin = thin;
            cfg.bayes.seed = mcmc_seed;
            cmd_bayes(&formula, &cfg, output.as_ref())
        }
        Commands::Version => {
            println!("survstat {}", sv_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_run(
    config: Option<&PathBuf>,
    seed: Option<u64>,
    n: Option<usize>,
    output: Option<&PathBuf>,
    artifacts: Option<&PathBuf>,
) -> Result<()> {
    let mut cfg = match config {
        Some(path) => read_pipeline_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = seed {
        cfg.generator.seed = seed;
    }
    if let Some(n) = n {
        cfg.generator.n_respondents = n;
    }

    let result = pipeline::run_pipeline(&cfg)?;

    let mut text = String::new();
    report::pipeline_text(&mut text, &result)?;
    print!("{text}");

    if let Some(dir) = artifacts {
        pipeline::write_artifacts(&result, dir)?;
    }
    if let Some(path) = output {
        write_json(Some(path), serde_json::to_value(&result)?)?;
    }
    Ok(())
}

fn cmd_generate(data: DataArgs, output: Option<&PathBuf>) -> Result<()> {
    let cfg = data.config();
    let frame = generate(&cfg.generator)?;
    tracing::info!(seed = data.seed, rows = frame.n_rows(), "generated survey table");
    write_json(output, serde_json::to_value(&frame)?)
}

fn cmd_inspect(data: DataArgs, output: Option<&PathBuf>) -> Result<()> {
    let (_, inspection) = pipeline::prepare_frame(&data.config())?;
    let mut text = String::new();
    report::inspection_text(&mut text, &inspection)?;
    print!("{text}");
    if let Some(path) = output {
        write_json(Some(path), serde_json::to_value(&inspection)?)?;
    }
    Ok(())
}

fn load_frame(data: DataArgs) -> Result<DataFrame> {
    Ok(pipeline::prepare_frame(&data.config())?.0)
}

fn parse_formula(formula: &str) -> Result<ModelSpec> {
    formula.parse::<ModelSpec>().with_context(|| format!("invalid formula '{formula}'"))
}

fn cmd_fit(
    formula: &str,
    standardize: bool,
    data: DataArgs,
    output: Option<&PathBuf>,
) -> Result<()> {
    let spec = parse_formula(formula)?;
    let frame = load_frame(data)?;
    let fit = if standardize {
        pipeline::fit_standardized(&frame, &spec)?
    } else {
        fit_ols(&frame, &spec)?
    };
    tracing::info!(r2 = fit.r_squared, cond = fit.condition_number, "fit complete");

    let mut text = String::new();
    report::ols_table(&mut text, &fit)?;
    print!("{text}");
    if let Some(path) = output {
        write_json(Some(path), serde_json::to_value(&fit)?)?;
    }
    Ok(())
}

fn cmd_compare(
    small: &str,
    large: &str,
    alpha: f64,
    data: DataArgs,
    output: Option<&PathBuf>,
) -> Result<()> {
    let frame = load_frame(data)?;
    let a = fit_ols(&frame, &parse_formula(small)?)?;
    let b = fit_ols(&frame, &parse_formula(large)?)?;

    let comparison = compare(&a, &b);
    let test = if is_nested(&a, &b) { Some(anova(&a, &b)?) } else { None };
    let selection = select(&a, &b, alpha)?;

    let mut text = String::new();
    report::comparison_line(&mut text, &comparison)?;
    match &test {
        Some(t) => report::anova_table(&mut text, t)?,
        None => text.push_str("models are not nested; no F-test\n"),
    }
    report::selection_line(&mut text, &selection)?;
    print!("{text}");

    if let Some(path) = output {
        let value = serde_json::json!({
            "comparison": comparison,
            "anova": test,
            "selection": selection,
        });
        write_json(Some(path), value)?;
    }
    Ok(())
}

fn cmd_bayes(formula: &str, cfg: &PipelineConfig, output: Option<&PathBuf>) -> Result<()> {
    let spec = parse_formula(formula)?;
    let (frame, _) = pipeline::prepare_frame(cfg)?;
    let fit = fit_bayes(&frame, &spec, &cfg.bayes)?;
    let rows = compare_with_ols(&fit.posterior, &fit.ols)?;
    tracing::info!(
        chains = fit.posterior.n_chains,
        quality = %fit.posterior.quality.status,
        "posterior sampled"
    );

    let mut text = String::new();
    report::posterior_table(&mut text, &fit.posterior)?;
    text.push('\n');
    report::ols_vs_bayes_table(&mut text, &rows)?;
    print!("{text}");

    if let Some(path) = output {
        let value = serde_json::json!({
            "posterior": fit.posterior,
            "ols_vs_bayes": rows,
        });
        write_json(Some(path), value)?;
    }
    Ok(())
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
