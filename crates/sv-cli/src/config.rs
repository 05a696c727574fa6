//! Pipeline configuration file (`survstat run --config`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sv_data::{GeneratorConfig, InspectConfig};
use sv_inference::GibbsConfig;
use sv_inference::compare::DEFAULT_ALPHA;

/// Everything `survstat run` needs. Every section and field has a default,
/// so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub generator: GeneratorConfig,
    pub inspect: InspectConfig,
    pub bayes: GibbsConfig,
    /// Significance level of the nested F-test in model selection.
    pub alpha: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            inspect: InspectConfig::default(),
            bayes: GibbsConfig::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// Read a YAML (or `.json`) pipeline configuration.
pub fn read_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: PipelineConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)
            .with_context(|| format!("parsing config {}", path.display()))?
    };
    cfg.generator.validate()?;
    cfg.bayes.validate()?;
    if !(cfg.alpha > 0.0 && cfg.alpha < 1.0) {
        anyhow::bail!("alpha must be in (0, 1), got {}", cfg.alpha);
    }
    Ok(cfg)
}
