//! Engine and application configuration.
//!
//! Settings come from an optional TOML file; command-line flags are applied
//! on top by the binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::{ColumnSelection, DetectionStrategy, EmptyCellPolicy, DEFAULT_DETECTION_THRESHOLD};

/// Default base name for archive entries and the archive itself.
pub const DEFAULT_ARCHIVE_BASE_NAME: &str = "emails";

/// How sources are turned into daily batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Sample each source to its percentage, concatenate, then slice by day.
    #[default]
    #[serde(alias = "blend")]
    Pool,
    /// Split every day between the sources by percentage.
    #[serde(alias = "ratio-split", alias = "ratio_split")]
    Ratio,
}

/// Settings for one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub column_selection: ColumnSelection,
    pub detection_strategy: DetectionStrategy,
    /// A column qualifies when its score is strictly above this.
    pub detection_threshold: f64,
    pub empty_cells: EmptyCellPolicy,
    /// Sample sources to their percentage in pool mode.
    pub enable_sampling: bool,
    pub enable_keyword_filter: bool,
    pub deduplicate: bool,
    pub blend_mode: BlendMode,
    /// Fail instead of returning short days.
    pub strict: bool,
    /// Fixed RNG seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            column_selection: ColumnSelection::Detect,
            detection_strategy: DetectionStrategy::EmailShape,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            empty_cells: EmptyCellPolicy::Keep,
            enable_sampling: true,
            enable_keyword_filter: true,
            deduplicate: false,
            blend_mode: BlendMode::Pool,
            strict: false,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn column_selection(mut self, selection: ColumnSelection) -> Self {
        self.column_selection = selection;
        self
    }

    pub fn empty_cells(mut self, policy: EmptyCellPolicy) -> Self {
        self.empty_cells = policy;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn deduplicate(mut self, dedupe: bool) -> Self {
        self.deduplicate = dedupe;
        self
    }

    pub fn sampling(mut self, enabled: bool) -> Self {
        self.enable_sampling = enabled;
        self
    }

    pub fn keyword_filter(mut self, enabled: bool) -> Self {
        self.enable_keyword_filter = enabled;
        self
    }

    /// Rejects values no run could use.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..1.0).contains(&self.detection_threshold) {
            return Err(AppError::Config(format!(
                "detection_threshold must be in [0, 1), got {}",
                self.detection_threshold
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Entries are named `{archive_base_name}_day_{n}.csv`.
    pub archive_base_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            archive_base_name: DEFAULT_ARCHIVE_BASE_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| AppError::Config(format!("Invalid config: {}", e)))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}
