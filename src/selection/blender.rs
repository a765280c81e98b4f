//! Combining two sources by percentage.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::EmailSource;
use crate::selection::sampler::sample;

/// Percentages for the primary and secondary source.
///
/// The values need not add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio {
    pub primary: f64,
    pub secondary: f64,
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self {
            primary: 100.0,
            secondary: 0.0,
        }
    }
}

impl SplitRatio {
    pub fn new(primary: f64, secondary: f64) -> Self {
        Self { primary, secondary }
    }

    /// Builds a ratio from 0, 1 or 2 submitted percentages.
    ///
    /// With none, the primary gets 100. With one, the secondary gets the
    /// remainder `100 - p1`, floored at 0.
    pub fn from_percentages(percentages: &[f64]) -> Result<Self, AppError> {
        for &p in percentages {
            if !p.is_finite() || p < 0.0 {
                return Err(AppError::InvalidPercentage {
                    value: p.to_string(),
                });
            }
        }

        match *percentages {
            [] => Ok(Self::default()),
            [primary] => Ok(Self::new(primary, (100.0 - primary).max(0.0))),
            [primary, secondary] => Ok(Self::new(primary, secondary)),
            _ => Err(AppError::InvalidRequest(format!(
                "expected at most 2 percentages, got {}",
                percentages.len()
            ))),
        }
    }
}

/// Samples each source to its percentage and concatenates the results,
/// primary first.
pub fn blend_pool<R: Rng + ?Sized>(
    primary: EmailSource,
    secondary: Option<EmailSource>,
    ratio: SplitRatio,
    rng: &mut R,
) -> EmailSource {
    let mut pool = sample(primary, ratio.primary, rng).into_records();
    if let Some(secondary) = secondary {
        pool.extend(sample(secondary, ratio.secondary, rng).into_records());
    }
    EmailSource::new(pool)
}

/// Concatenates sources without sampling.
pub fn concat(primary: EmailSource, secondary: Option<EmailSource>) -> EmailSource {
    let mut pool = primary.into_records();
    if let Some(secondary) = secondary {
        pool.extend(secondary.into_records());
    }
    EmailSource::new(pool)
}
