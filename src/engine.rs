//! End-to-end allocation: tables in, daily batches out.
//!
//! Every step runs in memory and holds no state between calls. All fatal
//! conditions surface before any batch is returned.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::allocation::{
    allocate_pool, allocate_ratio, ensure_complete, AllocationSummary, DailyBatch, QuotaPlan,
};
use crate::config::{BlendMode, EngineConfig};
use crate::error::AppError;
use crate::ingest::{select_column, ColumnDetector, EmailSource, Table};
use crate::selection::{blend_pool, concat, dedupe, filter, KeywordSet, SplitRatio};

/// Maximum number of input tables per run.
pub const MAX_SOURCES: usize = 2;

/// Inputs for one allocation run.
#[derive(Debug, Clone, Default)]
pub struct AllocationRequest {
    /// One or two parsed uploads, primary first.
    pub sources: Vec<Table>,
    /// Zero to two percentages; see [`SplitRatio::from_percentages`].
    pub percentages: Vec<f64>,
    pub plan: QuotaPlan,
    pub keywords: KeywordSet,
}

/// Record counts for one source as it moved through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub column: usize,
    pub extracted: usize,
    pub after_filter: usize,
    pub after_dedupe: usize,
}

/// Result of one allocation run.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub batches: Vec<DailyBatch>,
    pub summary: AllocationSummary,
    pub sources: Vec<SourceStats>,
    /// Records available to the allocator after blending (pool mode) or the
    /// sum of both sources (ratio mode).
    pub pool_size: usize,
}

/// Runs an allocation with an RNG seeded from `config.seed`, or from the OS
/// when no seed is set.
pub fn allocate_batches(
    request: AllocationRequest,
    config: &EngineConfig,
) -> Result<Allocation, AppError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    allocate_batches_with_rng(request, config, &mut rng)
}

/// Runs an allocation using the given RNG for sampling.
pub fn allocate_batches_with_rng<R: Rng + ?Sized>(
    request: AllocationRequest,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Allocation, AppError> {
    config.validate()?;

    if request.sources.is_empty() || request.sources.len() > MAX_SOURCES {
        return Err(AppError::InvalidRequest(format!(
            "expected 1 or {} source files, got {}",
            MAX_SOURCES,
            request.sources.len()
        )));
    }

    let ratio = SplitRatio::from_percentages(&request.percentages)?;

    let detector = ColumnDetector::new(config.detection_strategy.classifier())
        .with_threshold(config.detection_threshold);

    // Extract everything first so a bad second file fails before any work.
    let mut extracted = Vec::with_capacity(request.sources.len());
    let mut stats = Vec::with_capacity(request.sources.len());

    for (source_index, table) in request.sources.iter().enumerate() {
        let (source, source_stats) =
            prepare_source(table, source_index, config, &detector, &request.keywords)?;
        extracted.push(source);
        stats.push(source_stats);
    }

    let mut extracted = extracted.into_iter();
    let primary = extracted.next().unwrap_or_default();
    let secondary = extracted.next();

    let (batches, pool_size) = match config.blend_mode {
        BlendMode::Pool => {
            let pool = if config.enable_sampling {
                blend_pool(primary, secondary, ratio, rng)
            } else {
                concat(primary, secondary)
            };
            (allocate_pool(&request.plan, &pool), pool.len())
        }
        BlendMode::Ratio => {
            let pool_size = primary.len() + secondary.as_ref().map_or(0, EmailSource::len);
            (
                allocate_ratio(&request.plan, &primary, secondary.as_ref(), ratio),
                pool_size,
            )
        }
    };

    if config.strict {
        ensure_complete(&batches)?;
    }

    let summary = AllocationSummary::from_batches(&batches);

    Ok(Allocation {
        batches,
        summary,
        sources: stats,
        pool_size,
    })
}

/// Column selection, keyword filter and dedupe for one table.
fn prepare_source(
    table: &Table,
    source_index: usize,
    config: &EngineConfig,
    detector: &ColumnDetector,
    keywords: &KeywordSet,
) -> Result<(EmailSource, SourceStats), AppError> {
    let column = select_column(table, source_index, config.column_selection, detector)?;
    let source = EmailSource::from_column(table, source_index, column, config.empty_cells)?;
    let extracted = source.len();

    let source = if config.enable_keyword_filter {
        filter(source, keywords)?
    } else {
        source
    };
    let after_filter = source.len();

    let source = if config.deduplicate {
        dedupe(source)
    } else {
        source
    };

    let stats = SourceStats {
        column,
        extracted,
        after_filter,
        after_dedupe: source.len(),
    };

    Ok((source, stats))
}
