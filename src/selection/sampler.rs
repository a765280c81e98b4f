//! Random percentage sampling without replacement.

use rand::seq::index;
use rand::Rng;

use crate::ingest::EmailSource;

/// Number of records kept when sampling `len` records at `percentage`.
///
/// Rounds down; non-positive or NaN percentages give zero.
pub fn sample_size(len: usize, percentage: f64) -> usize {
    if percentage >= 100.0 {
        return len;
    }
    // `as` saturates: negatives and NaN become 0.
    ((len as f64 * percentage / 100.0).floor() as usize).min(len)
}

/// Returns a uniformly random `percentage`% of `source`.
///
/// The result is in random order. At 100% or more the source is returned
/// unchanged, without shuffling.
pub fn sample<R: Rng + ?Sized>(source: EmailSource, percentage: f64, rng: &mut R) -> EmailSource {
    if percentage >= 100.0 {
        return source;
    }

    let amount = sample_size(source.len(), percentage);
    if amount == 0 {
        return EmailSource::default();
    }

    let records = source.records();
    index::sample(rng, records.len(), amount)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}
