use serde::{Deserialize, Serialize};

/// Requested record count per day, in day order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPlan {
    days: Vec<u64>,
}

impl QuotaPlan {
    pub fn new(days: Vec<u64>) -> Self {
        Self { days }
    }

    pub fn days(&self) -> &[u64] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Sum of all days. Saturates instead of overflowing.
    pub fn total(&self) -> u64 {
        self.days.iter().fold(0u64, |acc, d| acc.saturating_add(*d))
    }
}

impl From<Vec<u64>> for QuotaPlan {
    fn from(days: Vec<u64>) -> Self {
        Self::new(days)
    }
}

/// Records assigned to one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBatch {
    /// 1-based day number.
    pub day: usize,
    /// Count requested by the plan.
    pub requested: u64,
    pub records: Vec<String>,
}

impl DailyBatch {
    pub fn delivered(&self) -> u64 {
        self.records.len() as u64
    }

    /// True when the sources ran out before the day's quota was met.
    pub fn is_short(&self) -> bool {
        self.delivered() < self.requested
    }
}
