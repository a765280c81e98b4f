//! Day-by-day allocation of email records against a quota plan.

mod allocator;
mod quota;

pub use allocator::{
    allocate_pool, allocate_ratio, ensure_complete, primary_share, AllocationSummary,
};
pub use quota::{DailyBatch, QuotaPlan};
