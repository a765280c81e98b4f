//! Narrowing and combining email sources before allocation.

mod blender;
mod keyword_filter;
mod sampler;

pub use blender::{blend_pool, concat, SplitRatio};
pub use keyword_filter::{dedupe, filter, KeywordSet};
pub use sampler::{sample, sample_size};
