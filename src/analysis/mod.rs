//! Analysis modules.
//!
//! Statistics over loaded task results and the join of results with their
//! memories.

pub mod aggregator;
pub mod joiner;

pub use aggregator::*;
pub use joiner::{join, join_task};
