//! Report module - terminal summaries and metric exports

pub mod metrics_export;
pub mod summary;

pub use metrics_export::*;
pub use summary::*;
