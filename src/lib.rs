//! A/B experimentation engine
//!
//! This library provides tools to:
//! - Bucket visitors into experiment variants (weighted or uniform) with
//!   sticky, per-visitor persisted assignments
//! - Report conversions tagged with the visitor's assigned variant
//! - Evaluate two-variant conversion experiments: z-test, p-value,
//!   confidence intervals, lift and a plain-text recommendation
//! - Plan experiments: required sample size and minimum-duration gating
//!
//! The page-rendering and data-aggregation sides live elsewhere; they ask
//! this crate which variant to show and feed it aggregated counts.

pub mod allocator;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;

// Re-export common types
pub use allocator::{allocate, RandomSource, SeededSource, ThreadRngSource};
pub use config::{ExperimentCatalog, ExperimentDefinition};
pub use error::{Error, Result};
pub use events::{EventSink, MemorySink, NullSink, TrackedEvent};
pub use session::{ExecutionContext, ExperimentSession};
pub use stats::{
    calculate_sample_size, confidence_interval, days_until_minimum_duration, format_lift,
    format_percentage, has_minimum_duration, test_significance, test_significance_default,
    ConfidenceInterval, SignificanceVerdict, VariantSample,
};
pub use storage::{AssignmentStore, JsonFileStorage, KeyValueStorage, MemoryStorage};
