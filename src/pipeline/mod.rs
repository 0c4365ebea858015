//! Pipeline module - the cleaning, feature and preparation stages

pub mod columns;
pub mod dictionary;
pub mod dtypes;
pub mod features;
pub mod loader;
pub mod matrix;
pub mod missing;
pub mod sampling;
pub mod scaling;
pub mod split;
pub mod target;
pub mod workflow;

pub use dictionary::{load_dictionary, SchemaDictionary};
pub use dtypes::normalize_types;
pub use features::{add_features, FeatureReport, OutlierPolicy, Ratio};
pub use loader::{load_dataset, save_dataset, write_predictions};
pub use matrix::FeatureMatrix;
pub use missing::{analyze_missing_values, resolve_missing_values, ColumnDisposition, DispositionTable, MissingReport};
pub use sampling::{sample_file, sample_rows};
pub use scaling::{normalize_partitions, MinMaxScaler, ScalingStrategy};
pub use split::{split_and_rebalance, train_test_split, undersample, Split, SplitReport};
pub use target::{add_target_variable, LabelSummary, TARGET_COLUMN};
pub use workflow::*;
