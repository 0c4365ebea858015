//! CLI module - argument parsing

mod args;

pub use args::{Cli, Commands, DictionaryArgs, FeatureArgs, TrainingArgs, DEFAULT_DICTIONARY};
