//! Storage and training data
//!
//! The store interface the pipeline reads from and writes to, its SQLite
//! implementation, and assembly of the training corpus.

pub mod database;
pub mod store;
pub mod training_set;

pub use database::Database;
pub use store::{GameStore, PendingOutcome};
pub use training_set::{
    FeatureWindow, Label, Labels, TrainingRow, TrainingSet, TrainingSetAssembler,
};
