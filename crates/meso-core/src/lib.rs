pub mod calendar;
pub mod config;
pub mod error;
pub mod outcome;
pub mod reconcile;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use calendar::*;
pub use config::*;
pub use error::*;
pub use outcome::*;
pub use reconcile::{clean_name, ExactMatcher, FuzzyMatcher, NameIndex, NameMatcher};
pub use snapshot::SnapshotProvider;
pub use traits::*;
pub use types::*;
