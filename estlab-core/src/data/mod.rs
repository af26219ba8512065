//! Estimate collection, merging, and dataset persistence

pub mod builder;
pub mod circuit_breaker;
pub mod collect;
pub mod merge;
pub mod provider;
pub mod store;
pub mod universe;
pub mod yahoo;

pub use builder::BuildError;
pub use circuit_breaker::CircuitBreaker;
pub use collect::{CollectProgress, CollectionOutcome, StdoutProgress};
pub use merge::MergeError;
pub use provider::{AnalysisPayload, AnalysisProvider, ProviderError, Ticker};
pub use store::{DatasetMeta, DatasetStore, StoreError};
pub use universe::Universe;
pub use yahoo::YahooAnalysisProvider;
