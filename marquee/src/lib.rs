//! marquee library interface
//!
//! Reconciles "best movies" lists from many sources: titles are normalized
//! to one canonical form, per-movie metadata is deep-merged into a persistent
//! store, and list inclusions are counted into a prevalence ranking.
//!
//! Exposes public APIs for the CLI and for integration testing

pub mod adapters;
pub mod aggregator;
pub mod config;
pub mod merge;
pub mod normalizer;
pub mod orchestrator;
pub mod output;
pub mod record;
pub mod store;
pub mod types;

pub use aggregator::{Aggregator, RankedTitle};
pub use merge::{merge, LeafChange, MergeReport};
pub use normalizer::{normalize, CanonicalTitle, NormalizationError};
pub use orchestrator::{run, RunConfig, RunContext, RunReport};
pub use record::{MovieRecord, Rating};
pub use store::{storage_key, MovieStore, PutOutcome, StoreError};
pub use types::{AdapterError, EntryStream, RawEntry, SourceAdapter};
