//! Annotator engine: host document model, scoring client, result cache and
//! the live annotation pipeline driven by the reconciliation loop.
mod banner;
mod cache;
mod config;
pub mod discovery;
pub mod dom;
mod engine;
mod fetch;
mod filter;
mod pipeline;
mod progress;
pub mod render;
mod types;

pub use cache::ResultCache;
pub use config::{HostContract, OverlayConfig, DEFAULT_API_BASE};
pub use discovery::{scan, Card};
pub use dom::{Document, Fragment, MutationRecord, NodeId, SharedDocument};
pub use engine::{Overlay, OverlayError};
pub use fetch::{FetchSettings, ReqwestScoreFetcher, ScoreFetcher};
pub use types::{FailureKind, FetchError, Label, Score, ScoreOutcome, ScoreResult, SubjectId};
