//! EdgeSync Engine
//!
//! Incremental synchronization and long-running-operation polling for an
//! edge-node backend:
//!
//! - A recurring, single-concurrency sync job mirrors newly-created knowledge
//!   assets from the runtime node's database into the local backend database,
//!   driven by a high-water-mark cursor derived from the local store.
//! - A pipeline client submits files to the knowledge-mining service and
//!   polls runs until they reach a terminal state.
//!
//! The engine consumes its collaborators through capability seams: the
//! remote parameter service ([`params::ParamsClient`]), the runtime-node
//! query capability ([`source::AssetSource`]), and the local persistence
//! capability ([`store::AssetStore`]). It exposes no network listener of its
//! own.

pub mod config;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use error::{EngineError, EngineResult, PipelineError, PipelineResult};
pub use sync::{SyncEngine, SyncOutcome};
