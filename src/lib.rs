//! claimcheck: evidence-backed fact checking.
//!
//! [`Orchestrator::check`] takes a piece of text through claim analysis,
//! query synthesis, evidence gathering, evaluation and scoring, and returns
//! a [`FactCheckReport`].

pub mod analysis;
pub mod cache;
pub mod cancel;
pub mod credibility;
pub mod error;
pub mod evidence;
pub mod llm;
pub mod orchestrator;
pub mod query;
pub mod scoring;
pub mod state;
pub mod store;
pub mod temporal;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use error::PipelineError;
pub use orchestrator::{Collaborators, FactCheckRequest, Orchestrator};
pub use state::{AppState, PipelineConfig};
pub use types::{FactCheckReport, Verdict};
