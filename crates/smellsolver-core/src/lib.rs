//! Smellsolver core library: finds smelly source comments touched by a pull
//! request, suggests replacements and keeps a ledger of every finding.
//!
//! The flow for one pull request is extract → locate → diff filter →
//! classify → rewrite → post → record. Classification, rewriting and
//! posting are delegated to implementations of the traits in [`oracle`].

pub mod config;
pub mod diff;
pub mod errors;
pub mod event;
pub mod extract;
pub mod language;
pub mod locate;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod rewrite;
pub mod store;

pub use errors::{SmellError, SmellResult};
pub use pipeline::{AnalysisRequest, Analyzer, ChangedFile, FileReport};
pub use store::Ledger;
