pub mod handler;
pub mod orchestrator;
pub mod tagger;
pub mod text;

pub use handler::{CrumbHandler, Domain};
pub use orchestrator::{IngestReport, Orchestrator, SourceCount};
