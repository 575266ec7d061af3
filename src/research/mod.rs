//! The query orchestration pipeline.
//!
//! `QueryOrchestrator` drives the end-to-end flow: validate the request,
//! pull prior context from the world model, expand the question into search
//! queries, fan the queries out against the user's trusted domains, analyze
//! the results (multi-agent when a coordinator is wired, a single analyst
//! call otherwise), optionally run the critic loop, and hand the finished
//! answer back while knowledge extraction continues in the background.

pub mod critic;
pub mod expander;
pub mod fanout;
pub mod orchestrator;
pub mod worldmodel;

pub use critic::CriticService;
pub use expander::QueryExpander;
pub use fanout::SearchFanout;
pub use orchestrator::QueryOrchestrator;
pub use worldmodel::{KnowledgeSummary, WorldModelService};
