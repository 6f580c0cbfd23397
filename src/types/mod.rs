pub mod agent_run;
pub mod artifacts;
pub mod document;
pub mod project;

pub use agent_run::{AgentName, AgentRun, RunStatus};
pub use artifacts::{
    ConceptNodeRecord, HypothesisRecord, OutlineRecord, PresentationRecord, StatisticRecord,
};
pub use document::Document;
pub use project::{Project, ProjectStatus};
