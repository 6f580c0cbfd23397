//! 流水线的十个阶段智能体

pub mod experiment;
pub mod graph;
pub mod hypothesis;
pub mod outliner;
pub mod presenter;
pub mod reader;
pub mod reviewer;
pub mod statistics;
pub mod summarizer;
pub mod types;
pub mod writer;

pub use experiment::ExperimentAgent;
pub use graph::GraphAgent;
pub use hypothesis::HypothesisAgent;
pub use outliner::OutlinerAgent;
pub use presenter::PresenterAgent;
pub use reader::ReaderAgent;
pub use reviewer::ReviewerAgent;
pub use statistics::StatisticsAgent;
pub use summarizer::SummarizerAgent;
pub use types::*;
pub use writer::{ChapterContent, WriterAgent};
