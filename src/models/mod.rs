//! 数据模型模块

pub mod features;
pub mod loaders;
pub mod question;

pub use features::QuestionFeatures;
pub use question::{
    DocumentInput, FinalResult, ParsedQuestion, PipelineResult, QuestionType, RuleDecision,
    TextBlock,
};
