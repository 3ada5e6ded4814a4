//! 规则判定模块

pub mod engine;

pub use engine::{Rule, RuleEngine};
