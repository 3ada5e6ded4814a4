//! 版面解析模块

pub mod layout;

pub use layout::{fold_fullwidth, LayoutStateMachine};
