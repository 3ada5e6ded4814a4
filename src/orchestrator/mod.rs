//! 编排层模块
//!
//! 持有只读的流水线资源，按批并发处理文档并汇总统计。

pub mod batch_processor;

pub use batch_processor::{App, ProcessingStats};
