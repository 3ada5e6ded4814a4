//! # Question Recog
//!
//! 把非结构化的试卷文本识别为带校准置信度的题型记录
//! （单选、多选、判断、填空、简答）。
//!
//! ## 架构设计
//!
//! 本系统按依赖顺序分为四层：
//!
//! ### ① 数据契约层（Models）
//! - `models/` - 各阶段之间的不可变数据结构
//! - `TextBlock` → `ParsedQuestion` → `QuestionFeatures` → `PipelineResult`
//! - `models/loaders` - 纯文本阅读器边界
//!
//! ### ② 判定能力层（Stages）
//! - `parsing/` - 版面状态机：文本块 → 题目候选
//! - `features/` - 特征提取：题目候选 → 固定结构特征向量
//! - `rules/` - 强规则引擎：显而易见的题型短路判定
//! - `classify/` - 外部分类器边界（注入的打分能力）
//! - `calibrate/` - 每类别单调概率校准 + ECE 诊断
//! - `decision` - 阈值判定表：规则 ⊕ 概率 → 最终结果
//!
//! ### ③ 流程层（Pipeline）
//! - `pipeline` - 定义"一个题目候选"的完整判定流程
//! - 各阶段纯同步，装载后资源只读，跨线程安全共享
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量文档处理器，管理并发和统计
//!
//! ## 模块结构

pub mod calibrate;
pub mod classify;
pub mod config;
pub mod decision;
pub mod error;
pub mod features;
pub mod models;
pub mod orchestrator;
pub mod parsing;
pub mod pipeline;
pub mod rules;
pub mod utils;

// 重新导出常用类型
pub use calibrate::{expected_calibration_error, IsotonicCalibrator};
pub use classify::{ClassProbabilities, TypeScorer};
pub use config::RecogConfig;
pub use error::{RecogError, RecogResult};
pub use features::FeatureExtractor;
pub use models::question::{
    DocumentInput, FinalResult, ParsedQuestion, PipelineResult, QuestionType, TextBlock,
};
pub use orchestrator::{App, ProcessingStats};
pub use parsing::LayoutStateMachine;
pub use pipeline::RecognitionPipeline;
pub use rules::RuleEngine;
