//! 外部分类器边界
//!
//! 核心只消费一个训练好的打分器，不实现统计学习算法本身。
//! 打分器作为注入的能力对象存在，便于用确定性桩替换测试。

use std::collections::BTreeMap;

use anyhow::Result;

use crate::models::question::QuestionType;

/// 各类别概率向量
///
/// 用 BTreeMap 保证遍历顺序确定，argmax 在并列时可复现。
pub type ClassProbabilities = BTreeMap<QuestionType, f64>;

/// 题型打分能力（外部统计分类器的数值契约）
///
/// `features` 的顺序必须与 [`crate::models::features::FEATURE_NAMES`] 一致。
/// 加载后的打分器参数只读，可跨线程共享。
pub trait TypeScorer: Send + Sync {
    /// 对一个特征向量打分，返回各类别概率
    fn classify(&self, features: &[f64]) -> Result<ClassProbabilities>;
}
