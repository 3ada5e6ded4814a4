//! 题目特征结构
//!
//! 固定字段的数值特征记录。字段顺序即特征向量顺序：
//! `feature_names()` 与 `to_array()` 必须始终位置对齐，
//! 下游分类器按位置消费，规则引擎按名称消费。

use serde::{Deserialize, Serialize};

/// 答案模式编码
pub mod answer_pattern {
    /// 未识别
    pub const UNRECOGNIZED: u8 = 0;
    /// 单个选项字母
    pub const SINGLE_LETTER: u8 = 1;
    /// 多个选项字母
    pub const MULTI_LETTER: u8 = 2;
    /// 判断类词符
    pub const TRUTH_TOKEN: u8 = 3;
    /// 超过长度阈值的自由文本
    pub const LONG_TEXT: u8 = 4;
    /// 纯数字短词符
    pub const NUMERIC: u8 = 5;
}

/// 题目特征向量（固定结构，构建后不再修改）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeatures {
    /// 是否有选项（0/1）
    pub has_options: u8,
    /// 选项数量
    pub num_options: usize,
    /// 答案是否为单字母（0/1）
    pub answer_is_single_letter: u8,
    /// 答案是否为多字母（0/1）
    pub answer_is_multi_letters: u8,
    /// 题干长度（字符数）
    pub question_len: usize,
    /// 选项平均长度
    pub option_len_mean: f64,
    /// 答案长度（字符数）
    pub answer_len: usize,
    /// 标点密度（0-1）
    pub punct_density: f64,
    /// 问号数量
    pub question_mark_count: usize,
    /// 多选提示词命中数
    pub hint_keywords_multi: usize,
    /// 判断提示词命中数
    pub hint_keywords_tf: usize,
    /// 填空提示词命中数
    pub hint_keywords_blank: usize,
    /// 简答提示词命中数
    pub hint_keywords_subj: usize,
    /// 下划线空白标记数
    pub blank_underline_count: usize,
    /// 空括号空白标记数
    pub blank_parenthesis_count: usize,
    /// 选项对齐度（0-1）
    pub option_alignment_score: f64,
    /// 版面质量分数（0-1）
    pub layout_score: f64,
    /// 答案模式编码，见 [`answer_pattern`]
    pub answer_pattern_id: u8,
}

/// 特征名称表，顺序与 [`QuestionFeatures::to_array`] 严格一致
pub const FEATURE_NAMES: [&str; 18] = [
    "has_options",
    "num_options",
    "answer_is_single_letter",
    "answer_is_multi_letters",
    "question_len",
    "option_len_mean",
    "answer_len",
    "punct_density",
    "question_mark_count",
    "hint_keywords_multi",
    "hint_keywords_tf",
    "hint_keywords_blank",
    "hint_keywords_subj",
    "blank_underline_count",
    "blank_parenthesis_count",
    "option_alignment_score",
    "layout_score",
    "answer_pattern_id",
];

impl QuestionFeatures {
    /// 获取稳定的特征名称顺序
    pub fn feature_names() -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    /// 转换为数值数组，位置与 [`FEATURE_NAMES`] 对齐
    pub fn to_array(&self) -> Vec<f64> {
        vec![
            f64::from(self.has_options),
            self.num_options as f64,
            f64::from(self.answer_is_single_letter),
            f64::from(self.answer_is_multi_letters),
            self.question_len as f64,
            self.option_len_mean,
            self.answer_len as f64,
            self.punct_density,
            self.question_mark_count as f64,
            self.hint_keywords_multi as f64,
            self.hint_keywords_tf as f64,
            self.hint_keywords_blank as f64,
            self.hint_keywords_subj as f64,
            self.blank_underline_count as f64,
            self.blank_parenthesis_count as f64,
            self.option_alignment_score,
            self.layout_score,
            f64::from(self.answer_pattern_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_and_names_stay_aligned() {
        let features = QuestionFeatures {
            num_options: 4,
            answer_pattern_id: answer_pattern::SINGLE_LETTER,
            layout_score: 0.9,
            ..Default::default()
        };
        let array = features.to_array();
        assert_eq!(array.len(), FEATURE_NAMES.len());

        // 按名称抽查几个位置
        let pos = |name: &str| FEATURE_NAMES.iter().position(|n| *n == name).unwrap();
        assert_eq!(array[pos("num_options")], 4.0);
        assert_eq!(array[pos("answer_pattern_id")], 1.0);
        assert_eq!(array[pos("layout_score")], 0.9);
    }

    #[test]
    fn default_features_are_all_zero() {
        let array = QuestionFeatures::default().to_array();
        assert!(array.iter().all(|v| *v == 0.0));
    }
}
