//! 数据契约模块
//!
//! 定义识别流水线各阶段之间的输入输出结构。
//! 所有结构一经构建即不可变，跨线程共享时只读。

use serde::{Deserialize, Serialize};

use crate::models::features::QuestionFeatures;

/// 题型枚举
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 单选题
    SingleChoice,
    /// 多选题
    MultipleChoice,
    /// 判断题
    TrueFalse,
    /// 填空题
    FillBlank,
    /// 简答题
    Subjective,
    /// 无法判定
    Unknown,
}

impl QuestionType {
    /// 五个真实类别（不含 Unknown），分类器概率向量覆盖的范围
    pub const CLASSES: [QuestionType; 5] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::Subjective,
    ];

    /// 获取标准标签
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::Subjective => "subjective",
            QuestionType::Unknown => "unknown",
        }
    }

    /// 从标签解析题型
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "single_choice" => Some(QuestionType::SingleChoice),
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "fill_blank" => Some(QuestionType::FillBlank),
            "subjective" => Some(QuestionType::Subjective),
            "unknown" => Some(QuestionType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 文本块 - 阅读器输出的基本单元
///
/// 由外部阅读器按文档顺序产出，核心不关心其来源容器格式。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    /// 文本内容
    pub text: String,
    /// 行号（文档内序号）
    pub line_no: usize,
    /// 来源提取置信度（OCR 等），0-1
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ocr_conf: Option<f64>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, line_no: usize) -> Self {
        Self {
            text: text.into(),
            line_no,
            ocr_conf: None,
        }
    }
}

/// 文档输入 - 一份文档的全部文本块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    /// 数据源标识
    pub source_id: String,
    /// 文本块序列（文档顺序）
    pub blocks: Vec<TextBlock>,
}

/// 解析事件标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseFlags {
    /// 发生过跨行归并（选项续行）
    pub merged_lines: bool,
    /// 孤立选项被回灌到题干
    pub missing_option_marker: bool,
    /// 题干尾部答案被剥离（括注或判断符号通道）
    pub tail_answer_stripped: bool,
    /// 命中显式答案标记通道
    pub explicit_answer_marker: bool,
}

/// 解析后的题目候选
///
/// 由版面状态机对一个题目跨度构建一次，之后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedQuestion {
    /// 题干（已清理）
    pub question: String,
    /// 选项列表（插入顺序即选项字母顺序，可为空）
    #[serde(default)]
    pub options: Vec<String>,
    /// 提取到的原始答案（可为空串）
    #[serde(default)]
    pub answer_raw: String,
    /// 版面质量分数，0-1
    #[serde(default)]
    pub layout_score: f64,
    /// 解析事件标志
    #[serde(default)]
    pub parse_flags: ParseFlags,
}

impl ParsedQuestion {
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}

impl std::fmt::Display for ParsedQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 截断题干以便日志显示（最多40个字符）
        let preview = if self.question.chars().count() > 40 {
            self.question.chars().take(40).collect::<String>() + "..."
        } else {
            self.question.clone()
        };
        write!(f, "{} [选项: {}]", preview, self.options.len())
    }
}

/// 规则判定结果
///
/// 仅在某条规则命中时存在，置信度为该规则的固定常量。
#[derive(Debug, Clone, Serialize)]
pub struct RuleDecision {
    /// 命中的规则名称
    pub rule_name: &'static str,
    /// 判定题型
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    /// 固定置信度
    pub confidence: f64,
}

/// 最终判定结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// 最终题型（五类之一或 unknown）
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    /// 最终置信度，0-1
    pub confidence: f64,
    /// 是否需要人工复核
    pub needs_review: bool,
    /// 置信度是否低于全局下限（仅用于报告）
    pub is_low_confidence: bool,
}

/// 单个题目候选的完整流水线输出
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// 数据源标识（文档#题目序号）
    pub source_id: String,
    /// 解析后题目
    pub question: ParsedQuestion,
    /// 特征向量
    pub features: QuestionFeatures,
    /// 规则判定（若命中）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_decision: Option<RuleDecision>,
    /// 最终结果
    pub final_result: FinalResult,
}
