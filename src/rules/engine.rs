//! 强规则引擎
//!
//! 高置信度短路判定：显而易见的题型不进统计分类器。
//! 规则是一张显式的优先级表（守卫 + 动作），按表序求值、
//! 首个命中即返回，平局顺序因此是可测试的第一类制品。

use tracing::debug;

use crate::config::{RecogConfig, RuleConfig};
use crate::models::features::{answer_pattern, QuestionFeatures};
use crate::models::question::{ParsedQuestion, QuestionType, RuleDecision};

type Guard = fn(&ParsedQuestion, &QuestionFeatures, &RuleConfig) -> bool;

/// 单条规则：名称、判定题型、固定置信度、守卫条件
pub struct Rule {
    pub name: &'static str,
    pub qtype: QuestionType,
    pub confidence: f64,
    guard: Guard,
}

/// 强规则引擎
pub struct RuleEngine {
    rules: Vec<Rule>,
    config: RuleConfig,
}

impl RuleEngine {
    /// 按固定优先级构建规则表，置信度常量取自配置
    pub fn new(config: &RecogConfig) -> Self {
        let rc = config.rules;
        let rules = vec![
            Rule {
                name: "truth_answer",
                qtype: QuestionType::TrueFalse,
                confidence: rc.truth_answer_confidence,
                guard: |_, f, _| f.answer_pattern_id == answer_pattern::TRUTH_TOKEN,
            },
            Rule {
                name: "blank_markers",
                qtype: QuestionType::FillBlank,
                confidence: rc.blank_markers_confidence,
                guard: |_, f, _| {
                    (f.blank_underline_count > 0 || f.blank_parenthesis_count > 0)
                        && f.has_options == 0
                },
            },
            Rule {
                name: "multi_letter",
                qtype: QuestionType::MultipleChoice,
                confidence: rc.multi_letter_confidence,
                guard: |_, f, _| {
                    f.answer_pattern_id == answer_pattern::MULTI_LETTER && f.has_options == 1
                },
            },
            Rule {
                name: "single_letter",
                qtype: QuestionType::SingleChoice,
                confidence: rc.single_letter_confidence,
                guard: |_, f, _| {
                    f.answer_pattern_id == answer_pattern::SINGLE_LETTER && f.has_options == 1
                },
            },
            Rule {
                name: "subjective_hints",
                qtype: QuestionType::Subjective,
                confidence: rc.subjective_hints_confidence,
                guard: |_, f, rc| {
                    f.has_options == 0 && f.hint_keywords_subj >= rc.subjective_hint_min
                },
            },
        ];
        Self { rules, config: rc }
    }

    /// 应用规则表，首个命中即返回
    pub fn apply(
        &self,
        question: &ParsedQuestion,
        features: &QuestionFeatures,
    ) -> Option<RuleDecision> {
        for rule in &self.rules {
            if (rule.guard)(question, features, &self.config) {
                debug!("规则命中: {} -> {}", rule.name, rule.qtype);
                return Some(RuleDecision {
                    rule_name: rule.name,
                    qtype: rule.qtype,
                    confidence: rule.confidence,
                });
            }
        }
        debug!("无规则命中，交由分类器判定");
        None
    }

    /// 规则表（按优先级顺序）
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
