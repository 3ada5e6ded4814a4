//! 判定策略
//!
//! 无状态的纯判定表：融合可选的规则判定、校准后的概率向量
//! 和按类别配置的阈值对（复核 ≤ 接受），输出最终结果。
//! 规则判定优先于分类器输出；除一次 argmax 和两次比较外
//! 没有任何迭代。

use crate::classify::ClassProbabilities;
use crate::config::ThresholdConfig;
use crate::models::question::{FinalResult, QuestionType, RuleDecision};

/// 融合规则与概率输出最终判定
///
/// - 规则命中：题型与置信度取自规则，仅当置信度低于该类复核
///   阈值时标记复核（规则常量通常配置在阈值之上）。
/// - 规则未命中且有概率向量：取 argmax 类别；置信度低于复核
///   阈值则强制 unknown，介于复核与接受之间保留题型但标记复核。
/// - 两者皆无（分类器缺失）：unknown，置信度 0，标记复核。
pub fn decide(
    rule: Option<&RuleDecision>,
    probabilities: Option<&ClassProbabilities>,
    thresholds: &ThresholdConfig,
) -> FinalResult {
    let (qtype, confidence) = match (rule, probabilities) {
        (Some(decision), _) => (decision.qtype, decision.confidence),
        (None, Some(probs)) => match arg_max(probs) {
            Some(best) => best,
            None => (QuestionType::Unknown, 0.0),
        },
        (None, None) => (QuestionType::Unknown, 0.0),
    };

    let review_threshold = thresholds.review.get(qtype);
    let accept_threshold = thresholds.accept.get(qtype);

    let (final_type, needs_review) = if qtype == QuestionType::Unknown {
        (QuestionType::Unknown, true)
    } else if rule.is_some() {
        (qtype, confidence < review_threshold)
    } else if confidence < review_threshold {
        // 低于复核阈值：不采信 argmax，强制 unknown
        (QuestionType::Unknown, true)
    } else {
        (qtype, confidence < accept_threshold)
    };

    FinalResult {
        qtype: final_type,
        confidence,
        needs_review,
        is_low_confidence: confidence < thresholds.min_confidence,
    }
}

/// 概率向量的 argmax；并列时按 BTreeMap 遍历顺序取第一个
fn arg_max(probs: &ClassProbabilities) -> Option<(QuestionType, f64)> {
    let mut best: Option<(QuestionType, f64)> = None;
    for (qtype, p) in probs {
        match best {
            Some((_, bp)) if *p <= bp => {}
            _ => best = Some((*qtype, *p)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecogConfig;

    fn thresholds() -> ThresholdConfig {
        RecogConfig::default().thresholds
    }

    fn probs(pairs: &[(QuestionType, f64)]) -> ClassProbabilities {
        pairs.iter().copied().collect()
    }

    #[test]
    fn rule_decision_takes_precedence() {
        let rule = RuleDecision {
            rule_name: "truth_answer",
            qtype: QuestionType::TrueFalse,
            confidence: 0.95,
        };
        // 概率向量指向别的类别也会被规则覆盖
        let p = probs(&[(QuestionType::Subjective, 0.99)]);
        let result = decide(Some(&rule), Some(&p), &thresholds());
        assert_eq!(result.qtype, QuestionType::TrueFalse);
        assert_eq!(result.confidence, 0.95);
        assert!(!result.needs_review);
    }

    #[test]
    fn argmax_above_accept_is_trusted() {
        let p = probs(&[
            (QuestionType::SingleChoice, 0.85),
            (QuestionType::MultipleChoice, 0.10),
            (QuestionType::Subjective, 0.05),
        ]);
        let result = decide(None, Some(&p), &thresholds());
        assert_eq!(result.qtype, QuestionType::SingleChoice);
        assert_eq!(result.confidence, 0.85);
        assert!(!result.needs_review);
        assert!(!result.is_low_confidence);
    }

    #[test]
    fn between_review_and_accept_keeps_type_but_flags_review() {
        let p = probs(&[
            (QuestionType::SingleChoice, 0.6),
            (QuestionType::Subjective, 0.4),
        ]);
        let result = decide(None, Some(&p), &thresholds());
        assert_eq!(result.qtype, QuestionType::SingleChoice);
        assert!(result.needs_review);
    }

    #[test]
    fn below_review_forces_unknown() {
        let p = probs(&[
            (QuestionType::SingleChoice, 0.3),
            (QuestionType::Subjective, 0.25),
        ]);
        let result = decide(None, Some(&p), &thresholds());
        assert_eq!(result.qtype, QuestionType::Unknown);
        assert!(result.needs_review);
        assert!(result.is_low_confidence);
    }

    #[test]
    fn missing_classifier_yields_unknown_zero() {
        let result = decide(None, None, &thresholds());
        assert_eq!(result.qtype, QuestionType::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert!(result.needs_review);
    }

    #[test]
    fn review_invariants_hold_across_confidence_sweep() {
        // 不变式：confidence < review ⇒ needs_review；
        //         confidence ≥ accept ⇒ !needs_review
        let t = thresholds();
        for i in 0..=100 {
            let conf = i as f64 / 100.0;
            let p = probs(&[(QuestionType::FillBlank, conf)]);
            let result = decide(None, Some(&p), &t);
            if conf < t.review.fill_blank {
                assert!(result.needs_review, "conf={}", conf);
            }
            if conf >= t.accept.fill_blank {
                assert!(!result.needs_review, "conf={}", conf);
                assert_eq!(result.qtype, QuestionType::FillBlank);
            }
        }
    }

    #[test]
    fn asymmetric_thresholds_apply_per_class() {
        // 主观题接受阈值更宽松：同一置信度下主观题可接受而单选题需复核
        let t = thresholds();
        let conf = 0.65;
        let subj = decide(None, Some(&probs(&[(QuestionType::Subjective, conf)])), &t);
        let single = decide(None, Some(&probs(&[(QuestionType::SingleChoice, conf)])), &t);
        assert!(!subj.needs_review);
        assert!(single.needs_review);
    }

    #[test]
    fn rule_below_review_threshold_still_flags_review() {
        let rule = RuleDecision {
            rule_name: "subjective_hints",
            qtype: QuestionType::Subjective,
            confidence: 0.2,
        };
        let result = decide(Some(&rule), None, &thresholds());
        assert_eq!(result.qtype, QuestionType::Subjective);
        assert!(result.needs_review);
    }
}
