//! 特征提取模块
//!
//! 把一个题目候选映射为固定结构的数值特征，纯函数且全域：
//! 任何输入都落入某个默认/零值特征，不存在失败路径。
//! 词表全部来自配置注入，提取器本身不内置词汇。

use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::RecogConfig;
use crate::models::features::{answer_pattern, QuestionFeatures};
use crate::models::question::ParsedQuestion;

/// 特征提取器
pub struct FeatureExtractor {
    multi_choice_keywords: Vec<String>,
    true_false_keywords: Vec<String>,
    fill_blank_keywords: Vec<String>,
    subjective_keywords: Vec<String>,
    truth_tokens: HashSet<String>,
    single_letter: Regex,
    multi_letter: Regex,
    punct: Regex,
    question_mark: Regex,
    blank_underline: Regex,
    blank_pair: Regex,
    long_answer_threshold: usize,
}

impl FeatureExtractor {
    /// 创建新的特征提取器，词表与阈值取自配置
    pub fn new(config: &RecogConfig) -> Result<Self> {
        let vocab = &config.vocab;
        Ok(Self {
            multi_choice_keywords: vocab.multi_choice_keywords.clone(),
            true_false_keywords: vocab.true_false_keywords.clone(),
            fill_blank_keywords: vocab.fill_blank_keywords.clone(),
            subjective_keywords: vocab.subjective_keywords.clone(),
            truth_tokens: vocab.truth_tokens.iter().cloned().collect(),
            single_letter: Regex::new(r"^[A-F]$").context("单字母答案模式编译失败")?,
            multi_letter: Regex::new(r"^[A-F]{2,6}$").context("多字母答案模式编译失败")?,
            punct: Regex::new(
                "[。，！？；：、“”‘’（）【】《》〈〉.,!?;:()\\[\\]<>\"]",
            )
            .context("标点模式编译失败")?,
            question_mark: Regex::new(r"[？?]").context("问号模式编译失败")?,
            blank_underline: Regex::new(r"_{2,}").context("下划线空白模式编译失败")?,
            blank_pair: Regex::new(r"（\s*）|\(\s*\)|【\s*】").context("括号空白模式编译失败")?,
            long_answer_threshold: config.features.long_answer_threshold,
        })
    }

    /// 提取题目特征
    pub fn extract(&self, question: &ParsedQuestion) -> QuestionFeatures {
        let stem = question.question.as_str();
        let answer = question.answer_raw.trim();
        let stem_chars = stem.chars().count();
        let answer_pattern_id = self.classify_answer(answer);

        QuestionFeatures {
            has_options: u8::from(question.has_options()),
            num_options: question.options.len(),
            answer_is_single_letter: u8::from(answer_pattern_id == answer_pattern::SINGLE_LETTER),
            answer_is_multi_letters: u8::from(answer_pattern_id == answer_pattern::MULTI_LETTER),
            question_len: stem_chars,
            option_len_mean: option_len_mean(&question.options),
            answer_len: answer.chars().count(),
            punct_density: self.punct_density(stem, stem_chars),
            question_mark_count: self.question_mark.find_iter(stem).count(),
            hint_keywords_multi: count_hits(stem, &self.multi_choice_keywords),
            hint_keywords_tf: count_hits(stem, &self.true_false_keywords),
            hint_keywords_blank: count_hits(stem, &self.fill_blank_keywords),
            hint_keywords_subj: count_hits(stem, &self.subjective_keywords),
            blank_underline_count: self.blank_underline.find_iter(stem).count(),
            blank_parenthesis_count: self.blank_pair.find_iter(stem).count(),
            option_alignment_score: option_alignment_score(&question.options),
            layout_score: question.layout_score.clamp(0.0, 1.0),
            answer_pattern_id,
        }
    }

    /// 答案形态分类，全域函数
    ///
    /// 判定顺序：判断词符 → 单字母 → 多字母 → 纯数字 → 长文本 → 未识别。
    fn classify_answer(&self, answer: &str) -> u8 {
        if self.truth_tokens.contains(answer) {
            answer_pattern::TRUTH_TOKEN
        } else if self.single_letter.is_match(answer) {
            answer_pattern::SINGLE_LETTER
        } else if self.multi_letter.is_match(answer) {
            answer_pattern::MULTI_LETTER
        } else if !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit()) {
            answer_pattern::NUMERIC
        } else if answer.chars().count() > self.long_answer_threshold {
            answer_pattern::LONG_TEXT
        } else {
            answer_pattern::UNRECOGNIZED
        }
    }

    fn punct_density(&self, stem: &str, stem_chars: usize) -> f64 {
        if stem_chars == 0 {
            return 0.0;
        }
        let punct_count = self.punct.find_iter(stem).count();
        (punct_count as f64 / stem_chars as f64).clamp(0.0, 1.0)
    }
}

/// 词表命中计数：每个出现在题干中的词条计 1
fn count_hits(stem: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|kw| stem.contains(kw.as_str())).count()
}

fn option_len_mean(options: &[String]) -> f64 {
    if options.is_empty() {
        return 0.0;
    }
    let total: usize = options.iter().map(|o| o.chars().count()).sum();
    total as f64 / options.len() as f64
}

/// 选项对齐度：1 减去选项长度的变异系数，截断到 [0,1]
///
/// 长度接近一致的选项组得分接近 1，长度悬殊的得分趋近 0；
/// 这是结构质量信号，不是内容信号。
fn option_alignment_score(options: &[String]) -> f64 {
    if options.len() < 2 {
        return 0.0;
    }
    let lengths: Vec<f64> = options.iter().map(|o| o.chars().count() as f64).collect();
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
    let cv = variance.sqrt() / mean;
    (1.0 - cv).clamp(0.0, 1.0)
}
