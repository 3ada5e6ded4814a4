//! 版面状态机解析器
//!
//! 负责把有序文本块切分、归并为结构化题目候选。
//! 单次确定性遍历：先按题号边界切分跨度，再对每个跨度走
//! `InStem → InOptions → SeekAnswer` 状态机；流结束时无条件
//! 冲刷最后一个跨度，残缺状态不丢弃。
//!
//! 答案提取为多通道、固定优先级：
//! 1. 显式标记行（答案/正确答案/参考答案 + 分隔符）
//! 2. 题干尾部括注
//! 3. 题干尾部判断符号
//! 高优先级通道成功后不再咨询低优先级通道。

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::{LayoutConfig, RecogConfig};
use crate::models::question::{ParseFlags, ParsedQuestion, TextBlock};

/// 解析状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// 等待题目边界
    SeekStart,
    /// 累积题干
    InStem,
    /// 累积选项
    InOptions,
    /// 显式标记后等待答案文本
    SeekAnswer,
}

/// OCR 误识符号归一映射（仅对单字符答案应用）
static SYMBOL_FOLD: phf::Map<char, &'static str> = phf::phf_map! {
    '∨' => "√",
    'v' => "√",
    'V' => "√",
    'x' => "×",
    'X' => "×",
    '*' => "×",
};

/// 单个题目跨度的累积状态
#[derive(Debug, Default)]
struct SpanAccumulator {
    stem_lines: Vec<String>,
    options: Vec<String>,
    answer_raw: String,
    flags: ParseFlags,
    ocr_confs: Vec<f64>,
    total_chars: usize,
    resume: Option<ParseState>,
}

impl SpanAccumulator {
    fn consume_meta(&mut self, block: &TextBlock, trimmed: &str) {
        if let Some(conf) = block.ocr_conf {
            self.ocr_confs.push(conf);
        }
        self.total_chars += trimmed.chars().count();
    }
}

/// 版面状态机解析器
pub struct LayoutStateMachine {
    question_start: Vec<Regex>,
    option_trigger: Regex,
    answer_marker: Regex,
    tail_parenthetical: Regex,
    tail_truth_symbol: Regex,
    layout: LayoutConfig,
}

impl LayoutStateMachine {
    /// 创建新的状态机，编译全部版面模式
    pub fn new(config: &RecogConfig) -> Result<Self> {
        let question_start = [
            r"^\d+\s*[\.、]\s*",
            r"^第\d+题[:：]?\s*",
            r"^[\(（]\d+[\)）]\s*",
        ]
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("题目边界模式编译失败: {}", p)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            question_start,
            option_trigger: Regex::new(r"^[A-Fa-fＡ-Ｆａ-ｆ]\s*[\.、\)）\]】:：]\s*")
                .context("选项触发模式编译失败")?,
            answer_marker: Regex::new(r"^(?:【答案】|(?:正确答案|参考答案|答案)\s*[:：])\s*(.*)$")
                .context("答案标记模式编译失败")?,
            tail_parenthetical: Regex::new(r"[(（]\s*([^()（）]+?)\s*[)）]\s*$")
                .context("尾部括注模式编译失败")?,
            tail_truth_symbol: Regex::new(
                r"(?:^|[\s:：。；，])(对|错|√|×|✓|✗|True|False|T|F)\s*$",
            )
            .context("尾部判断符号模式编译失败")?,
            layout: config.layout,
        })
    }

    /// 解析文本块序列为题目候选列表
    ///
    /// 每检测到一个题目边界就产出一个 `ParsedQuestion`；
    /// 边界之前的文本块被消费但不贡献内容。
    pub fn parse(&self, blocks: &[TextBlock]) -> Vec<ParsedQuestion> {
        let mut questions = Vec::new();
        let mut acc: Option<SpanAccumulator> = None;
        let mut state = ParseState::SeekStart;

        for block in blocks {
            let text = block.text.trim();

            if !text.is_empty() && self.is_question_start(text) {
                if let Some(done) = acc.take() {
                    questions.push(self.flush(done));
                }
                let mut fresh = SpanAccumulator::default();
                fresh.consume_meta(block, text);
                fresh.stem_lines.push(self.strip_enumerator(text));
                acc = Some(fresh);
                state = ParseState::InStem;
                continue;
            }

            let Some(current) = acc.as_mut() else {
                // 首个题目边界之前的内容（标题、说明等）不属于任何候选
                debug!("跳过边界前文本块: 行 {}", block.line_no);
                continue;
            };

            if text.is_empty() {
                continue;
            }
            current.consume_meta(block, text);

            // 显式答案标记通道：任何状态下优先识别，首个命中生效
            if let Some(caps) = self.answer_marker.captures(text) {
                if current.answer_raw.is_empty() {
                    let payload = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                    current.flags.explicit_answer_marker = true;
                    if payload.is_empty() {
                        current.resume = Some(state);
                        state = ParseState::SeekAnswer;
                    } else {
                        current.answer_raw = payload.to_string();
                    }
                }
                continue;
            }

            match state {
                ParseState::SeekStart => unreachable!("存在累积跨度时不会处于 SeekStart"),
                ParseState::InStem => {
                    if let Some(m) = self.option_trigger.find(text) {
                        current.options.push(text[m.end()..].trim().to_string());
                        state = ParseState::InOptions;
                    } else {
                        current.stem_lines.push(text.to_string());
                    }
                }
                ParseState::InOptions => {
                    if let Some(m) = self.option_trigger.find(text) {
                        current.options.push(text[m.end()..].trim().to_string());
                    } else if let Some(last) = current.options.last_mut() {
                        // 软归并：无标记行视为上一选项的续行
                        last.push(' ');
                        last.push_str(text);
                        current.flags.merged_lines = true;
                    }
                }
                ParseState::SeekAnswer => {
                    current.answer_raw = text.to_string();
                    state = current.resume.take().unwrap_or(ParseState::InStem);
                }
            }
        }

        if let Some(done) = acc.take() {
            questions.push(self.flush(done));
        }
        questions
    }

    fn is_question_start(&self, text: &str) -> bool {
        self.question_start.iter().any(|p| p.is_match(text))
    }

    fn strip_enumerator(&self, text: &str) -> String {
        for pattern in &self.question_start {
            if let Some(m) = pattern.find(text) {
                return text[m.end()..].trim().to_string();
            }
        }
        text.to_string()
    }

    /// 冲刷一个跨度，构建最终题目候选
    fn flush(&self, mut acc: SpanAccumulator) -> ParsedQuestion {
        let mut stem = collapse_whitespace(&acc.stem_lines.join(" "));

        // 尾部答案通道：仅在显式标记通道未产出时咨询
        if acc.answer_raw.is_empty() {
            if let Some((answer, stripped)) = self.strip_tail_parenthetical(&stem) {
                acc.answer_raw = answer;
                stem = stripped;
                acc.flags.tail_answer_stripped = true;
            } else if let Some((answer, stripped)) = self.strip_tail_truth_symbol(&stem) {
                acc.answer_raw = answer;
                stem = stripped;
                acc.flags.tail_answer_stripped = true;
            }
        }

        let mut options: Vec<String> = acc
            .options
            .into_iter()
            .filter(|opt| !opt.trim().is_empty())
            .collect();

        // 孤立选项回灌：单个选项且无答案多半是误判的标记，并回题干
        if options.len() == 1 && acc.answer_raw.is_empty() {
            stem.push(' ');
            stem.push_str(&options[0]);
            options.clear();
            acc.flags.missing_option_marker = true;
        }

        let layout_score = self.layout_score(&stem, &options, &acc.ocr_confs, acc.total_chars);

        ParsedQuestion {
            question: stem,
            options,
            answer_raw: normalize_answer(&acc.answer_raw),
            layout_score,
            parse_flags: acc.flags,
        }
    }

    fn strip_tail_parenthetical(&self, stem: &str) -> Option<(String, String)> {
        let caps = self.tail_parenthetical.captures(stem)?;
        let answer = caps.get(1)?.as_str().trim();
        if answer.is_empty() {
            return None;
        }
        let whole = caps.get(0)?;
        let stripped = stem[..whole.start()].trim_end().to_string();
        Some((answer.to_string(), stripped))
    }

    fn strip_tail_truth_symbol(&self, stem: &str) -> Option<(String, String)> {
        let caps = self.tail_truth_symbol.captures(stem)?;
        let symbol = caps.get(1)?;
        let stripped = stem[..symbol.start()]
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '：'))
            .to_string();
        Some((symbol.as_str().to_string(), stripped))
    }

    /// 版面质量分数
    ///
    /// 随贡献块的平均提取置信度与结构完整性（非平凡题干、成对选项）
    /// 上升，结构残缺时乘性降权，最终截断到 [0,1]。
    fn layout_score(
        &self,
        stem: &str,
        options: &[String],
        ocr_confs: &[f64],
        total_chars: usize,
    ) -> f64 {
        let mut score = if ocr_confs.is_empty() {
            1.0
        } else {
            ocr_confs.iter().sum::<f64>() / ocr_confs.len() as f64
        };

        let stem_chars = stem.chars().count();
        if stem_chars <= 1 {
            score *= self.layout.trivial_stem_penalty;
        } else if total_chars < self.layout.short_span_chars {
            score *= self.layout.short_span_penalty;
        }
        if total_chars > self.layout.long_span_chars {
            score *= self.layout.long_span_penalty;
        }

        if !options.is_empty() {
            if options.len() >= 2 {
                score *= self.layout.option_structure_bonus;
            } else {
                score *= self.layout.broken_structure_penalty;
            }
        }

        score.clamp(0.0, 1.0)
    }
}

/// 全角字母数字折叠为半角；幂等
pub fn fold_fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// 答案文本规范化：全角折叠 + OCR 符号归一
fn normalize_answer(answer: &str) -> String {
    let folded = fold_fullwidth(answer);
    let trimmed = folded.trim();

    // 单字符答案应用符号归一（多字符文本中的字母不折叠）
    let mut chars = trimmed.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        if let Some(mapped) = SYMBOL_FOLD.get(&only) {
            return (*mapped).to_string();
        }
    }

    match trimmed {
        "TRUE" => "True".to_string(),
        "FALSE" => "False".to_string(),
        _ => trimmed.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
