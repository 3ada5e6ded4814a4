//! 程序配置
//!
//! 所有阈值、规则常量和词表都由配置显式提供，核心逻辑不内置数值。
//! 配置在装载时整体校验，任何不一致（如复核阈值高于接受阈值）
//! 都会在处理第一个题目之前被拒绝。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecogError, RecogResult};
use crate::models::question::QuestionType;

// ========== 默认词表 ==========

/// 多选题提示词默认表
pub const DEFAULT_MULTI_CHOICE_KEYWORDS: &[&str] = &[
    "多选", "多项", "至少两项", "两个以上", "不止一个", "哪些", "哪几个", "包括", "多个", "几个",
];

/// 判断题提示词默认表
pub const DEFAULT_TRUE_FALSE_KEYWORDS: &[&str] = &[
    "判断对错", "是否正确", "对吗", "对么", "是非题", "判断题", "说法", "表述", "观点",
    "是否准确",
];

/// 填空题提示词默认表
pub const DEFAULT_FILL_BLANK_KEYWORDS: &[&str] = &[
    "填写", "填入", "应填", "等于", "约为", "标准", "规定", "数值", "参数", "单位",
];

/// 简答题提示词默认表
pub const DEFAULT_SUBJECTIVE_KEYWORDS: &[&str] = &[
    "简述", "说明", "论述", "分析", "阐述", "解释", "描述", "如何", "为什么", "什么是",
    "怎样", "请", "试", "谈谈", "基本要求", "工作原理", "主要特点", "注意事项", "定义",
    "比较", "列举", "举例",
];

/// 判断类答案词符默认表
pub const DEFAULT_TRUTH_TOKENS: &[&str] = &[
    "对", "错", "√", "×", "✓", "✗", "True", "False", "T", "F", "正确", "错误", "是", "否",
];

// ========== 配置结构 ==========

/// 按类别的阈值表
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassThresholds {
    pub single_choice: f64,
    pub multiple_choice: f64,
    pub true_false: f64,
    pub fill_blank: f64,
    pub subjective: f64,
}

impl ClassThresholds {
    /// 获取某类别的阈值；unknown 永远不会被接受
    pub fn get(&self, qtype: QuestionType) -> f64 {
        match qtype {
            QuestionType::SingleChoice => self.single_choice,
            QuestionType::MultipleChoice => self.multiple_choice,
            QuestionType::TrueFalse => self.true_false,
            QuestionType::FillBlank => self.fill_blank,
            QuestionType::Subjective => self.subjective,
            QuestionType::Unknown => 1.0,
        }
    }

    fn uniform(value: f64) -> Self {
        Self {
            single_choice: value,
            multiple_choice: value,
            true_false: value,
            fill_blank: value,
            subjective: value,
        }
    }
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

/// 判定阈值配置
///
/// 每个类别两个有序切点：复核阈值 ≤ 接受阈值。
/// 选择类比主观类更严格，对应原始标注数据上的误收敛差异。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// 接受阈值（达到即直接采信）
    pub accept: ClassThresholds,
    /// 复核阈值（低于则强制 unknown）
    pub review: ClassThresholds,
    /// 全局最低置信度下限（仅用于低置信度报告）
    pub min_confidence: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            accept: ClassThresholds {
                single_choice: 0.75,
                multiple_choice: 0.75,
                true_false: 0.80,
                fill_blank: 0.70,
                subjective: 0.60,
            },
            review: ClassThresholds {
                single_choice: 0.50,
                multiple_choice: 0.50,
                true_false: 0.50,
                fill_blank: 0.45,
                subjective: 0.40,
            },
            min_confidence: 0.4,
        }
    }
}

/// 规则引擎配置
///
/// 每条规则的置信度是固定常量，默认值均高于对应类别的接受阈值。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub truth_answer_confidence: f64,
    pub blank_markers_confidence: f64,
    pub multi_letter_confidence: f64,
    pub single_letter_confidence: f64,
    pub subjective_hints_confidence: f64,
    /// 简答兜底规则要求的最少提示词命中数
    pub subjective_hint_min: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            truth_answer_confidence: 0.95,
            blank_markers_confidence: 0.90,
            multi_letter_confidence: 0.88,
            single_letter_confidence: 0.85,
            subjective_hints_confidence: 0.80,
            subjective_hint_min: 2,
        }
    }
}

/// 关键词词表配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    pub multi_choice_keywords: Vec<String>,
    pub true_false_keywords: Vec<String>,
    pub fill_blank_keywords: Vec<String>,
    pub subjective_keywords: Vec<String>,
    pub truth_tokens: Vec<String>,
}

impl Default for VocabConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            multi_choice_keywords: owned(DEFAULT_MULTI_CHOICE_KEYWORDS),
            true_false_keywords: owned(DEFAULT_TRUE_FALSE_KEYWORDS),
            fill_blank_keywords: owned(DEFAULT_FILL_BLANK_KEYWORDS),
            subjective_keywords: owned(DEFAULT_SUBJECTIVE_KEYWORDS),
            truth_tokens: owned(DEFAULT_TRUTH_TOKENS),
        }
    }
}

/// 特征提取配置
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// 长文本答案的长度阈值（字符数）
    pub long_answer_threshold: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            long_answer_threshold: 20,
        }
    }
}

/// 版面质量评分配置
///
/// 这些系数是经验值，未经系统调参，故全部可配置。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// 过短题目跨度的降权系数
    pub short_span_penalty: f64,
    /// 过长题目跨度的降权系数
    pub long_span_penalty: f64,
    /// 单字符题干的降权系数
    pub trivial_stem_penalty: f64,
    /// 选项结构完整（≥2 个选项）的加权系数
    pub option_structure_bonus: f64,
    /// 选项结构残缺（仅 1 个选项）的降权系数
    pub broken_structure_penalty: f64,
    /// "过短跨度"的字符数下限
    pub short_span_chars: usize,
    /// "过长跨度"的字符数上限
    pub long_span_chars: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            short_span_penalty: 0.5,
            long_span_penalty: 0.8,
            trivial_stem_penalty: 0.2,
            option_structure_bonus: 1.2,
            broken_structure_penalty: 0.6,
            short_span_chars: 10,
            long_span_chars: 1000,
        }
    }
}

/// 运行环境配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 待处理文档目录
    pub input_folder: String,
    /// 结果输出目录
    pub output_folder: String,
    /// 校准数据文件路径（缺失则恒等校准）
    pub calibration_path: String,
    /// 同时处理的文档数量
    pub max_concurrent_documents: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            input_folder: "input_docs".to_string(),
            output_folder: "output_results".to_string(),
            calibration_path: "models/calibration.json".to_string(),
            max_concurrent_documents: 4,
            verbose_logging: false,
            output_log_file: "recog_output.txt".to_string(),
        }
    }
}

/// 识别系统配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecogConfig {
    pub thresholds: ThresholdConfig,
    pub rules: RuleConfig,
    pub vocab: VocabConfig,
    pub features: FeatureConfig,
    pub layout: LayoutConfig,
    pub runtime: RuntimeConfig,
}

impl RecogConfig {
    /// 从环境变量覆盖默认配置
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("MAX_CONCURRENT_DOCUMENTS") {
            config.runtime.max_concurrent_documents = v;
        }
        if let Ok(v) = std::env::var("INPUT_FOLDER") {
            config.runtime.input_folder = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_FOLDER") {
            config.runtime.output_folder = v;
        }
        if let Ok(v) = std::env::var("CALIBRATION_PATH") {
            config.runtime.calibration_path = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING") {
            config.runtime.verbose_logging = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            config.runtime.output_log_file = v;
        }
        if let Some(v) = env_parse("MIN_CONFIDENCE") {
            config.thresholds.min_confidence = v;
        }
        config
    }

    /// 从 TOML 文件加载配置（缺省字段取默认值）
    pub fn from_toml_file(path: impl AsRef<Path>) -> RecogResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RecogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| RecogError::TomlParse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 整体校验配置
    ///
    /// 必须在处理任何题目之前调用；不一致的配置在这里拒绝。
    pub fn validate(&self) -> RecogResult<()> {
        for qtype in QuestionType::CLASSES {
            let review = self.thresholds.review.get(qtype);
            let accept = self.thresholds.accept.get(qtype);
            check_unit_range(&format!("thresholds.review.{}", qtype), review)?;
            check_unit_range(&format!("thresholds.accept.{}", qtype), accept)?;
            if review > accept {
                return Err(RecogError::InvalidThresholdPair {
                    class: qtype.label(),
                    review,
                    accept,
                });
            }
        }
        check_unit_range("thresholds.min_confidence", self.thresholds.min_confidence)?;
        for (name, value) in [
            ("rules.truth_answer_confidence", self.rules.truth_answer_confidence),
            ("rules.blank_markers_confidence", self.rules.blank_markers_confidence),
            ("rules.multi_letter_confidence", self.rules.multi_letter_confidence),
            ("rules.single_letter_confidence", self.rules.single_letter_confidence),
            (
                "rules.subjective_hints_confidence",
                self.rules.subjective_hints_confidence,
            ),
        ] {
            check_unit_range(name, value)?;
        }
        Ok(())
    }
}

fn check_unit_range(name: &str, value: f64) -> RecogResult<()> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(RecogError::ValueOutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
