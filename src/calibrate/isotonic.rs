//! 概率校准模块
//!
//! 每个类别一条独立的单调映射，把分类器的原始概率调整为
//! 更贴近经验准确率的概率。映射离线拟合（外部职责），这里
//! 只负责装载、校验与应用：断点二分查找 + 线性插值，端点
//! 截断，每类别 O(log n)。未装载校准数据时退化为恒等映射。

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecogError, RecogResult};
use crate::classify::ClassProbabilities;
use crate::models::question::QuestionType;

/// 单个类别的单调断点映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsotonicMapping {
    pub x_thresholds: Vec<f64>,
    pub y_thresholds: Vec<f64>,
}

impl IsotonicMapping {
    /// 校验断点合法性：数量一致、非空、x 与 y 均单调非减
    fn validate(&self, class: &str) -> RecogResult<()> {
        if self.x_thresholds.is_empty() || self.x_thresholds.len() != self.y_thresholds.len() {
            return Err(RecogError::MalformedCalibration {
                class: class.to_string(),
                x_len: self.x_thresholds.len(),
                y_len: self.y_thresholds.len(),
            });
        }
        let non_decreasing =
            |v: &[f64]| v.windows(2).all(|w| w[0] <= w[1]) && v.iter().all(|x| x.is_finite());
        if !non_decreasing(&self.x_thresholds) || !non_decreasing(&self.y_thresholds) {
            return Err(RecogError::NonMonotonicCalibration {
                class: class.to_string(),
            });
        }
        Ok(())
    }

    /// 断点二分查找 + 线性插值，端点截断
    fn apply(&self, raw: f64) -> f64 {
        let xs = &self.x_thresholds;
        let ys = &self.y_thresholds;
        if raw <= xs[0] {
            return ys[0];
        }
        let last = xs.len() - 1;
        if raw >= xs[last] {
            return ys[last];
        }
        // 第一个 xs[idx] >= raw 的位置；上面的端点检查保证 0 < idx <= last
        let idx = xs.partition_point(|x| *x < raw);
        let (x0, x1) = (xs[idx - 1], xs[idx]);
        let (y0, y1) = (ys[idx - 1], ys[idx]);
        if x1 == x0 {
            return y1;
        }
        y0 + (y1 - y0) * (raw - x0) / (x1 - x0)
    }
}

/// 校准数据文件结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationData {
    #[serde(default)]
    pub version: String,
    pub isotonic_mappings: BTreeMap<String, IsotonicMapping>,
}

/// Isotonic 校准器
///
/// 装载后只读，可跨线程共享。
#[derive(Debug, Default)]
pub struct IsotonicCalibrator {
    mappings: BTreeMap<QuestionType, IsotonicMapping>,
}

impl IsotonicCalibrator {
    /// 未拟合的校准器（恒等映射）
    pub fn unfitted() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.mappings.is_empty()
    }

    /// 从校准数据构建，装载时校验每个类别的单调性
    pub fn from_data(data: CalibrationData) -> RecogResult<Self> {
        let mut mappings = BTreeMap::new();
        for (label, mapping) in data.isotonic_mappings {
            let qtype = QuestionType::from_label(&label).ok_or_else(|| {
                RecogError::UnknownCalibrationClass {
                    label: label.clone(),
                }
            })?;
            mapping.validate(&label)?;
            mappings.insert(qtype, mapping);
        }
        Ok(Self { mappings })
    }

    /// 从 JSON 文件装载校准数据
    pub fn from_file(path: impl AsRef<Path>) -> RecogResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RecogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let data: CalibrationData =
            serde_json::from_str(&content).map_err(|source| RecogError::JsonParse {
                path: path.display().to_string(),
                source,
            })?;
        let calibrator = Self::from_data(data)?;
        info!("✓ 校准数据装载完成: {} ({} 个类别)", path.display(), calibrator.mappings.len());
        Ok(calibrator)
    }

    /// 校准单个类别的原始概率；无对应映射时恒等返回
    pub fn calibrate(&self, qtype: QuestionType, raw: f64) -> f64 {
        match self.mappings.get(&qtype) {
            Some(mapping) => mapping.apply(raw).clamp(0.0, 1.0),
            None => raw,
        }
    }

    /// 校准整个概率向量并重新归一化
    pub fn calibrate_all(&self, probabilities: &ClassProbabilities) -> ClassProbabilities {
        let mapped: ClassProbabilities = probabilities
            .iter()
            .map(|(qtype, raw)| (*qtype, self.calibrate(*qtype, *raw)))
            .collect();
        let sum: f64 = mapped.values().sum();
        if sum <= f64::EPSILON {
            return mapped;
        }
        mapped.into_iter().map(|(qtype, p)| (qtype, p / sum)).collect()
    }
}

/// 期望校准误差（ECE）诊断
///
/// 固定宽度分箱，逐箱比较平均预测置信度与经验准确率，
/// 按箱内样本占比加权求和。仅用于报告，不进判定路径。
pub fn expected_calibration_error(samples: &[(f64, bool)], n_bins: usize) -> f64 {
    if samples.is_empty() || n_bins == 0 {
        return 0.0;
    }
    let total = samples.len() as f64;
    let mut ece = 0.0;
    for bin in 0..n_bins {
        let lower = bin as f64 / n_bins as f64;
        let upper = (bin + 1) as f64 / n_bins as f64;
        let in_bin: Vec<&(f64, bool)> = samples
            .iter()
            .filter(|(conf, _)| *conf > lower && *conf <= upper)
            .collect();
        if in_bin.is_empty() {
            continue;
        }
        let count = in_bin.len() as f64;
        let avg_conf = in_bin.iter().map(|(conf, _)| conf).sum::<f64>() / count;
        let accuracy = in_bin.iter().filter(|(_, correct)| *correct).count() as f64 / count;
        ece += (avg_conf - accuracy).abs() * (count / total);
    }
    ece
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> IsotonicCalibrator {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "single_choice".to_string(),
            IsotonicMapping {
                x_thresholds: vec![0.0, 0.5, 1.0],
                y_thresholds: vec![0.1, 0.4, 0.9],
            },
        );
        IsotonicCalibrator::from_data(CalibrationData {
            version: "1.0".to_string(),
            isotonic_mappings: mappings,
        })
        .unwrap()
    }

    #[test]
    fn unfitted_calibrator_is_identity() {
        let cal = IsotonicCalibrator::unfitted();
        assert!(!cal.is_fitted());
        assert_eq!(cal.calibrate(QuestionType::TrueFalse, 0.73), 0.73);
    }

    #[test]
    fn interpolates_between_breakpoints() {
        let cal = fitted();
        assert_eq!(cal.calibrate(QuestionType::SingleChoice, 0.0), 0.1);
        assert_eq!(cal.calibrate(QuestionType::SingleChoice, 0.5), 0.4);
        assert_eq!(cal.calibrate(QuestionType::SingleChoice, 1.0), 0.9);
        // 0.25 位于前两个断点中间
        let mid = cal.calibrate(QuestionType::SingleChoice, 0.25);
        assert!((mid - 0.25).abs() < 1e-9);
    }

    #[test]
    fn clamps_out_of_range_input() {
        let cal = fitted();
        assert_eq!(cal.calibrate(QuestionType::SingleChoice, -0.2), 0.1);
        assert_eq!(cal.calibrate(QuestionType::SingleChoice, 1.5), 0.9);
    }

    #[test]
    fn calibration_is_monotone_for_all_input_pairs() {
        let cal = fitted();
        let inputs: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        for pair in inputs.windows(2) {
            let lo = cal.calibrate(QuestionType::SingleChoice, pair[0]);
            let hi = cal.calibrate(QuestionType::SingleChoice, pair[1]);
            assert!(lo <= hi, "单调性被破坏: f({}) > f({})", pair[0], pair[1]);
        }
    }

    #[test]
    fn calibrated_vector_renormalizes_to_one() {
        let cal = fitted();
        let mut probs = ClassProbabilities::new();
        probs.insert(QuestionType::SingleChoice, 0.6);
        probs.insert(QuestionType::Subjective, 0.4);
        let calibrated = cal.calibrate_all(&probs);
        let sum: f64 = calibrated.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(calibrated.values().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn all_zero_vector_survives_renormalization() {
        let cal = IsotonicCalibrator::unfitted();
        let mut probs = ClassProbabilities::new();
        probs.insert(QuestionType::SingleChoice, 0.0);
        probs.insert(QuestionType::Subjective, 0.0);
        let calibrated = cal.calibrate_all(&probs);
        assert!(calibrated.values().all(|p| *p == 0.0));
    }

    #[test]
    fn non_monotonic_data_rejected_at_load() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "true_false".to_string(),
            IsotonicMapping {
                x_thresholds: vec![0.0, 0.5, 1.0],
                y_thresholds: vec![0.5, 0.3, 0.9],
            },
        );
        let err = IsotonicCalibrator::from_data(CalibrationData {
            version: String::new(),
            isotonic_mappings: mappings,
        })
        .unwrap_err();
        assert!(matches!(err, RecogError::NonMonotonicCalibration { .. }));
    }

    #[test]
    fn mismatched_breakpoints_rejected_at_load() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "fill_blank".to_string(),
            IsotonicMapping {
                x_thresholds: vec![0.0, 1.0],
                y_thresholds: vec![0.5],
            },
        );
        let err = IsotonicCalibrator::from_data(CalibrationData {
            version: String::new(),
            isotonic_mappings: mappings,
        })
        .unwrap_err();
        assert!(matches!(err, RecogError::MalformedCalibration { .. }));
    }

    #[test]
    fn unknown_class_label_rejected_at_load() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "essay".to_string(),
            IsotonicMapping {
                x_thresholds: vec![0.0],
                y_thresholds: vec![0.0],
            },
        );
        let err = IsotonicCalibrator::from_data(CalibrationData {
            version: String::new(),
            isotonic_mappings: mappings,
        })
        .unwrap_err();
        assert!(matches!(err, RecogError::UnknownCalibrationClass { .. }));
    }

    #[test]
    fn ece_zero_for_perfectly_calibrated_bins() {
        // 每个箱内置信度与准确率一致
        let samples = vec![
            (0.75, true),
            (0.75, true),
            (0.75, true),
            (0.75, false),
        ];
        let ece = expected_calibration_error(&samples, 10);
        assert!(ece < 1e-9);
    }

    #[test]
    fn ece_large_for_overconfident_predictions() {
        let samples: Vec<(f64, bool)> = (0..10).map(|_| (0.95, false)).collect();
        let ece = expected_calibration_error(&samples, 10);
        assert!((ece - 0.95).abs() < 1e-9);
        assert_eq!(expected_calibration_error(&[], 10), 0.0);
    }
}
