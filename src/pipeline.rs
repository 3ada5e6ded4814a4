//! 识别流水线 - 流程层
//!
//! 核心职责：定义"一个题目候选"的完整判定流程
//!
//! 流程顺序：
//! 1. 版面解析 → 题目候选
//! 2. 特征提取 → 规则判定（命中即短路）
//! 3. 分类器打分 → 概率校准 → 阈值判定
//!
//! 各阶段纯同步、无共享可变状态，装载后的打分器与校准器
//! 只读，流水线可安全地跨线程共享。单个候选上的任何异常
//! 都降级为 unknown/复核结果，绝不中断整批处理。

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::calibrate::IsotonicCalibrator;
use crate::classify::TypeScorer;
use crate::config::{RecogConfig, ThresholdConfig};
use crate::decision::decide;
use crate::features::FeatureExtractor;
use crate::models::question::{DocumentInput, ParsedQuestion, PipelineResult};
use crate::parsing::LayoutStateMachine;
use crate::rules::RuleEngine;

/// 题型识别流水线
pub struct RecognitionPipeline {
    parser: LayoutStateMachine,
    extractor: FeatureExtractor,
    rules: RuleEngine,
    scorer: Option<Arc<dyn TypeScorer>>,
    calibrator: IsotonicCalibrator,
    thresholds: ThresholdConfig,
}

impl RecognitionPipeline {
    /// 创建流水线：无分类器、恒等校准（降级模式）
    pub fn new(config: &RecogConfig) -> Result<Self> {
        Ok(Self {
            parser: LayoutStateMachine::new(config)?,
            extractor: FeatureExtractor::new(config)?,
            rules: RuleEngine::new(config),
            scorer: None,
            calibrator: IsotonicCalibrator::unfitted(),
            thresholds: config.thresholds,
        })
    }

    /// 注入外部分类器
    pub fn with_scorer(mut self, scorer: Arc<dyn TypeScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// 注入已拟合的校准器
    pub fn with_calibrator(mut self, calibrator: IsotonicCalibrator) -> Self {
        self.calibrator = calibrator;
        self
    }

    pub fn has_scorer(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_fitted()
    }

    /// 处理一份文档，按文档顺序返回每个识别出的题目跨度的结果
    pub fn process_document(&self, document: &DocumentInput) -> Vec<PipelineResult> {
        let questions = self.parser.parse(&document.blocks);
        debug!("[{}] 解析得到 {} 个题目候选", document.source_id, questions.len());

        questions
            .into_iter()
            .enumerate()
            .map(|(i, question)| {
                let source_id = format!("{}#q{}", document.source_id, i + 1);
                self.process_question(source_id, question)
            })
            .collect()
    }

    /// 处理单个题目候选
    pub fn process_question(&self, source_id: String, question: ParsedQuestion) -> PipelineResult {
        let features = self.extractor.extract(&question);
        let rule_decision = self.rules.apply(&question, &features);

        let final_result = if let Some(decision) = rule_decision.as_ref() {
            // 规则命中：跳过分类器
            decide(Some(decision), None, &self.thresholds)
        } else {
            match self.scorer.as_deref() {
                Some(scorer) => match scorer.classify(&features.to_array()) {
                    Ok(raw) => {
                        let calibrated = self.calibrator.calibrate_all(&raw);
                        decide(None, Some(&calibrated), &self.thresholds)
                    }
                    Err(e) => {
                        // 单候选失败只降级该候选，批处理继续
                        warn!("[{}] 分类器调用失败，降级为 unknown: {}", source_id, e);
                        decide(None, None, &self.thresholds)
                    }
                },
                None => decide(None, None, &self.thresholds),
            }
        };

        PipelineResult {
            source_id,
            question,
            features,
            rule_decision,
            final_result,
        }
    }
}
