//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量文档的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、装载校准数据、构建流水线
//! 2. **批量加载**：扫描并加载所有待处理的文档
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将文档分批次处理，每批完成后再开始下一批
//! 5. **结果落盘**：每份文档写出一个 JSON 结果文件
//! 6. **全局统计**：汇总规则命中、模型判定、复核数量
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有流水线（含打分器与校准映射）的模块
//! - **只读共享**：流水线装载后只读，经 Arc 跨任务共享，无锁
//! - **降级容错**：单个文档失败只计入统计，不中断整批

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::calibrate::IsotonicCalibrator;
use crate::classify::TypeScorer;
use crate::config::RecogConfig;
use crate::models::loaders::load_all_text_files;
use crate::models::question::{DocumentInput, PipelineResult};
use crate::pipeline::RecognitionPipeline;
use crate::utils::logging::{init_log_file, log_documents_loaded, log_startup, truncate_text};

/// 应用主结构
pub struct App {
    config: RecogConfig,
    pipeline: Arc<RecognitionPipeline>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("config", &self.config).finish_non_exhaustive()
    }
}

impl App {
    /// 初始化应用
    ///
    /// 配置校验与校准数据装载都发生在这里，任何不一致都会在
    /// 处理第一个题目之前失败返回。
    pub fn initialize(config: RecogConfig) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        init_log_file(&config.runtime.output_log_file)?;
        log_startup(config.runtime.max_concurrent_documents);

        // 校准数据缺失是降级条件而不是错误；存在但不合法则拒绝启动
        let calibration_path = Path::new(&config.runtime.calibration_path);
        let calibrator = if calibration_path.exists() {
            IsotonicCalibrator::from_file(calibration_path).context("校准数据装载失败")?
        } else {
            warn!(
                "⚠️ 校准文件不存在 ({})，使用恒等校准",
                config.runtime.calibration_path
            );
            IsotonicCalibrator::unfitted()
        };

        let pipeline = RecognitionPipeline::new(&config)?.with_calibrator(calibrator);
        if !pipeline.has_scorer() {
            warn!("⚠️ 未注入外部分类器，规则未命中的题目将标记为 unknown");
        }

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }

    /// 注入外部分类器后重建流水线
    pub fn with_scorer(mut self, scorer: Arc<dyn TypeScorer>) -> Result<Self> {
        let calibration_path = Path::new(&self.config.runtime.calibration_path);
        let calibrator = if calibration_path.exists() {
            IsotonicCalibrator::from_file(calibration_path)?
        } else {
            IsotonicCalibrator::unfitted()
        };
        self.pipeline = Arc::new(
            RecognitionPipeline::new(&self.config)?
                .with_calibrator(calibrator)
                .with_scorer(scorer),
        );
        Ok(self)
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        let documents = load_all_text_files(&self.config.runtime.input_folder).await?;

        if documents.is_empty() {
            warn!("⚠️ 没有找到待处理的文本文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        let total = documents.len();
        log_documents_loaded(total, self.config.runtime.max_concurrent_documents);

        tokio::fs::create_dir_all(&self.config.runtime.output_folder)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.config.runtime.output_folder))?;

        let stats = self.process_all_documents(documents).await;
        print_final_stats(&stats, &self.config);
        Ok(stats)
    }

    /// 分批处理所有文档
    async fn process_all_documents(&self, documents: Vec<DocumentInput>) -> ProcessingStats {
        let batch_size = self.config.runtime.max_concurrent_documents.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = documents.len();
        let mut stats = ProcessingStats {
            total_documents: total,
            ..Default::default()
        };

        let mut batch_num = 0;
        let total_batches = total.div_ceil(batch_size);
        let mut remaining = documents;

        while !remaining.is_empty() {
            batch_num += 1;
            let batch: Vec<DocumentInput> = remaining
                .drain(..batch_size.min(remaining.len()))
                .collect();
            info!("\n{}", "=".repeat(60));
            info!("📦 开始处理第 {}/{} 批 ({} 个文档)", batch_num, total_batches, batch.len());
            info!("{}", "=".repeat(60));

            let mut handles = Vec::new();
            for document in batch {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let pipeline = self.pipeline.clone();
                let output_folder = self.config.runtime.output_folder.clone();
                let verbose = self.config.runtime.verbose_logging;

                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    process_document(&pipeline, &document, &output_folder, verbose).await
                }));
            }

            for joined in join_all(handles).await {
                match joined {
                    Ok(Ok(doc_stats)) => stats.absorb(doc_stats),
                    Ok(Err(e)) => {
                        error!("❌ 文档处理失败: {}", e);
                        stats.failed_documents += 1;
                    }
                    Err(e) => {
                        error!("❌ 任务执行失败: {}", e);
                        stats.failed_documents += 1;
                    }
                }
            }
        }

        stats
    }
}

/// 处理单份文档并写出结果文件
async fn process_document(
    pipeline: &RecognitionPipeline,
    document: &DocumentInput,
    output_folder: &str,
    verbose: bool,
) -> Result<DocumentStats> {
    info!("[{}] 开始处理 ({} 个文本块)", document.source_id, document.blocks.len());

    let results = pipeline.process_document(document);

    if verbose {
        for result in &results {
            info!(
                "[{}] {} -> {} (置信度 {:.3}{})",
                result.source_id,
                truncate_text(&result.question.question, 30),
                result.final_result.qtype,
                result.final_result.confidence,
                if result.final_result.needs_review {
                    ", 待复核"
                } else {
                    ""
                }
            );
        }
    }

    let output_path = Path::new(output_folder).join(format!("{}.json", document.source_id));
    let payload = serde_json::to_string_pretty(&results).context("结果序列化失败")?;
    tokio::fs::write(&output_path, payload)
        .await
        .with_context(|| format!("无法写入结果文件: {}", output_path.display()))?;

    let doc_stats = DocumentStats::collect(&results);
    info!(
        "[{}] ✅ 处理完成: {} 题, 规则命中 {}, 模型判定 {}, 待复核 {}",
        document.source_id,
        doc_stats.questions,
        doc_stats.rule_hits,
        doc_stats.model_predictions,
        doc_stats.needs_review
    );
    Ok(doc_stats)
}

/// 单文档统计
#[derive(Debug, Default)]
struct DocumentStats {
    questions: usize,
    rule_hits: usize,
    model_predictions: usize,
    needs_review: usize,
    low_confidence: usize,
}

impl DocumentStats {
    fn collect(results: &[PipelineResult]) -> Self {
        let mut stats = Self {
            questions: results.len(),
            ..Default::default()
        };
        for result in results {
            if result.rule_decision.is_some() {
                stats.rule_hits += 1;
            } else {
                stats.model_predictions += 1;
            }
            if result.final_result.needs_review {
                stats.needs_review += 1;
            }
            if result.final_result.is_low_confidence {
                stats.low_confidence += 1;
            }
        }
        stats
    }
}

/// 全局处理统计
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_documents: usize,
    pub failed_documents: usize,
    pub total_questions: usize,
    pub rule_hits: usize,
    pub model_predictions: usize,
    pub needs_review: usize,
    pub low_confidence: usize,
}

impl ProcessingStats {
    fn absorb(&mut self, doc: DocumentStats) {
        self.total_questions += doc.questions;
        self.rule_hits += doc.rule_hits;
        self.model_predictions += doc.model_predictions;
        self.needs_review += doc.needs_review;
        self.low_confidence += doc.low_confidence;
    }
}

// ========== 日志辅助函数 ==========

fn print_final_stats(stats: &ProcessingStats, config: &RecogConfig) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "✅ 文档: {}/{} (失败 {})",
        stats.total_documents - stats.failed_documents,
        stats.total_documents,
        stats.failed_documents
    );
    info!("📝 题目总数: {}", stats.total_questions);
    info!("⚡ 规则命中: {}", stats.rule_hits);
    info!("🤖 模型判定: {}", stats.model_predictions);
    info!("⚠️ 待复核: {}", stats.needs_review);
    info!("📉 低置信度: {}", stats.low_confidence);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.runtime.output_log_file);
}
