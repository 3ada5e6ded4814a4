use std::sync::Arc;

use anyhow::Result;
use question_recog::calibrate::{CalibrationData, IsotonicMapping};
use question_recog::models::question::TextBlock;
use question_recog::{
    App, ClassProbabilities, DocumentInput, IsotonicCalibrator, QuestionType, RecogConfig,
    RecognitionPipeline, TypeScorer,
};

/// 确定性桩打分器：固定偏向简答题
struct SubjectiveLeaningScorer;

impl TypeScorer for SubjectiveLeaningScorer {
    fn classify(&self, _features: &[f64]) -> Result<ClassProbabilities> {
        Ok([
            (QuestionType::SingleChoice, 0.05),
            (QuestionType::MultipleChoice, 0.05),
            (QuestionType::TrueFalse, 0.05),
            (QuestionType::FillBlank, 0.05),
            (QuestionType::Subjective, 0.80),
        ]
        .into_iter()
        .collect())
    }
}

/// 始终失败的桩打分器
struct FailingScorer;

impl TypeScorer for FailingScorer {
    fn classify(&self, _features: &[f64]) -> Result<ClassProbabilities> {
        anyhow::bail!("模拟的打分器故障")
    }
}

fn document(lines: &[&str]) -> DocumentInput {
    DocumentInput {
        source_id: "exam".to_string(),
        blocks: lines
            .iter()
            .enumerate()
            .map(|(i, line)| TextBlock::new(*line, i + 1))
            .collect(),
    }
}

fn mixed_exam() -> DocumentInput {
    document(&[
        "某电力系统模拟试卷",
        "1. 下列哪些属于一次设备？",
        "A. 断路器",
        "B. 隔离开关",
        "C. 继电器",
        "答案：AB",
        "2. 变压器可以带负荷调压（√）",
        "3. 额定容量为____MVA。",
        "答案：100",
        "4. 下列说法正确的是",
        "A. 甲说法",
        "B. 乙说法",
        "答案：A",
        "5. 这道题没有任何结构信号可供规则使用",
    ])
}

#[test]
fn full_pipeline_labels_mixed_exam_in_order() {
    let pipeline = RecognitionPipeline::new(&RecogConfig::default())
        .unwrap()
        .with_scorer(Arc::new(SubjectiveLeaningScorer));

    let results = pipeline.process_document(&mixed_exam());
    assert_eq!(results.len(), 5);

    // 结果按文档顺序编号
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.source_id, format!("exam#q{}", i + 1));
    }

    assert_eq!(results[0].final_result.qtype, QuestionType::MultipleChoice);
    assert_eq!(results[0].rule_decision.as_ref().unwrap().rule_name, "multi_letter");

    assert_eq!(results[1].final_result.qtype, QuestionType::TrueFalse);
    assert!(results[1].question.parse_flags.tail_answer_stripped);

    assert_eq!(results[2].final_result.qtype, QuestionType::FillBlank);

    assert_eq!(results[3].final_result.qtype, QuestionType::SingleChoice);
    assert!(!results[3].final_result.needs_review);

    // 第五题无规则命中，由桩打分器判为简答
    assert!(results[4].rule_decision.is_none());
    assert_eq!(results[4].final_result.qtype, QuestionType::Subjective);
    assert!(!results[4].final_result.needs_review);
}

#[test]
fn missing_scorer_degrades_unruled_candidates_to_unknown() {
    let pipeline = RecognitionPipeline::new(&RecogConfig::default()).unwrap();
    let results = pipeline.process_document(&mixed_exam());

    // 规则可判定的题目不受降级影响
    assert_eq!(results[0].final_result.qtype, QuestionType::MultipleChoice);
    // 规则未命中的题目降级为 unknown / 待复核
    let degraded = &results[4].final_result;
    assert_eq!(degraded.qtype, QuestionType::Unknown);
    assert_eq!(degraded.confidence, 0.0);
    assert!(degraded.needs_review);
    assert!(degraded.is_low_confidence);
}

#[test]
fn scorer_failure_on_one_candidate_does_not_abort_batch() {
    let pipeline = RecognitionPipeline::new(&RecogConfig::default())
        .unwrap()
        .with_scorer(Arc::new(FailingScorer));
    let results = pipeline.process_document(&mixed_exam());

    assert_eq!(results.len(), 5);
    // 故障只影响进入打分器的候选
    assert_eq!(results[0].final_result.qtype, QuestionType::MultipleChoice);
    assert_eq!(results[4].final_result.qtype, QuestionType::Unknown);
    assert!(results[4].final_result.needs_review);
}

#[test]
fn fitted_calibrator_tempers_overconfident_scores() {
    // 把简答类的高分向下压的校准映射
    let data = CalibrationData {
        version: "1.0".to_string(),
        isotonic_mappings: [(
            "subjective".to_string(),
            IsotonicMapping {
                x_thresholds: vec![0.0, 0.8, 1.0],
                y_thresholds: vec![0.0, 0.2, 0.3],
            },
        )]
        .into_iter()
        .collect(),
    };
    let calibrator = IsotonicCalibrator::from_data(data).unwrap();

    let pipeline = RecognitionPipeline::new(&RecogConfig::default())
        .unwrap()
        .with_scorer(Arc::new(SubjectiveLeaningScorer))
        .with_calibrator(calibrator);

    let results = pipeline.process_document(&document(&["1. 没有结构信号的题目文本"]));
    let result = &results[0].final_result;
    // 原始 0.80 被校准压低：归一化后 0.2/(0.2+4×0.05)=0.5，
    // 仍是 argmax 但落入复核区间
    assert_eq!(result.qtype, QuestionType::Subjective);
    assert!((result.confidence - 0.5).abs() < 1e-9);
    assert!(result.needs_review);
}

#[tokio::test]
async fn app_processes_folder_end_to_end() {
    let base = std::env::temp_dir().join(format!("question_recog_e2e_{}", std::process::id()));
    let input = base.join("input");
    let output = base.join("output");
    tokio::fs::create_dir_all(&input).await.unwrap();

    tokio::fs::write(
        input.join("试卷一.txt"),
        "1. 断路器可以带负荷操作（×）\n2. 额定电压为____kV。\n答案：110\n",
    )
    .await
    .unwrap();

    let mut config = RecogConfig::default();
    config.runtime.input_folder = input.display().to_string();
    config.runtime.output_folder = output.display().to_string();
    config.runtime.output_log_file = base.join("log.txt").display().to_string();
    config.runtime.calibration_path = base.join("no_calibration.json").display().to_string();

    let stats = App::initialize(config).unwrap().run().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_questions, 2);
    assert_eq!(stats.rule_hits, 2);

    // 结果文件按文档写出且可回读
    let payload = tokio::fs::read_to_string(output.join("试卷一.json")).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert_eq!(parsed[0]["final_result"]["type"], "true_false");
    assert_eq!(parsed[1]["final_result"]["type"], "fill_blank");

    tokio::fs::remove_dir_all(&base).await.unwrap();
}

#[test]
fn inconsistent_config_is_rejected_before_processing() {
    let mut config = RecogConfig::default();
    config.thresholds.review.single_choice = 0.9;
    config.thresholds.accept.single_choice = 0.6;
    let err = App::initialize(config).unwrap_err();
    assert!(err.to_string().contains("配置校验失败"));
}
