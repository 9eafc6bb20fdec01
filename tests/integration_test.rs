mod common;

use std::time::Duration;

use common::{RoutedModel, Workspace, ALIGN_MARKER, INSIGHT_MARKER, MODEL_ANSWER_MARKER};
use exam_insight::models::loaders::load_model_answers;
use exam_insight::{AppError, InsightStats, ModelAnswer, PacingPolicy};

fn banner_headers(corpus: &str) -> Vec<String> {
    corpus
        .lines()
        .filter(|l| l.starts_with("Analysis for Question "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn ocr_sheet_produces_two_blocks_in_bank_order() {
    let ws = Workspace::with_questions(&[1, 2]);
    ws.write_model_answers(&[2, 1]);
    let sheet = ws.answer_sheet_dir();
    let model = RoutedModel::new(r#"```json
{"1": "Ans1", "2": "No answer provided"}
```"#);

    let stats = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_insights(&sheet)
        .await
        .unwrap();

    assert_eq!(
        stats,
        InsightStats {
            generated: 2,
            skipped: 0,
            empty_responses: 0
        }
    );

    let corpus = ws.insights().unwrap();
    assert_eq!(
        banner_headers(&corpus),
        vec![
            "Analysis for Question 1: Question text 1",
            "Analysis for Question 2: Question text 2"
        ]
    );
    assert_eq!(corpus.matches(&"=".repeat(50)).count(), 4);

    // OCR 文本进入对齐 prompt，对齐结果进入点评 prompt
    let prompts = model.prompts();
    let align_prompt = prompts.iter().find(|p| p.contains(ALIGN_MARKER)).unwrap();
    assert!(align_prompt.contains("Q1: Ans1"));
    let insight_prompts: Vec<_> = prompts.iter().filter(|p| p.contains(INSIGHT_MARKER)).collect();
    assert_eq!(insight_prompts.len(), 2);
    assert!(insight_prompts[0].contains("\"Ans1\""));
    assert!(insight_prompts[0].contains("\"Model answer 1\""));
    assert!(insight_prompts[1].contains("\"No answer provided\""));
}

#[tokio::test]
async fn missing_model_answers_is_a_prerequisite_error() {
    let ws = Workspace::with_questions(&[1, 2]);
    let source = ws.write_text_answers("Question 1: something");
    let model = RoutedModel::new("{}");

    let err = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_insights(&source)
        .await
        .unwrap_err();

    match &err {
        AppError::Prerequisite { path, hint, .. } => {
            assert!(path.ends_with("model_answers.json"));
            assert!(hint.contains("generate-model-answers"));
        }
        other => panic!("意外的错误: {other:?}"),
    }
    assert!(ws.insights().is_none());
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn alignment_garbage_aborts_and_keeps_previous_corpus() {
    let ws = Workspace::with_questions(&[1, 2]);
    ws.write_model_answers(&[1, 2]);
    std::fs::write(ws.config.insights_path(), "previous corpus").unwrap();
    let sheet = ws.answer_sheet_dir();
    let model = RoutedModel::new("I am not JSON, sorry!");

    let err = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_insights(&sheet)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AlignmentFailed));
    assert_eq!(ws.insights().as_deref(), Some("previous corpus"));
    assert_eq!(model.count(INSIGHT_MARKER), 0);
}

#[tokio::test]
async fn alignment_garbage_without_previous_corpus_writes_nothing() {
    let ws = Workspace::with_questions(&[1]);
    ws.write_model_answers(&[1]);
    let sheet = ws.answer_sheet_dir();

    let err = ws
        .pipeline(RoutedModel::new("{\"one\": \"Ans1\"}"), PacingPolicy::none())
        .generate_insights(&sheet)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AlignmentFailed));
    assert!(ws.insights().is_none());
}

#[tokio::test]
async fn questions_without_model_answer_are_skipped() {
    let ws = Workspace::with_questions(&[3, 1, 2]);
    ws.write_model_answers(&[2, 3]);
    let source = ws.write_text_answers("Question 2: two\nQuestion 3: three\nQuestion 1: one");
    let model = RoutedModel::new("{}");

    let stats = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_insights(&source)
        .await
        .unwrap();

    assert_eq!(stats.generated, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(
        banner_headers(&ws.insights().unwrap()),
        vec![
            "Analysis for Question 3: Question text 3",
            "Analysis for Question 2: Question text 2"
        ]
    );
    // 旧版文本模式不调用对齐 LLM
    assert_eq!(model.count(ALIGN_MARKER), 0);
    assert_eq!(model.count(INSIGHT_MARKER), 2);
}

#[tokio::test]
async fn model_answers_are_written_for_every_question() {
    let ws = Workspace::with_questions(&[1, 2, 3]);
    std::fs::write(ws.config.model_answers_path(), r#"[{"question_id": 9, "model_answer": "stale"}]"#).unwrap();
    let model = RoutedModel::failing_model_answers("{}", vec![2]);

    let answers = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_model_answers()
        .await
        .unwrap();

    let expected = vec![
        ModelAnswer::new(1, "MODEL ANSWER"),
        ModelAnswer::new(2, ""),
        ModelAnswer::new(3, "MODEL ANSWER"),
    ];
    assert_eq!(answers.answers(), expected.as_slice());

    let on_disk = load_model_answers(&ws.config.model_answers_path()).unwrap();
    assert_eq!(on_disk, answers);
    // 1 + 3（第 2 题重试耗尽）+ 1
    assert_eq!(model.count(MODEL_ANSWER_MARKER), 5);
}

#[tokio::test]
async fn generate_all_checks_answer_source_first() {
    let ws = Workspace::with_questions(&[1]);
    let model = RoutedModel::new("{}");

    let err = ws
        .pipeline(model.clone(), PacingPolicy::none())
        .generate_all(&ws.path().join("no_such_sheet"))
        .await
        .unwrap_err();

    assert!(err.is_prerequisite());
    assert!(!ws.config.model_answers_path().exists());
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn generate_all_runs_both_stages() {
    let ws = Workspace::with_questions(&[1, 2]);
    let source = ws.write_text_answers("Question 1: a\nQuestion 2: b");

    let stats = ws
        .pipeline(RoutedModel::new("{}"), PacingPolicy::none())
        .generate_all(&source)
        .await
        .unwrap();

    assert_eq!(stats.generated, 2);
    assert!(ws.config.model_answers_path().exists());
    assert_eq!(banner_headers(&ws.insights().unwrap()).len(), 2);
}

#[tokio::test]
async fn missing_question_bank_is_reported() {
    let ws = Workspace::with_questions(&[1]);
    std::fs::remove_file(ws.config.questions_path()).unwrap();

    let err = ws
        .pipeline(RoutedModel::new("{}"), PacingPolicy::none())
        .generate_model_answers()
        .await
        .unwrap_err();

    assert!(err.is_prerequisite());
    assert!(!ws.config.model_answers_path().exists());
}

#[tokio::test(start_paused = true)]
async fn pacing_delay_follows_each_call() {
    let ws = Workspace::with_questions(&[1, 2]);
    let pipeline = ws.pipeline(RoutedModel::new("{}"), PacingPolicy::new(Duration::from_secs(20)));

    let started = tokio::time::Instant::now();
    pipeline.generate_model_answers().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(40));
}

#[test]
fn runtime_helpers_are_usable_from_sync_tests() {
    let ws = Workspace::with_questions(&[1]);
    ws.write_model_answers(&[1]);
    let source = ws.write_text_answers("Question 1: sync");

    let stats = tokio_test::block_on(
        ws.pipeline(RoutedModel::new("{}"), PacingPolicy::none())
            .generate_insights(&source),
    );
    tokio_test::assert_ok!(&stats);
    assert!(ws.insights().unwrap().contains("CRITIQUE for **Question:** \"Question text 1\""));
}
