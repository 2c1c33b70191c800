use exam_coach::clients::{NoopEvaluator, StaticGenerator};
use exam_coach::config::Config;
use exam_coach::infrastructure::{ExamStore, JsonFileStore, ManualClock, MemoryStore, SystemClock};
use exam_coach::models::{ExamRequest, FeedbackTier, QuestionType, NO_ANSWER};
use exam_coach::orchestrator::session_runner::{self, RunnerDeps};
use exam_coach::services::{question_bank, RecordingNotifier};
use exam_coach::utils::logging;
use exam_coach::{ExamFlow, Strategy};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

fn ten_question_payload() -> serde_json::Value {
    let questions: Vec<_> = (1..=10)
        .map(|n| {
            json!({
                "id": format!("gen_{}", n),
                "question": format!("What is {} + {}?", n, n),
                "options": [format!("{}", n * 2), format!("{}", n * 2 + 1)],
                "correct_answer": format!("{}", n * 2)
            })
        })
        .collect();
    json!({ "success": true, "result": { "questions": questions } })
}

fn flow_with(
    payload: serde_json::Value,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
) -> ExamFlow {
    ExamFlow::new(
        &Config::default(),
        Arc::new(StaticGenerator::with_result(payload)),
        store,
        notifier,
        Arc::new(ManualClock::new(Utc.timestamp_millis_opt(1_714_000_000_000).unwrap())),
    )
}

#[tokio::test(start_paused = true)]
async fn test_generate_take_and_score_exam() {
    logging::init(false);

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let flow = flow_with(ten_question_payload()["result"].clone(), store.clone(), notifier.clone());

    let request = ExamRequest::new("Mathematics", "Addition").with_question_count(10);
    let generated = flow.generate(&request).await.expect("出题失败");
    assert_eq!(generated.strategy, Strategy::StructuredResult);
    assert_eq!(generated.exam.question_count(), 10);

    let session = flow.start_session(Arc::clone(&generated.exam)).expect("开考失败");
    let deps = RunnerDeps::new(
        &Config::default(),
        store.clone(),
        notifier.clone(),
        Arc::new(NoopEvaluator),
        Arc::new(SystemClock),
    );
    let (handle, task) = session_runner::spawn(session, deps);

    // 前 7 题答对，第 8、9 题答错，第 10 题不答
    for (index, question) in generated.exam.questions.iter().enumerate().take(9) {
        let answer = if index < 7 {
            question.correct_answer.clone()
        } else {
            "wrong".to_string()
        };
        handle.answer(index, answer).await.expect("作答失败");
        if index < 8 {
            handle.next().await.expect("翻页失败");
        }
    }

    let result = handle.finish().await.expect("交卷失败");
    assert_eq!(result.score, 70);
    assert_eq!(result.correct_count, 7);
    assert_eq!(result.total_questions, 10);
    assert_eq!(result.feedback_tier, FeedbackTier::Good);
    assert_eq!(result.feedback, "Good job! Keep practicing.");
    assert_eq!(result.per_question[9].user_answer, NO_ANSWER);
    assert_eq!(result.exam_id, generated.exam.id);

    let outcome = task.await.expect("会话任务异常");
    assert!(Arc::ptr_eq(&outcome.result, &result));

    let history = store.load_history("demo-user").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, 70);

    assert_eq!(
        notifier.messages(),
        vec![
            "Exam generated successfully!",
            "Exam started! Good luck!",
            "Exam completed! Score: 70% (7/10)",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_exam_times_out() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let flow = flow_with(json!("The model returned nothing useful."), store.clone(), notifier.clone());

    let request = ExamRequest::new("Chemistry", "Atoms")
        .with_question_count(3)
        .with_time_limit(2);
    let generated = flow.generate(&request).await.unwrap();
    assert_eq!(generated.strategy, Strategy::Fallback);
    assert_eq!(
        generated.exam.questions[0],
        question_bank::fallback_question("Chemistry", "Atoms", 1, QuestionType::Mcq)
    );

    let session = flow.start_session(Arc::clone(&generated.exam)).unwrap();
    let deps = RunnerDeps::new(
        &Config::default(),
        store.clone(),
        notifier.clone(),
        Arc::new(NoopEvaluator),
        Arc::new(SystemClock),
    );
    let (handle, task) = session_runner::spawn(session, deps);

    let outcome = task.await.unwrap();
    assert!(outcome.timed_out);
    assert_eq!(outcome.result.score, 0);
    assert_eq!(outcome.result.time_taken_minutes, 2);
    assert_eq!(outcome.result.feedback_tier, FeedbackTier::NeedsPractice);
    assert!(outcome.result.per_question.iter().all(|o| o.user_answer == NO_ANSWER));

    assert!(handle.is_finished());
    assert!(handle.answer(0, "Au").await.is_err());
    assert!(notifier
        .messages()
        .contains(&"Time is up! Exam submitted automatically.".to_string()));
}

#[tokio::test]
async fn test_free_text_exam_persisted_to_files() {
    let dir = std::env::temp_dir().join(format!("exam_coach_it_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let text = "Q1: Which organelle contains DNA?\nA) Nucleus\nB) Ribosome\nAnswer: A\n\
                Q2: Explain photosynthesis.\nAnswer: Light becomes chemical energy.\n";
    let config = Config {
        user_id: "student-1".to_string(),
        ..Config::default()
    };
    let notifier = Arc::new(RecordingNotifier::new());
    let flow = ExamFlow::new(
        &config,
        Arc::new(StaticGenerator::with_result(json!(text))),
        Arc::new(JsonFileStore::new(&dir)),
        notifier,
        Arc::new(SystemClock),
    );

    let request = ExamRequest::new("Biology", "Cells")
        .with_question_count(2)
        .with_question_types(vec![QuestionType::Mcq, QuestionType::Text]);
    let generated = flow.generate(&request).await.unwrap();
    assert_eq!(generated.strategy, Strategy::FreeText);
    assert_eq!(generated.exam.questions[0].correct_answer, "Nucleus");
    assert_eq!(
        generated.exam.questions[1].correct_answer,
        "Light becomes chemical energy."
    );

    generated.persisted.await.unwrap();
    let reloaded = JsonFileStore::new(&dir);
    let exams = reloaded.load_exams("student-1").await.unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0].questions, generated.exam.questions);

    let _ = std::fs::remove_dir_all(&dir);
}
