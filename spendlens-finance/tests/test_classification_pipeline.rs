use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use spendlens_core::{
    CategoryBudget, ClassificationResult, Direction, NormalizedTransaction, Route, StatementSource, VerificationDecision,
    VerificationStatus,
};
use spendlens_finance::{
    BudgetAlert, BudgetMonitor, ClassificationWorkflow, InsightsEngine, JobBoard, JobStatus, MemoryStore, Notifier, Oracle,
    OracleError, ResponseMode, TransactionStore, WorkflowConfig, INSIGHTS_FAILED, NO_VERIFIED_DATA, ROAST_FALLBACK,
};
use spendlens_ingest::{ingest_document, RawStatementDocument, StatementFormat};

/// Canned oracle: fixed JSON for classification, fixed text for everything else.
#[derive(Default)]
struct StubOracle {
    json: Option<String>,
    text: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(ResponseMode, String)>>,
}

impl StubOracle {
    fn json(body: &str) -> Self {
        Self {
            json: Some(body.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self, mode: ResponseMode) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == mode)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn generate(&self, prompt: &str, mode: ResponseMode) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push((mode, prompt.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let canned = match mode {
            ResponseMode::Json => self.json.clone(),
            ResponseMode::Text => self.text.clone(),
        };
        canned.ok_or_else(|| OracleError::Transport("stub offline".into()))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<BudgetAlert>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn budget_exceeded(&self, alert: BudgetAlert) -> anyhow::Result<()> {
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }
}

fn workflow(store: &Arc<MemoryStore>, oracle: &Arc<StubOracle>, notifier: &Arc<RecordingNotifier>) -> ClassificationWorkflow {
    ClassificationWorkflow::new(store.clone(), oracle.clone(), notifier.clone(), WorkflowConfig::default())
}

fn txn(date: NaiveDate, details: &str, amount: f64) -> NormalizedTransaction {
    NormalizedTransaction::new(Some(date), details, amount, Direction::Debit)
        .with_owner("u1")
        .with_source(StatementSource::Bank)
}

fn nov(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
}

fn verdicts(confidences: &[f64]) -> String {
    let items: Vec<String> = confidences
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                r#"{{"id": {}, "category": "Shopping", "tags": ["impulse"], "confidence": {c}, "requires_human_verification": false}}"#,
                i + 1
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

async fn seed(store: &MemoryStore, n: u32) {
    let batch = (1..=n).map(|d| txn(nov(d), &format!("ECOM PUR {d}"), 100.0 * d as f64)).collect();
    assert_eq!(store.upsert_transactions(batch).await.unwrap(), n as usize);
}

/// Ingest a Google Pay export, classify it, and check the Blinkit row ends up trusted.
#[tokio::test]
async fn test_blinkit_from_statement_to_ai_verified() {
    let doc = RawStatementDocument::from_text("01Nov,2025 PaidtoBlinkit ₹425\n").with_filename("GPay_Statement.pdf");
    let report = ingest_document(&doc, Some(StatementSource::Upi), Some("u1"));
    assert_eq!(report.format, StatementFormat::GPay);
    assert_eq!(report.records[0].details, "Blinkit");
    assert_eq!(report.records[0].amount, 425.0);

    let store = Arc::new(MemoryStore::new());
    store.upsert_transactions(report.records.clone()).await.unwrap();
    // re-ingesting the same statement adds nothing
    assert_eq!(store.upsert_transactions(report.records).await.unwrap(), 0);

    let oracle = Arc::new(StubOracle::json(
        r#"```json
[{"id": 1, "category": "Groceries", "tags": ["essential", "recurring"], "confidence": 0.93, "requires_human_verification": false}]
```"#,
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;

    assert_eq!(outcome.path, Route::BehavioralAnalysis);
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.flagged_count, 0);

    let prompts = oracle.calls(ResponseMode::Json);
    assert_eq!(prompts.len(), 1);
    let request: serde_json::Value = serde_json::from_str(&prompts[0]).unwrap();
    assert_eq!(request["few_shot_examples"][0]["input"]["transaction_details"], "PaidtoBlinkit");
    assert_eq!(request["inputs"][0]["transaction_details"], "Blinkit");
    assert_eq!(request["inputs"][0]["statement_type"], "UPI");

    let stored = store.transaction(1).unwrap();
    assert_eq!(stored.category.as_deref(), Some("Groceries"));
    assert_eq!(stored.tags, vec!["essential".to_string(), "recurring".to_string()]);
    assert_eq!(stored.verification_status, VerificationStatus::AiVerified);
}

#[tokio::test]
async fn test_all_high_confidence_takes_behavioral_path() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 4).await;
    let oracle = Arc::new(StubOracle::json(&verdicts(&[0.9, 0.9, 0.9, 0.9])));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    assert_eq!(outcome.path, Route::BehavioralAnalysis);
    assert_eq!(outcome.processed, 4);
    assert!(outcome.flagged.is_empty());
}

#[tokio::test]
async fn test_one_doubtful_result_flags_the_batch() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 3).await;
    let oracle = Arc::new(StubOracle::json(&verdicts(&[0.9, 0.5, 0.9])));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    assert_eq!(outcome.path, Route::FlagForReview);
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.flagged_count, 1);
    assert_eq!(outcome.flagged[0].id, 2);

    // persistence happens on both branches
    assert_eq!(store.transaction(1).unwrap().verification_status, VerificationStatus::AiVerified);
    assert_eq!(
        store.transaction(2).unwrap().verification_status,
        VerificationStatus::RequiredHumanVerification
    );
    assert_eq!(store.transaction(3).unwrap().verification_status, VerificationStatus::AiVerified);
}

#[tokio::test]
async fn test_oracle_failure_flags_everything() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    assert_eq!(outcome.path, Route::FlagForReview);
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.flagged_count, 2);
    assert!(outcome.flagged.iter().all(|r| r.category == "Other" && r.confidence == 0.0 && r.tags.is_empty()));
}

#[tokio::test]
async fn test_malformed_oracle_output_flags_everything() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle::json("Sure! Here are your categories: Groceries"));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    assert_eq!(outcome.path, Route::FlagForReview);
    assert_eq!(outcome.flagged_count, 2);
}

#[tokio::test]
async fn test_empty_batch_skips_the_oracle() {
    let store = Arc::new(MemoryStore::new());
    let oracle = Arc::new(StubOracle::json("[]"));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    assert_eq!(outcome.path, Route::FlagForReview);
    assert_eq!(outcome.processed, 0);
    assert!(oracle.calls(ResponseMode::Json).is_empty());
}

#[tokio::test]
async fn test_batch_size_bounds_a_run() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 5).await;
    let oracle = Arc::new(StubOracle::json(&verdicts(&[0.9; 5])));
    let notifier = Arc::new(RecordingNotifier::default());
    let config = WorkflowConfig {
        batch_size: 2,
        ..WorkflowConfig::default()
    };
    let wf = ClassificationWorkflow::new(store.clone(), oracle.clone(), notifier.clone(), config);

    assert_eq!(wf.run(Some("u1"), None).await.processed, 2);
    assert_eq!(wf.run(Some("u1"), None).await.processed, 2);
    assert_eq!(wf.run(Some("u1"), None).await.processed, 1);
}

#[tokio::test]
async fn test_owner_categories_extend_defaults() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 1).await;
    store.set_budget("u1", CategoryBudget::new("Gadgets", 0.0)).unwrap();
    let oracle = Arc::new(StubOracle::json("[]"));
    let notifier = Arc::new(RecordingNotifier::default());

    workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;
    let request: serde_json::Value = serde_json::from_str(&oracle.calls(ResponseMode::Json)[0]).unwrap();
    let mut expected = spendlens_core::default_categories();
    expected.push("Gadgets".to_string());
    assert_eq!(request["categories"], serde_json::json!(expected));
}

fn this_month() -> NaiveDate {
    Utc::now().with_timezone(&chrono_tz::Asia::Kolkata).date_naive()
}

#[tokio::test]
async fn test_exceeded_budget_sends_alert_with_fallback_roast() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_transactions(vec![txn(this_month(), "PaidtoBlinkit", 425.0)])
        .await
        .unwrap();
    store.set_budget("u1", CategoryBudget::new("Groceries", 400.0)).unwrap();

    let oracle = Arc::new(StubOracle::json(
        r#"[{"id": 1, "category": "Groceries", "tags": ["essential"], "confidence": 0.95}]"#,
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = workflow(&store, &oracle, &notifier).run(Some("u1"), Some("u1@example.com")).await;
    assert_eq!(outcome.alerts, 1);

    let alerts = notifier.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, "Groceries");
    assert_eq!(alerts[0].spent, 425.0);
    assert_eq!(alerts[0].limit, 400.0);
    assert_eq!(alerts[0].email, "u1@example.com");
    assert_eq!(alerts[0].message, ROAST_FALLBACK);
}

#[tokio::test]
async fn test_budget_alert_uses_oracle_roast_and_needs_email() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_transactions(vec![txn(this_month(), "AMAZON", 9000.0)])
        .await
        .unwrap();
    store.set_budget("u1", CategoryBudget::new("Shopping", 5000.0)).unwrap();

    let oracle = Arc::new(StubOracle {
        json: Some(verdicts(&[0.97])),
        text: Some("Nine grand on Amazon? Bold.".into()),
        ..StubOracle::default()
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let wf = workflow(&store, &oracle, &notifier);

    let outcome = wf.run(Some("u1"), None).await;
    assert_eq!(outcome.alerts, 0);
    assert!(notifier.alerts.lock().unwrap().is_empty());

    // same spend, now with an address to send to
    let monitor_outcome = BudgetMonitor::new(
        store.clone(),
        oracle.clone(),
        notifier.clone(),
        chrono_tz::Asia::Kolkata,
    )
    .check("u1", "u1@example.com", "Shopping", this_month())
    .await
    .unwrap();
    assert_eq!(monitor_outcome.message, "Nine grand on Amazon? Bold.");
    assert!(oracle.calls(ResponseMode::Text)[0].contains("'Shopping'"));
}

#[tokio::test]
async fn test_insights_without_verified_data() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle::default());
    let engine = InsightsEngine::new(store.clone(), oracle.clone());

    let report = engine.generate("u1", &[]).await;
    assert_eq!(report.text, NO_VERIFIED_DATA);
    assert!(!report.generated);
    assert!(oracle.calls(ResponseMode::Text).is_empty());
}

#[tokio::test]
async fn test_insights_after_classification() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle {
        json: Some(verdicts(&[0.9, 0.5])),
        text: Some("## Life Stage\n- Fine.".into()),
        ..StubOracle::default()
    });
    let notifier = Arc::new(RecordingNotifier::default());
    workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;

    let engine = InsightsEngine::new(store.clone(), oracle.clone());
    let first = engine.generate("u1", &[]).await;
    assert!(first.generated);
    assert_eq!(first.text, "## Life Stage\n- Fine.");
    // only the trusted row (id 1, 100.0) counts
    assert_eq!(first.stats.categories["Shopping"].debit_total, 100.0);
    assert_eq!(first.stats.tags["impulse"].debit_total, 100.0);
    assert_eq!(store.insights("u1").unwrap().len(), 1);

    let prompt = &oracle.calls(ResponseMode::Text)[0];
    assert!(prompt.contains("Age 30, Yearly Income 50000, Country Unknown"));

    // aggregation is recomputed, not accumulated
    let second = engine.generate("u1", &[]).await;
    assert_eq!(second.stats, first.stats);
}

#[tokio::test]
async fn test_insights_oracle_failure_falls_back() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 1).await;
    store
        .apply_classification(1, "Shopping", &[], VerificationStatus::HumanVerified)
        .await
        .unwrap();
    let oracle = Arc::new(StubOracle::default());
    let engine = InsightsEngine::new(store.clone(), oracle.clone());

    let report = engine.generate("u1", &[]).await;
    assert_eq!(report.text, INSIGHTS_FAILED);
    assert!(!report.generated);
    assert!(store.insights("u1").unwrap().is_empty());
}

#[tokio::test]
async fn test_background_runs_for_one_owner_are_serialized() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle {
        json: Some(verdicts(&[0.9, 0.9])),
        delay: Some(Duration::from_millis(30)),
        ..StubOracle::default()
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let wf = Arc::new(workflow(&store, &oracle, &notifier));

    let board = JobBoard::new();
    let a = board.spawn_classification(wf.clone(), Some("u1".into()), None).await;
    let b = board.spawn_classification(wf.clone(), Some("u1".into()), None).await;

    let a = board.wait(a, Duration::from_millis(5)).await.unwrap();
    let b = board.wait(b, Duration::from_millis(5)).await.unwrap();
    assert_eq!(a.status, JobStatus::Done);
    assert_eq!(b.status, JobStatus::Done);

    let mut processed = vec![
        a.result.unwrap()["processed"].as_u64().unwrap(),
        b.result.unwrap()["processed"].as_u64().unwrap(),
    ];
    processed.sort();
    // the second run finds nothing left to classify
    assert_eq!(processed, vec![0, 2]);
    assert_eq!(oracle.calls(ResponseMode::Json).len(), 1);
}

#[tokio::test]
async fn test_insights_job() {
    let store = Arc::new(MemoryStore::new());
    let oracle = Arc::new(StubOracle::default());
    let engine = Arc::new(InsightsEngine::new(store.clone(), oracle.clone()));

    let board = JobBoard::new();
    let id = board.spawn_insights(engine, "u1".into()).await;
    let job = board.wait(id, Duration::from_millis(5)).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result.unwrap()["text"], NO_VERIFIED_DATA);
}

#[tokio::test]
async fn test_current_results_are_not_double_counted() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 2).await;
    let oracle = Arc::new(StubOracle::json(&verdicts(&[0.9, 0.9])));
    let notifier = Arc::new(RecordingNotifier::default());
    workflow(&store, &oracle, &notifier).run(Some("u1"), None).await;

    // the run's results are already stored as ai_verified
    let current: Vec<ClassificationResult> = (1..=2)
        .map(|id| ClassificationResult {
            id,
            details: format!("ECOM PUR {id}"),
            amount: 100.0 * id as f64,
            direction: Direction::Debit,
            category: "Shopping".into(),
            tags: vec!["impulse".into()],
            confidence: 0.9,
            decision: VerificationDecision::AiVerified,
        })
        .collect();

    let engine = InsightsEngine::new(store.clone(), oracle.clone());
    let stats = engine.aggregate("u1", &current).await;
    assert_eq!(stats.categories["Shopping"].debit_total, 300.0);
    assert_eq!(stats, engine.aggregate("u1", &[]).await);
}

#[tokio::test]
async fn test_lowering_a_budget_alerts_on_existing_spend() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_transactions(vec![txn(this_month(), "DMART", 3000.0)])
        .await
        .unwrap();
    store.set_budget("u1", CategoryBudget::new("Groceries", 5000.0)).unwrap();
    store
        .apply_classification(1, "Groceries", &[], VerificationStatus::HumanVerified)
        .await
        .unwrap();

    let oracle = Arc::new(StubOracle::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = BudgetMonitor::new(store.clone(), oracle.clone(), notifier.clone(), chrono_tz::Asia::Kolkata);
    assert!(monitor.check("u1", "u1@example.com", "Groceries", monitor.today()).await.is_none());

    store.set_budget("u1", CategoryBudget::new("Groceries", 2500.0)).unwrap();
    let alert = monitor
        .check("u1", "u1@example.com", "Groceries", monitor.today())
        .await
        .unwrap();
    assert_eq!(alert.spent, 3000.0);
    assert_eq!(alert.limit, 2500.0);
    assert_eq!(notifier.alerts.lock().unwrap().len(), 1);
}
