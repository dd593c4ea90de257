//! Query lifecycle tests against stub collaborators

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use ragdesk::ledger::InteractionLedger;
use ragdesk::models::CallerIdentity;
use ragdesk::protocol::StreamEvent;
use ragdesk::rag::pipeline::INTERNAL_ERROR;
use ragdesk::rag::OrchestratorOptions;
use ragdesk::RagDeskError;
use tokio::sync::mpsc;

async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn tokens(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Token { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_vacation_policy_scenario() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever {
            chunks: vec![hr_chunk()],
            ..StubRetriever::default()
        },
        StubStreamer::with_tokens(&["Employees get ", "15 days of ", "vacation."]),
    );
    let orchestrator = harness.orchestrator();

    let (rx, task) = orchestrator
        .handle("What is the vacation policy?", None, 16)
        .await
        .unwrap();
    let events = drain(rx).await;
    let outcome = task.await.unwrap();

    assert_eq!(
        harness.streamer.context().as_deref(),
        Some("Source: [HR.pdf](https://x/HR.pdf)\nEmployees get 15 days...")
    );

    let answer = "Employees get 15 days of vacation.";
    assert_eq!(tokens(&events), answer);
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], StreamEvent::Token { .. }));
    assert_eq!(events[3], StreamEvent::QueryId { id: Some(1) });
    let StreamEvent::Latency { ms } = events[4] else {
        panic!("expected latency, got {:?}", events[4]);
    };
    assert_eq!(events[5], StreamEvent::Done);

    let record = harness.store.get(1).unwrap().unwrap();
    assert_eq!(record.query, "What is the vacation policy?");
    assert_eq!(record.response, answer);
    assert_eq!(record.created_by, "system");
    assert_eq!(record.time_to_result_ms, ms as i64);
    assert_eq!(outcome.total_ms, ms);
    assert_eq!(outcome.record_id, Some(1));
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_blank_question_makes_no_collaborator_calls() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&["unused"]),
    );
    let orchestrator = harness.orchestrator();

    for question in ["", "   \n\t"] {
        let err = orchestrator.handle(question, None, 16).await.unwrap_err();
        assert!(matches!(err, RagDeskError::MissingInput));
    }
    assert_eq!(harness.collaborator_calls(), (0, 0, 0));
    assert!(harness.store.list(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_opens_no_stream() {
    let harness = Harness::new(
        StubEmbedder {
            fail: true,
            ..StubEmbedder::default()
        },
        StubRetriever::default(),
        StubStreamer::with_tokens(&["unused"]),
    );

    let err = harness
        .orchestrator()
        .handle("What is the vacation policy?", None, 16)
        .await
        .unwrap_err();

    match err {
        RagDeskError::UpstreamFailure { phase, message } => {
            assert_eq!(phase, "embed");
            assert!(message.contains("embedding service down"));
        }
        other => panic!("expected upstream failure, got {other:?}"),
    }
    assert_eq!(harness.collaborator_calls(), (1, 0, 0));
    assert!(harness.store.list(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retrieval_failure_is_upstream() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever {
            fail: true,
            ..StubRetriever::default()
        },
        StubStreamer::with_tokens(&["unused"]),
    );

    let err = harness.orchestrator().handle("q", None, 16).await.unwrap_err();
    assert!(matches!(err, RagDeskError::UpstreamFailure { phase: "retrieve", .. }));
    assert_eq!(harness.collaborator_calls(), (1, 1, 0));
}

#[tokio::test]
async fn test_slow_lookup_times_out() {
    let harness = Harness::new(
        StubEmbedder {
            delay: Some(Duration::from_secs(5)),
            ..StubEmbedder::default()
        },
        StubRetriever::default(),
        StubStreamer::default(),
    );
    let options = OrchestratorOptions {
        upstream_timeout: Some(Duration::from_millis(50)),
        ..OrchestratorOptions::default()
    };
    let orchestrator = harness.orchestrator_with(harness.store.clone(), options);

    let err = orchestrator.handle("q", None, 16).await.unwrap_err();
    assert!(matches!(
        err,
        RagDeskError::UpstreamFailure {
            phase: "embed+retrieve",
            ..
        }
    ));
}

#[tokio::test]
async fn test_generation_failure_records_partial_answer() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer {
            fail_with: Some("model overloaded".to_string()),
            ..StubStreamer::with_tokens(&["Hello "])
        },
    );

    let (rx, task) = harness.orchestrator().handle("Hi?", None, 16).await.unwrap();
    let events = drain(rx).await;
    let outcome = task.await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::token("Hello "));
    match &events[1] {
        StreamEvent::Error { message } => assert!(message.contains("model overloaded")),
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(harness.store.get(1).unwrap().unwrap().response, "Hello ");
    assert_eq!(outcome.answer, "Hello ");
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_persistence_failure_still_completes() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever {
            chunks: vec![hr_chunk()],
            ..StubRetriever::default()
        },
        StubStreamer::with_tokens(&["15 days."]),
    );
    let ledger = Arc::new(FailingLedger::default());
    let orchestrator = harness.orchestrator_with(ledger.clone(), OrchestratorOptions::default());

    let (rx, task) = orchestrator.handle("q", None, 16).await.unwrap();
    let events = drain(rx).await;
    task.await.unwrap();

    assert_eq!(events[0], StreamEvent::token("15 days."));
    assert_eq!(events[1], StreamEvent::QueryId { id: None });
    assert!(matches!(events[2], StreamEvent::Latency { .. }));
    assert_eq!(events[3], StreamEvent::Done);
    assert_eq!(events.len(), 4);
    assert_eq!(ledger.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_ledger_still_ends_with_error() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&["Hi"]),
    );
    let orchestrator =
        harness.orchestrator_with(Arc::new(PanickingLedger), OrchestratorOptions::default());

    let (rx, task) = orchestrator.handle("q", None, 16).await.unwrap();
    let events = drain(rx).await;
    let outcome = task.await.unwrap();

    assert_eq!(
        events,
        vec![StreamEvent::token("Hi"), StreamEvent::error(INTERNAL_ERROR)]
    );
    assert_eq!(outcome.error.as_deref(), Some(INTERNAL_ERROR));
    assert_eq!(outcome.record_id, None);
}

#[tokio::test]
async fn test_zero_chunks_still_generates() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&["I could not find that in the documents."]),
    );

    let (rx, _task) = harness.orchestrator().handle("q", None, 16).await.unwrap();
    let events = drain(rx).await;

    assert_eq!(harness.streamer.context().as_deref(), Some(""));
    assert_eq!(events.last(), Some(&StreamEvent::Done));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_caller_display_name_is_recorded() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&["ok"]),
    );
    let caller = CallerIdentity::new("u-1", Some("ada@example.com".to_string()));

    let (rx, task) = harness.orchestrator().handle("q", Some(caller), 16).await.unwrap();
    drain(rx).await;
    task.await.unwrap();

    assert_eq!(harness.store.get(1).unwrap().unwrap().created_by, "ada@example.com");
}

#[tokio::test]
async fn test_disconnect_still_records() {
    let many: Vec<String> = (0..200).map(|i| format!("t{i} ")).collect();
    let refs: Vec<&str> = many.iter().map(String::as_str).collect();
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&refs),
    );

    let (mut rx, task) = harness.orchestrator().handle("q", None, 1).await.unwrap();
    assert_eq!(rx.recv().await, Some(StreamEvent::token("t0 ")));
    drop(rx);

    let outcome = task.await.unwrap();
    assert!(outcome.disconnected);
    assert!(outcome.answer.starts_with("t0 "));
    assert_ne!(outcome.answer, many.concat());

    let record = harness.store.get(1).unwrap().unwrap();
    assert_eq!(record.response, outcome.answer);
}

#[tokio::test]
async fn test_concurrent_queries_are_independent() {
    let harness = Harness::new(
        StubEmbedder::default(),
        StubRetriever::default(),
        StubStreamer::with_tokens(&["a", "b", "c"]),
    );
    let orchestrator = harness.orchestrator();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let orchestrator = orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            let (rx, _task) = orchestrator.handle(&format!("q{i}"), None, 4).await.unwrap();
            drain(rx).await
        }));
    }
    for task in tasks {
        let events = task.await.unwrap();
        assert_eq!(tokens(&events), "abc");
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }
    assert_eq!(harness.store.list(1).await.unwrap().len(), 8);
}
