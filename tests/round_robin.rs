//! Round-robin orchestration integration tests
//!
//! Exercises the run loop end to end through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roundtable::core::{MessageContent, ParticipantError, RoundtableError};
use roundtable::team::{
    Participant, RoundRobinTeam, RunStatus, ScriptedParticipant, SourceMention, ToolParticipant,
    TurnContext,
};
use roundtable::tools::{FnTool, ToolRegistry};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn scripted(id: &str, reply: &str) -> ScriptedParticipant {
    ScriptedParticipant::new(id, [reply])
}

/// Records how many messages it saw each turn
struct Observer {
    seen: Arc<std::sync::Mutex<Vec<usize>>>,
}

#[async_trait]
impl Participant for Observer {
    fn id(&self) -> &str {
        "observer"
    }

    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError> {
        self.seen.lock().unwrap().push(ctx.history().len());
        Ok("noted".to_string())
    }
}

/// Cancels the run from inside its own turn, then replies anyway
struct SelfCancelling;

#[async_trait]
impl Participant for SelfCancelling {
    fn id(&self) -> &str {
        "canceller"
    }

    async fn take_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, ParticipantError> {
        ctx.cancel_token().cancel();
        Ok("late reply".to_string())
    }
}

#[tokio::test]
async fn test_three_participants_five_turns() {
    let team = RoundRobinTeam::builder()
        .participant(scripted("A", "a"))
        .participant(scripted("B", "b"))
        .participant(scripted("C", "c"))
        .marker("TERMINATE")
        .max_turns(5)
        .build()
        .unwrap();

    let result = team.run("task").await;
    let speakers: Vec<&str> = result.messages[1..]
        .iter()
        .map(|m| m.source.as_str())
        .collect();

    assert_eq!(speakers, vec!["A", "B", "C", "A", "B"]);
    assert_eq!(result.status, RunStatus::Exhausted);
    assert!(result.clone().into_completed().is_err());
}

#[tokio::test]
async fn test_search_analyze_persist_completes_on_turn_three() {
    let team = RoundRobinTeam::builder()
        .participant(scripted("Search", "3 results"))
        .participant(scripted("Analyze", "2 relevant"))
        .participant(scripted("Persist", "saved. TERMINATE"))
        .marker("TERMINATE")
        .max_turns(6)
        .build()
        .unwrap();

    let result = team.run("find articles").await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.messages.len(), 4);
    assert_eq!(result.turns, 3);
    assert_eq!(result.final_message().unwrap().source, "Persist");
}

#[tokio::test]
async fn test_tool_network_error_does_not_abort_run() {
    let mut registry = ToolRegistry::new();
    registry
        .register(FnTool::new("web_search", "Search the web", |_| async {
            Err::<String, _>(RoundtableError::other("connection refused"))
        }))
        .unwrap();

    let team = RoundRobinTeam::builder()
        .participant(ToolParticipant::new(
            "Search",
            "web_search",
            json!({"query": "{{task}}"}),
        ))
        .participant(scripted("Analyze", "nothing to analyze. TERMINATE"))
        .marker("TERMINATE")
        .max_turns(6)
        .tools(Arc::new(registry))
        .build()
        .unwrap();

    let result = team.run("rust news").await;

    assert_eq!(result.status, RunStatus::Completed);
    let search_reply = result
        .messages
        .iter()
        .find(|m| m.source == "Search" && m.text().is_some())
        .unwrap();
    assert!(search_reply.text().unwrap().contains("web_search"));
    assert!(search_reply.text().unwrap().contains("connection refused"));
    assert_eq!(result.final_message().unwrap().source, "Analyze");
}

#[tokio::test]
async fn test_tool_exchanges_precede_reply() {
    let mut registry = ToolRegistry::new();
    registry
        .register(FnTool::new("echo", "Echo", |args: Value| async move {
            Ok::<_, RoundtableError>(args["text"].as_str().unwrap_or_default().to_string())
        }))
        .unwrap();

    let team = RoundRobinTeam::builder()
        .participant(
            ToolParticipant::new("echoer", "echo", json!({"text": "{{task}}"}))
                .with_suffix("TERMINATE"),
        )
        .marker("TERMINATE")
        .tools(Arc::new(registry))
        .build()
        .unwrap();

    let result = team.run("hello").await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.messages.len(), 4);
    assert!(matches!(result.messages[1].content, MessageContent::ToolCall(_)));
    assert!(matches!(result.messages[2].content, MessageContent::ToolResult(_)));
    assert_eq!(result.messages[3].text(), Some("hello TERMINATE"));
    for (index, message) in result.messages.iter().enumerate() {
        assert_eq!(message.sequence, index);
    }
}

#[tokio::test]
async fn test_history_grows_every_turn() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let team = RoundRobinTeam::builder()
        .participant(Observer { seen: seen.clone() })
        .participant(scripted("other", "ok"))
        .marker("TERMINATE")
        .max_turns(5)
        .build()
        .unwrap();

    let result = team.run("task").await;

    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 5]);
    assert_eq!(result.messages.len(), 6);
}

#[tokio::test]
async fn test_cancel_before_start_keeps_only_seed() {
    let team = RoundRobinTeam::builder()
        .participant(scripted("A", "a"))
        .marker("TERMINATE")
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = team.run_with_cancel("task", cancel).await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.messages.len(), 1);
    assert!(result.messages[0].is_seed());
    assert!(matches!(
        result.into_completed(),
        Err(RoundtableError::CancellationRequested)
    ));
}

#[tokio::test]
async fn test_reply_after_cancellation_is_discarded() {
    let team = RoundRobinTeam::builder()
        .participant(scripted("A", "a"))
        .participant(SelfCancelling)
        .marker("TERMINATE")
        .build()
        .unwrap();

    let result = team.run_with_cancel("task", CancellationToken::new()).await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.turns, 1);
}

#[tokio::test]
async fn test_source_mention_ignores_other_speakers() {
    let team = RoundRobinTeam::builder()
        .participant(scripted("writer", "APPROVE this please"))
        .participant(scripted("critic", "APPROVE"))
        .termination(SourceMention::new("critic", "APPROVE"))
        .max_turns(4)
        .build()
        .unwrap();

    let result = team.run("draft").await;
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.turns, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_share_registry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut registry = ToolRegistry::new();
    registry
        .register(FnTool::new("count", "Count calls", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, RoundtableError>("counted".to_string())
            }
        }))
        .unwrap();

    let team = RoundRobinTeam::builder()
        .participant(ToolParticipant::new("counter", "count", json!({})))
        .participant(scripted("closer", "TERMINATE"))
        .marker("TERMINATE")
        .tools(Arc::new(registry))
        .build()
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let team = team.clone();
            tokio::spawn(async move { team.run(format!("task {}", i)).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.messages[0].text(), Some(format!("task {}", i).as_str()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}
