// Integration tests for family orchestration against a mocked model server

use anyhow::Result;
use honeyduo::config::Config;
use honeyduo::family::Member;
use honeyduo::logging::InteractionLog;
use honeyduo::ollama::{ModelServer, OllamaClient};
use honeyduo::orchestrator::{MarketSnapshot, Orchestrator};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn chat_reply(model: &str, content: &str) -> String {
    json!({
        "model": model,
        "message": {"role": "assistant", "content": content},
        "done": true
    })
    .to_string()
}

fn orchestrator(url: String, root: &std::path::Path) -> Result<Orchestrator> {
    let mut config = Config::with_project_root(root.to_path_buf());
    config.model_server.base_url = url.clone();
    let server: Arc<dyn ModelServer> = Arc::new(OllamaClient::new(url)?);
    Ok(Orchestrator::new(server, &config)?
        .with_health_pause(Duration::ZERO)
        .with_quick_deadline(Duration::from_secs(5)))
}

#[tokio::test]
async fn test_decision_chain_runs_all_members_and_logs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = mockito::Server::new_async().await;
    let config = Config::with_project_root(dir.path().to_path_buf());

    let mut mocks = Vec::new();
    for (member, answer) in [
        (Member::Nyala, "BUY, confidence 70%"),
        (Member::Deon, "Risk grade B"),
        (Member::Claudae, "Approved"),
    ] {
        let model = config.family.profile(member).model.clone();
        mocks.push(
            server
                .mock("POST", "/api/chat")
                .match_body(Matcher::PartialJson(json!({ "model": model })))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(chat_reply(&model, answer))
                .create_async()
                .await,
        );
    }

    let orchestrator = orchestrator(server.url(), dir.path())?;
    let mut market = MarketSnapshot::new("BTC", 45_000.0);
    market.change_24h = Some(2.5);
    let decision = orchestrator.coordinate_decision(&market).await;

    assert!(decision.is_complete());
    assert_eq!(decision.get(Member::Deon).map(|r| r.text()), Some("Risk grade B"));
    assert_eq!(decision.to_json()["claudae"]["response"], "Approved");

    let log = InteractionLog::new(dir.path().join("ai_family/logs"))?;
    for member in Member::ALL {
        assert_eq!(log.read(member)?.len(), 1, "{} should have one record", member);
    }
    Ok(())
}

#[tokio::test]
async fn test_decision_chain_stops_after_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let orchestrator = orchestrator(server.url(), dir.path())?;
    let decision = orchestrator
        .coordinate_decision(&MarketSnapshot::new("ETH", 3_000.0))
        .await;

    assert_eq!(decision.steps.len(), 1);
    assert!(!decision.is_complete());
    assert!(decision.steps[0].error.is_some());
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_quick_decision_falls_back_to_hold_on_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(503)
        .create_async()
        .await;

    let orchestrator = orchestrator(server.url(), dir.path())?;
    let answers = orchestrator
        .quick_decision(&MarketSnapshot::new("BTC", 45_000.0))
        .await;

    assert!(!answers.is_empty());
    for answer in answers.values() {
        assert!(answer.is_fallback());
        assert_eq!(answer.to_json()["decision"], "HOLD");
    }
    Ok(())
}

#[tokio::test]
async fn test_quick_decision_holds_with_timeout_when_server_stalls() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let orchestrator = orchestrator(url, dir.path())?.with_quick_deadline(Duration::from_millis(400));
    let answers = orchestrator
        .quick_decision(&MarketSnapshot::new("BTC", 45_000.0))
        .await;

    assert_eq!(answers.len(), 2);
    for member in [Member::Nyala, Member::Deon] {
        assert_eq!(
            answers[&member].to_json(),
            json!({"decision": "HOLD", "reason": "timeout"})
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_ask_writes_member_test_log() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"model": "phi:2.7b", "response": "Ready.", "done": true}).to_string())
        .create_async()
        .await;

    let orchestrator = orchestrator(server.url(), dir.path())?;
    let answer = orchestrator.ask(Member::Nyala, "status?").await?;
    assert_eq!(answer, "Ready.");

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(
        dir.path().join("ai_family/nyala/test_log.json"),
    )?)?;
    assert_eq!(saved["prompt"], "status?");
    assert_eq!(saved["response"], "Ready.");
    Ok(())
}

#[tokio::test]
async fn test_ask_unreachable_server_returns_error_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // Nothing listens on this port
    let orchestrator = orchestrator("http://127.0.0.1:9".to_string(), dir.path())?;
    let answer = orchestrator.ask(Member::Deon, "hello").await?;
    assert!(answer.starts_with("Error:"), "got: {}", answer);
    Ok(())
}
