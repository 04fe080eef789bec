// Quick decision: bounded parallel fan-out with a per-call deadline
//
// Any call that misses its deadline or fails is replaced by a HOLD decision,
// so the caller always gets one answer per member.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::prompts::{quick_risk, quick_trade, MarketSnapshot};
use crate::config::constants::QUICK_DECISION_MAX_WORKERS;
use crate::family::{Member, Roster};
use crate::ollama::{GenerateOptions, ModelRequest, ModelServer};

/// What a quick call is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickKind {
    Decision,
    Risk,
}

impl QuickKind {
    fn key(&self) -> &'static str {
        match self {
            QuickKind::Decision => "decision",
            QuickKind::Risk => "risk",
        }
    }
}

/// One member's answer (or the HOLD placeholder)
#[derive(Debug, Clone, PartialEq)]
pub enum QuickAnswer {
    Answered {
        kind: QuickKind,
        text: String,
        model: String,
    },
    Fallback {
        reason: String,
    },
}

impl QuickAnswer {
    fn hold(reason: impl Into<String>) -> Self {
        QuickAnswer::Fallback {
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, QuickAnswer::Fallback { .. })
    }

    pub fn to_json(&self) -> Value {
        match self {
            QuickAnswer::Answered { kind, text, model } => {
                json!({ kind.key(): text, "model": model })
            }
            QuickAnswer::Fallback { reason } => json!({ "decision": "HOLD", "reason": reason }),
        }
    }
}

struct QuickJob {
    member: Member,
    kind: QuickKind,
    request: ModelRequest,
}

/// Ask Nyala for a trade call and Deon for a risk level in parallel
pub async fn quick_decision(
    server: Arc<dyn ModelServer>,
    roster: &Roster,
    market: &MarketSnapshot,
    deadline: Duration,
) -> BTreeMap<Member, QuickAnswer> {
    let jobs = vec![
        QuickJob {
            member: Member::Nyala,
            kind: QuickKind::Decision,
            request: ModelRequest::new(
                roster.profile(Member::Nyala).model.clone(),
                quick_trade(market),
                deadline,
            )
            .with_options(GenerateOptions::new(0.1, 50)),
        },
        QuickJob {
            member: Member::Deon,
            kind: QuickKind::Risk,
            request: ModelRequest::new(
                roster.profile(Member::Deon).model.clone(),
                quick_risk(market),
                deadline,
            )
            .with_options(GenerateOptions::new(0.1, 30)),
        },
    ];

    fan_out(server, jobs, deadline).await
}

async fn fan_out(
    server: Arc<dyn ModelServer>,
    jobs: Vec<QuickJob>,
    deadline: Duration,
) -> BTreeMap<Member, QuickAnswer> {
    let permits = Arc::new(Semaphore::new(QUICK_DECISION_MAX_WORKERS));
    let mut set = JoinSet::new();
    let members: Vec<Member> = jobs.iter().map(|job| job.member).collect();

    for job in jobs {
        let server = Arc::clone(&server);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let answer = match permits.acquire_owned().await {
                Ok(_permit) => {
                    match tokio::time::timeout(deadline, server.chat(&job.request)).await {
                        Ok(Ok(reply)) => QuickAnswer::Answered {
                            kind: job.kind,
                            text: reply.text,
                            model: reply.model,
                        },
                        Ok(Err(e)) => {
                            warn!(member = %job.member, error = %e, "Quick call failed");
                            QuickAnswer::hold(e.reason())
                        }
                        Err(_) => {
                            warn!(member = %job.member, "Quick call missed its deadline");
                            QuickAnswer::hold("timeout")
                        }
                    }
                }
                Err(_) => QuickAnswer::hold("cancelled"),
            };
            (job.member, answer)
        });
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((member, answer)) => {
                results.insert(member, answer);
            }
            Err(e) => warn!(error = %e, "Quick call task panicked"),
        }
    }
    for member in members {
        results
            .entry(member)
            .or_insert_with(|| QuickAnswer::hold("task_failed"));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::ollama::fake::ScriptedServer;
    use crate::ollama::ModelReply;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn market() -> MarketSnapshot {
        MarketSnapshot::new("BTC-USD", 95420.5)
    }

    #[tokio::test]
    async fn test_both_answer() {
        let server = Arc::new(ScriptedServer::new(|req| {
            if req.prompt.starts_with("QUICK") {
                Ok("BUY on momentum".to_string())
            } else {
                Ok("MEDIUM".to_string())
            }
        }));
        let results = quick_decision(
            server.clone(),
            &Roster::default(),
            &market(),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[&Member::Nyala].to_json(),
            json!({"decision": "BUY on momentum", "model": "mixtral:8x7b"})
        );
        assert_eq!(results[&Member::Deon].to_json()["risk"], "MEDIUM");

        let calls = server.calls();
        assert!(calls.iter().all(|c| c.options.temperature == Some(0.1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_member_falls_back_to_hold() {
        let server = Arc::new(
            ScriptedServer::constant("SELL").with_delay("llama2:13b", Duration::from_secs(30)),
        );
        let results =
            quick_decision(server, &Roster::default(), &market(), Duration::from_secs(5)).await;

        assert!(!results[&Member::Nyala].is_fallback());
        assert_eq!(
            results[&Member::Deon].to_json(),
            json!({"decision": "HOLD", "reason": "timeout"})
        );
    }

    #[tokio::test]
    async fn test_panicking_call_still_yields_hold() {
        let server = Arc::new(ScriptedServer::new(|req| {
            if req.model == "llama2:13b" {
                panic!("responder blew up");
            }
            Ok("BUY".to_string())
        }));
        let results =
            quick_decision(server, &Roster::default(), &market(), Duration::from_secs(5)).await;

        assert_eq!(results.len(), 2);
        assert!(!results[&Member::Nyala].is_fallback());
        assert_eq!(
            results[&Member::Deon].to_json(),
            json!({"decision": "HOLD", "reason": "task_failed"})
        );
    }

    /// Counts calls in flight and remembers the peak
    #[derive(Default)]
    struct GaugedServer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ModelServer for GaugedServer {
        async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
            self.chat(request).await
        }

        async fn chat(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ModelReply {
                model: request.model.clone(),
                text: "HOLD".to_string(),
                elapsed: Duration::from_secs(1),
            })
        }

        async fn list_models(&self) -> Result<Vec<String>, ModelError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "gauged"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_never_exceeds_worker_limit() {
        let server = Arc::new(GaugedServer::default());
        let jobs = (0..QUICK_DECISION_MAX_WORKERS * 3)
            .map(|i| QuickJob {
                member: Member::ALL[i % Member::ALL.len()],
                kind: QuickKind::Decision,
                request: ModelRequest::new("m", "p", Duration::from_secs(10)),
            })
            .collect();

        let results = fan_out(server.clone(), jobs, Duration::from_secs(10)).await;

        assert_eq!(server.peak.load(Ordering::SeqCst), QUICK_DECISION_MAX_WORKERS);
        assert_eq!(results.len(), Member::ALL.len());
        assert!(results.values().all(|a| !a.is_fallback()));
    }

    #[tokio::test]
    async fn test_offline_server_holds_everything() {
        let server = Arc::new(ScriptedServer::offline());
        let results =
            quick_decision(server, &Roster::default(), &market(), Duration::from_secs(5)).await;

        assert_eq!(results.len(), 2);
        for answer in results.values() {
            assert_eq!(answer.to_json()["decision"], "HOLD");
            assert_eq!(answer.to_json()["reason"], "unreachable");
        }
    }
}
