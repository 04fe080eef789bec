// Family orchestrator
//
// Routes prompts to the three members, records every call, and chains the
// members together for trading decisions.

mod prompts;
mod quick;

pub use prompts::MarketSnapshot;
pub use quick::{quick_decision, QuickAnswer, QuickKind};

use anyhow::Result;
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::constants::{
    HEALTH_CHECK_PAUSE_SECS, PRELOAD_KEEP_ALIVE, QUICK_DECISION_TIMEOUT_SECS,
};
use crate::config::{Config, ProjectPaths};
use crate::family::{Member, Roster};
use crate::logging::{write_test_log, InteractionLog, InteractionRecord, TestLogEntry};
use crate::ollama::{GenerateOptions, ModelRequest, ModelServer};

/// Results of a chained decision, in the order the members were consulted
#[derive(Debug, Clone, Default)]
pub struct FamilyDecision {
    pub steps: Vec<InteractionRecord>,
}

impl FamilyDecision {
    pub fn get(&self, member: Member) -> Option<&InteractionRecord> {
        self.steps.iter().find(|r| r.ai == member)
    }

    /// True when every consulted member answered and Claudae signed off
    pub fn is_complete(&self) -> bool {
        self.steps.len() == Member::ALL.len() && self.steps.iter().all(|r| r.is_success())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .steps
            .iter()
            .map(|r| {
                (
                    r.ai.key().to_string(),
                    serde_json::to_value(r).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

pub struct Orchestrator {
    server: Arc<dyn ModelServer>,
    roster: Roster,
    paths: ProjectPaths,
    log: InteractionLog,
    ask_timeout: Duration,
    health_pause: Duration,
    quick_deadline: Duration,
}

impl Orchestrator {
    pub fn new(server: Arc<dyn ModelServer>, config: &Config) -> Result<Self> {
        let paths = config.paths();
        let log = InteractionLog::new(paths.logs_dir())?;
        Ok(Self {
            server,
            roster: config.family.clone(),
            paths,
            log,
            ask_timeout: Duration::from_secs(config.model_server.ask_timeout_secs),
            health_pause: Duration::from_secs(HEALTH_CHECK_PAUSE_SECS),
            quick_deadline: Duration::from_secs(QUICK_DECISION_TIMEOUT_SECS),
        })
    }

    /// Pause between members during a health check
    pub fn with_health_pause(mut self, pause: Duration) -> Self {
        self.health_pause = pause;
        self
    }

    pub fn with_quick_deadline(mut self, deadline: Duration) -> Self {
        self.quick_deadline = deadline;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn interaction_log(&self) -> &InteractionLog {
        &self.log
    }

    /// One prompt to one member. Failures come back as "Error: ..." text.
    ///
    /// The exchange overwrites `<member dir>/test_log.json`.
    pub async fn ask(&self, member: Member, prompt: &str) -> Result<String> {
        let profile = self.roster.profile(member);
        let request = ModelRequest::new(profile.model.clone(), prompt, self.ask_timeout);

        let response = match self.server.generate(&request).await {
            Ok(reply) => reply.text,
            Err(e) => {
                warn!(member = %member, error = %e, "Ask failed");
                format!("Error: {}", e)
            }
        };

        write_test_log(
            &self.paths.member_dir(member).join("test_log.json"),
            &TestLogEntry {
                timestamp: Local::now(),
                member: member.display_name().to_string(),
                prompt: prompt.to_string(),
                response: response.clone(),
            },
        )?;

        Ok(response)
    }

    /// Send a prompt (or the member's readiness prompt) and log the outcome
    pub async fn test_member(&self, member: Member, prompt: Option<&str>) -> InteractionRecord {
        let profile = self.roster.profile(member);
        let prompt = prompt
            .map(str::to_string)
            .unwrap_or_else(|| member.readiness_prompt());

        let request = ModelRequest::new(
            profile.model.clone(),
            prompt,
            Duration::from_secs(profile.timeout_secs),
        )
        .with_options(GenerateOptions::new(0.7, 512));

        info!(member = %member, model = %profile.model, "Calling family member");
        let started = Instant::now();
        let record = match self.server.chat(&request).await {
            Ok(reply) => {
                InteractionRecord::success(member, reply.text, started.elapsed().as_secs_f64())
            }
            Err(e) => {
                warn!(member = %member, error = %e, "Family member call failed");
                InteractionRecord::failure(member, e.to_string(), started.elapsed().as_secs_f64())
            }
        };

        if let Err(e) = self.log.log(&record) {
            warn!(error = %e, "Failed to record interaction");
        }
        record
    }

    /// Test every member in turn, pausing between calls
    pub async fn health_check(&self) -> Vec<InteractionRecord> {
        let mut results = Vec::with_capacity(Member::ALL.len());
        for (i, member) in Member::ALL.into_iter().enumerate() {
            if i > 0 && !self.health_pause.is_zero() {
                tokio::time::sleep(self.health_pause).await;
            }
            results.push(self.test_member(member, None).await);
        }
        results
    }

    /// Nyala analyses, Deon grades Nyala, Claudae reviews both.
    ///
    /// Each step runs only if every earlier step succeeded.
    pub async fn coordinate_decision(&self, market: &MarketSnapshot) -> FamilyDecision {
        let mut decision = FamilyDecision::default();

        let nyala = self
            .test_member(Member::Nyala, Some(&prompts::nyala_analysis(market)))
            .await;
        let nyala_ok = nyala.is_success();
        decision.steps.push(nyala);
        if !nyala_ok {
            return decision;
        }

        let deon = self
            .test_member(
                Member::Deon,
                Some(&prompts::deon_risk_review(decision.steps[0].text())),
            )
            .await;
        let deon_ok = deon.is_success();
        decision.steps.push(deon);
        if !deon_ok {
            return decision;
        }

        let review = prompts::claudae_oversight(decision.steps[0].text(), decision.steps[1].text());
        let claudae = self.test_member(Member::Claudae, Some(&review)).await;
        decision.steps.push(claudae);
        decision
    }

    /// Fast parallel BUY/SELL/HOLD plus risk level
    pub async fn quick_decision(&self, market: &MarketSnapshot) -> BTreeMap<Member, QuickAnswer> {
        quick_decision(
            Arc::clone(&self.server),
            &self.roster,
            market,
            self.quick_deadline,
        )
        .await
    }

    /// Load every member's primary model and keep it resident
    pub async fn preload(&self) -> BTreeMap<Member, bool> {
        let mut loaded = BTreeMap::new();
        for (member, profile) in self.roster.iter() {
            let request = ModelRequest::new(
                profile.model.clone(),
                "ready",
                Duration::from_secs(profile.timeout_secs),
            )
            .with_options(GenerateOptions::new(0.1, 1))
            .with_keep_alive(PRELOAD_KEEP_ALIVE);

            let ok = match self.server.chat(&request).await {
                Ok(_) => {
                    info!(member = %member, model = %profile.model, "Model preloaded");
                    true
                }
                Err(e) => {
                    warn!(member = %member, model = %profile.model, error = %e, "Preload failed");
                    false
                }
            };
            loaded.insert(member, ok);
        }
        loaded
    }

    /// The canned guardian prompt used by `ask` when no prompt is given
    pub fn guardian_prompt() -> &'static str {
        prompts::guardian_status()
    }
}
