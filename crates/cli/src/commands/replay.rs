//! Scripted conversation replay against a local catalog file.

use std::fs;
use std::path::Path;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use watchfinder_core::audit::{AuditContext, InMemoryAuditSink};
use watchfinder_core::dialog::{DialogEngine, RecognizedTurn, ResponseDirective};
use watchfinder_core::search::InMemoryCatalog;
use watchfinder_core::selection::ReservationRecord;
use watchfinder_core::session::{ConversationId, ConversationPhase, ConversationSession};

use crate::commands::CommandResult;

pub const DEFAULT_ORIGIN: &str = "http://localhost:3978";

#[derive(Debug, Deserialize)]
pub struct ReplayScript {
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
    pub turns: Vec<RecognizedTurn>,
}

fn default_conversation_id() -> String {
    "replay".to_string()
}

#[derive(Debug, Serialize)]
pub struct ReplayStep {
    pub index: usize,
    pub intent: String,
    pub phase: ConversationPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub directives: Vec<ResponseDirective>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub command: &'static str,
    pub status: &'static str,
    pub conversation_id: String,
    pub catalog_entries: usize,
    pub steps: Vec<ReplayStep>,
    pub reservations: Vec<ReservationRecord>,
    pub audit_events: usize,
}

pub fn run(script_path: &Path, catalog_path: &Path, origin: &str) -> CommandResult {
    let script = match load_script(script_path) {
        Ok(script) => script,
        Err(error) => return CommandResult::failure("replay", "script", format!("{error:#}"), 2),
    };
    let catalog = match InMemoryCatalog::from_json_file(catalog_path) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("replay", "catalog", error.to_string(), 3),
    };
    let origin = match Url::parse(origin) {
        Ok(origin) => origin,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "origin",
                format!("invalid origin `{origin}`: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let report = runtime.block_on(replay(script, catalog, origin));
    CommandResult::report("replay", &report)
}

fn load_script(path: &Path) -> anyhow::Result<ReplayScript> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read script `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse script `{}`", path.display()))
}

pub async fn replay(script: ReplayScript, catalog: InMemoryCatalog, origin: Url) -> ReplayReport {
    let catalog_entries = catalog.len();
    let engine = DialogEngine::new(catalog, origin);
    let conversation_id = ConversationId(script.conversation_id);
    let mut session = ConversationSession::new(conversation_id.clone());
    let sink = InMemoryAuditSink::default();

    let mut steps = Vec::with_capacity(script.turns.len());
    let mut reservations = Vec::new();
    for (index, turn) in script.turns.iter().enumerate() {
        let audit = AuditContext::new(
            Some(conversation_id.clone()),
            format!("replay-{}", index + 1),
            "watchfinder-cli",
        );
        let step = match engine.handle_turn_with_audit(&mut session, turn, &sink, &audit).await {
            Ok(outcome) => {
                reservations.extend(outcome.reservation);
                ReplayStep {
                    index: index + 1,
                    intent: turn.intent.as_str().to_string(),
                    phase: session.phase(),
                    decision: outcome.decision.as_ref().map(|decision| decision.label()),
                    error: None,
                    directives: outcome.directives,
                }
            }
            Err(error) => ReplayStep {
                index: index + 1,
                intent: turn.intent.as_str().to_string(),
                phase: session.phase(),
                decision: None,
                error: Some(error.kind()),
                directives: vec![ResponseDirective::text(error.user_message())],
            },
        };
        steps.push(step);
    }

    ReplayReport {
        command: "replay",
        status: "ok",
        conversation_id: conversation_id.0,
        catalog_entries,
        steps,
        reservations,
        audit_events: sink.events().len(),
    }
}
