//! Built-in document drafting workflow
//!
//! Classifies a drafting request, has the user confirm (or pick) the document
//! type, collects the document fields as free text, checks them against the
//! blocked-term policy, and writes a Markdown draft.

use super::{Workflow, WorkflowError};
use crate::protocol::{Failure, Interrupt, ResolvedReply, TaskHandle, WorkflowOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Label of the selection entry that abandons the task
const EXIT_LABEL: &str = "Exit";

/// Detail prompts issued before drafting with whatever was provided
const MAX_DETAIL_ROUNDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    SalesVisitReport,
    BriefingRequest,
    BriefingResultReport,
}

impl DocType {
    /// Selection order shown to the user
    pub const ALL: [DocType; 3] = [
        DocType::SalesVisitReport,
        DocType::BriefingRequest,
        DocType::BriefingResultReport,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DocType::SalesVisitReport => "Sales visit report",
            DocType::BriefingRequest => "Product briefing request",
            DocType::BriefingResultReport => "Product briefing result report",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            DocType::SalesVisitReport => "sales-visit-report",
            DocType::BriefingRequest => "briefing-request",
            DocType::BriefingResultReport => "briefing-result-report",
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            DocType::SalesVisitReport => &["client", "visit date", "attendees", "discussion"],
            DocType::BriefingRequest => &["product", "venue", "date", "expected attendees"],
            DocType::BriefingResultReport => {
                &["product", "venue", "date", "actual attendees", "summary"]
            }
        }
    }

    /// Keyword classification; `None` sends the user to manual selection
    pub fn classify(request: &str) -> Option<Self> {
        let text = request.to_lowercase();
        let briefing = ["briefing", "product presentation", "seminar"]
            .iter()
            .any(|keyword| text.contains(keyword));

        if briefing {
            if text.contains("result") || text.contains("outcome") {
                Some(DocType::BriefingResultReport)
            } else {
                Some(DocType::BriefingRequest)
            }
        } else if text.contains("visit") {
            Some(DocType::SalesVisitReport)
        } else {
            None
        }
    }

    fn from_choice(index: u32) -> Option<Self> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        Self::ALL.get(position).copied()
    }
}

/// Terms a draft must not contain
#[derive(Debug, Clone, Default)]
pub struct PolicyRules {
    blocked_terms: Vec<String>,
}

impl PolicyRules {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked_terms = terms
            .into_iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { blocked_terms }
    }

    /// Blocked terms found in `text`, case-insensitively
    pub fn violations(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.blocked_terms
            .iter()
            .filter(|term| text.contains(term.as_str()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    ConfirmType(DocType),
    SelectType,
    CollectDetails {
        doc_type: DocType,
        fields: Map<String, Value>,
        round: u32,
    },
}

impl Stage {
    fn interrupt(&self) -> Interrupt {
        match self {
            Stage::ConfirmType(doc_type) => Interrupt::confirmation(format!(
                "Classified as \"{}\". Is this correct?",
                doc_type.label()
            )),
            Stage::SelectType => Interrupt::choice(
                "Which document should be drafted?",
                DocType::ALL
                    .iter()
                    .map(|doc_type| doc_type.label())
                    .chain([EXIT_LABEL]),
            ),
            Stage::CollectDetails {
                doc_type, fields, ..
            } => {
                let missing = missing_fields(*doc_type, fields);
                if fields.is_empty() {
                    Interrupt::free_text(format!(
                        "Enter {} details, one \"field: value\" per line ({})",
                        doc_type.label().to_lowercase(),
                        missing.join(", ")
                    ))
                } else {
                    Interrupt::free_text(format!("Still missing: {}", missing.join(", ")))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Checkpoint {
    session_id: String,
    request: String,
    stage: Stage,
    created_at: DateTime<Utc>,
}

/// Deterministic drafting workflow with in-memory checkpoints
pub struct DocumentWorkflow {
    output_dir: PathBuf,
    policy: PolicyRules,
    checkpoints: DashMap<String, Checkpoint>,
}

impl DocumentWorkflow {
    pub fn new(output_dir: impl Into<PathBuf>, policy: PolicyRules) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy,
            checkpoints: DashMap::new(),
        }
    }

    /// Number of executions waiting on a reply
    pub fn suspended_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Drop checkpoints older than `max_age`, returning how many were dropped.
    /// Resuming a dropped task reports [`WorkflowError::UnknownTask`].
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;
        let before = self.checkpoints.len();
        self.checkpoints
            .retain(|_, checkpoint| checkpoint.created_at > cutoff);
        before.saturating_sub(self.checkpoints.len())
    }

    fn suspend(
        &self,
        session_id: &str,
        request: &str,
        stage: Stage,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let task_id = Uuid::new_v4().to_string();
        let handle = TaskHandle::new(task_id.clone(), stage.interrupt())
            .map_err(|e| WorkflowError::Interrupted(e.to_string()))?;

        tracing::debug!(
            session_id = %session_id,
            task_id = %task_id,
            kind = %handle.kind(),
            "Document workflow suspended"
        );
        self.checkpoints.insert(
            task_id,
            Checkpoint {
                session_id: session_id.to_string(),
                request: request.to_string(),
                stage,
                created_at: Utc::now(),
            },
        );
        Ok(WorkflowOutcome::Suspended(handle))
    }

    async fn step(
        &self,
        checkpoint: &Checkpoint,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let session_id = checkpoint.session_id.as_str();
        let request = checkpoint.request.as_str();

        match (&checkpoint.stage, reply) {
            (Stage::ConfirmType(doc_type), ResolvedReply::Confirmation { confirmed: true }) => {
                self.suspend(session_id, request, collect(*doc_type))
            }
            (Stage::ConfirmType(_), ResolvedReply::Confirmation { confirmed: false }) => {
                self.suspend(session_id, request, Stage::SelectType)
            }
            (Stage::SelectType, ResolvedReply::Choice { index, value }) => {
                match DocType::from_choice(*index) {
                    Some(doc_type) => self.suspend(session_id, request, collect(doc_type)),
                    None if value == EXIT_LABEL => Ok(WorkflowOutcome::Failed(
                        Failure::new("Document drafting cancelled").with_code("cancelled"),
                    )),
                    None => Err(WorkflowError::Interrupted(format!(
                        "no document type for choice {index}"
                    ))),
                }
            }
            (
                Stage::CollectDetails {
                    doc_type,
                    fields,
                    round,
                },
                ResolvedReply::FreeText { text },
            ) => {
                let violations = self.policy.violations(text);
                if !violations.is_empty() {
                    tracing::info!(
                        session_id = %session_id,
                        violations = ?violations,
                        "Draft blocked by policy"
                    );
                    return Ok(WorkflowOutcome::Failed(
                        Failure::new(format!(
                            "Draft blocked by policy: {}",
                            violations.join(", ")
                        ))
                        .with_code("policy_violation"),
                    ));
                }

                let mut fields = fields.clone();
                merge_fields(&mut fields, text);
                if *round < MAX_DETAIL_ROUNDS && !missing_fields(*doc_type, &fields).is_empty() {
                    let stage = Stage::CollectDetails {
                        doc_type: *doc_type,
                        fields,
                        round: round + 1,
                    };
                    return self.suspend(session_id, request, stage);
                }
                self.draft(checkpoint, *doc_type, fields).await
            }
            (stage, reply) => Err(WorkflowError::Interrupted(format!(
                "reply {reply:?} does not fit stage {stage:?}"
            ))),
        }
    }

    async fn draft(
        &self,
        checkpoint: &Checkpoint,
        doc_type: DocType,
        fields: Map<String, Value>,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                WorkflowError::Interrupted(format!(
                    "cannot create {}: {e}",
                    self.output_dir.display()
                ))
            })?;

        let path = self
            .output_dir
            .join(format!("{}-{}.md", doc_type.slug(), Uuid::new_v4().simple()));
        let markdown = render_markdown(doc_type, &checkpoint.request, &fields);
        tokio::fs::write(&path, markdown)
            .await
            .map_err(|e| WorkflowError::Interrupted(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!(
            session_id = %checkpoint.session_id,
            path = %path.display(),
            doc_type = doc_type.label(),
            "Document drafted"
        );
        Ok(WorkflowOutcome::Completed(json!({
            "path": path.display().to_string(),
            "docType": doc_type.label(),
            "fields": fields,
        })))
    }
}

#[async_trait]
impl Workflow for DocumentWorkflow {
    async fn start(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let stage = match DocType::classify(message) {
            Some(doc_type) => Stage::ConfirmType(doc_type),
            None => Stage::SelectType,
        };
        self.suspend(session_id, message, stage)
    }

    async fn resume(
        &self,
        task_id: &str,
        reply: &ResolvedReply,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let checkpoint = self
            .checkpoints
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WorkflowError::UnknownTask(task_id.to_string()))?;

        // Only consume the checkpoint once the step produced an outcome
        let outcome = self.step(&checkpoint, reply).await?;
        self.checkpoints.remove(task_id);
        Ok(outcome)
    }
}

fn collect(doc_type: DocType) -> Stage {
    Stage::CollectDetails {
        doc_type,
        fields: Map::new(),
        round: 1,
    }
}

fn missing_fields(doc_type: DocType, fields: &Map<String, Value>) -> Vec<&'static str> {
    doc_type
        .required_fields()
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect()
}

/// Parse `field: value` lines into `fields`; other lines accumulate as notes
fn merge_fields(fields: &mut Map<String, Value>, text: &str) {
    let mut notes = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                fields.insert(
                    key.trim().to_lowercase(),
                    Value::String(value.trim().to_string()),
                );
            }
            _ => notes.push(line),
        }
    }

    if notes.is_empty() {
        return;
    }
    let notes = notes.join("\n");
    let merged = match fields.get("notes").and_then(Value::as_str) {
        Some(previous) => format!("{previous}\n{notes}"),
        None => notes,
    };
    fields.insert("notes".to_string(), Value::String(merged));
}

fn render_markdown(doc_type: DocType, request: &str, fields: &Map<String, Value>) -> String {
    let mut out = format!("# {}\n\n> {}\n\n", doc_type.label(), request.trim());
    for field in doc_type.required_fields() {
        let value = fields.get(*field).and_then(Value::as_str).unwrap_or("");
        let _ = writeln!(out, "- **{field}**: {value}");
    }
    for (key, value) in fields {
        if key == "notes" || doc_type.required_fields().contains(&key.as_str()) {
            continue;
        }
        let _ = writeln!(out, "- **{key}**: {}", value.as_str().unwrap_or_default());
    }
    if let Some(notes) = fields.get("notes").and_then(Value::as_str) {
        let _ = write!(out, "\n## Notes\n\n{notes}\n");
    }
    out
}
