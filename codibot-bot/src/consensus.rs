//! Crowdsourced consensus engine
//!
//! Decides, for each submitted code, how the stored record evolves:
//! create, confirm, decay, flip to the contested claim, or privileged
//! override. The decision itself is pure; `ConsensusEngine::submit`
//! applies it through the store.

use crate::classify::normalize_code;
use crate::store::CodeStore;
use codibot_common::config::CrowdConfig;
use codibot_common::db::{CodeRecord, VehicleKind};
use codibot_common::Result;
use tracing::{debug, info};

/// One submission from the feed dialogue
#[derive(Debug, Clone)]
pub struct Submission {
    pub vehicle_kind: VehicleKind,
    pub vehicle_name: String,
    pub raw_code: String,
    pub submitter_id: String,
    pub is_privileged: bool,
}

/// User-facing result of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No record existed; one was created with confirms = 1
    Created,
    /// Matching re-submission after the grace interval; confidence bumped
    Confirmed,
    /// Mismatch (or too-soon duplicate); confidence decayed
    Decayed,
    /// Decay hit the floor; record flipped to the latest contested claim
    Flipped,
    /// Privileged edit; record now persisted with the submitted content
    Overridden,
    /// Record is persisted and the submitter is not privileged; ignored
    Acknowledged,
    /// Submitted code does not match the ticketing-code format
    InvalidFormat,
}

/// Store mutation implied by a decision
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Insert(CodeRecord),
    Update(CodeRecord),
    None,
}

/// Compute the next record state for a submission.
///
/// Pure: takes the current record (if any) and the clock, returns the
/// outcome and the store mutation to apply. `code` must already be
/// normalized.
fn decide(
    code: &str,
    submission: &Submission,
    existing: Option<&CodeRecord>,
    now_ms: i64,
    grace_interval_ms: i64,
) -> (Outcome, Action) {
    let record = match existing {
        None => {
            let record = CodeRecord {
                code: code.to_string(),
                vehicle_kind: submission.vehicle_kind,
                vehicle_name: submission.vehicle_name.clone(),
                persist: submission.is_privileged,
                confirms: 1,
                submitted_by: submission.submitter_id.clone(),
                created_at: now_ms,
                updated_at: now_ms,
            };
            return (Outcome::Created, Action::Insert(record));
        }
        Some(record) => record,
    };

    if submission.is_privileged {
        // Privileged edits always win and promote the record to persisted
        let mut next = record.clone();
        next.vehicle_kind = submission.vehicle_kind;
        next.vehicle_name = submission.vehicle_name.clone();
        next.persist = true;
        next.updated_at = now_ms;
        return (Outcome::Overridden, Action::Update(next));
    }

    if record.persist {
        // Frozen against crowd edits; the user still gets a thank-you
        return (Outcome::Acknowledged, Action::None);
    }

    let content_matches = record.vehicle_kind == submission.vehicle_kind
        && record.vehicle_name.eq_ignore_ascii_case(&submission.vehicle_name);
    let past_grace = now_ms - record.updated_at >= grace_interval_ms;

    let mut next = record.clone();
    next.submitted_by = submission.submitter_id.clone();
    next.updated_at = now_ms;

    if content_matches && past_grace {
        next.confirms = record.confirms + 1;
        return (Outcome::Confirmed, Action::Update(next));
    }

    // Mismatch, or a matching re-submission inside the grace interval
    // (rapid duplicates decay rather than boost). When the decrement
    // reaches the floor, the record flips to the submitted claim.
    next.confirms = (record.confirms - 1).max(0);
    if next.confirms == 0 {
        next.vehicle_kind = submission.vehicle_kind;
        next.vehicle_name = submission.vehicle_name.clone();
        (Outcome::Flipped, Action::Update(next))
    } else {
        (Outcome::Decayed, Action::Update(next))
    }
}

/// Applies submissions to the code record store
#[derive(Clone)]
pub struct ConsensusEngine {
    store: CodeStore,
    grace_interval_ms: i64,
}

impl ConsensusEngine {
    pub fn new(store: CodeStore, config: &CrowdConfig) -> Self {
        Self {
            store,
            grace_interval_ms: config.grace_interval_ms,
        }
    }

    /// Process one submission and return its outcome.
    ///
    /// The read-then-write sequence is not transactional: two
    /// near-simultaneous submissions for the same code may lose one
    /// confidence step. Crowd confidence is approximate by design.
    pub async fn submit(&self, submission: Submission) -> Result<Outcome> {
        self.submit_at(submission, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Clock-injected variant of `submit`
    pub async fn submit_at(&self, submission: Submission, now_ms: i64) -> Result<Outcome> {
        let Some(code) = normalize_code(&submission.raw_code) else {
            debug!(
                "Rejected malformed code {:?} from {}",
                submission.raw_code, submission.submitter_id
            );
            return Ok(Outcome::InvalidFormat);
        };

        let existing = self.store.find(&code).await?;
        let (outcome, action) = decide(
            &code,
            &submission,
            existing.as_ref(),
            now_ms,
            self.grace_interval_ms,
        );

        match &action {
            Action::Insert(record) => self.store.insert(record).await?,
            Action::Update(record) => self.store.update(record).await?,
            Action::None => {}
        }

        info!(
            "Submission of {} for {} {:?} by {}: {:?}",
            code, submission.vehicle_kind, submission.vehicle_name, submission.submitter_id, outcome
        );
        Ok(outcome)
    }
}
