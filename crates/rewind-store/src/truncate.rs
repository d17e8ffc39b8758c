//! Conversation rewind.
//!
//! Rewinding to a message forgets everything from the first dialog entry of
//! that message onward, across all four parts of the conversation:
//!
//! 1. The dialog timeline keeps only entries before the cut.
//! 2. Turn-scoped state keeps values written strictly before the cut that do
//!    not belong to the cutoff message; entries left empty are dropped.
//!    Session-scoped state is untouched.
//! 3. Breakpoints keep only markers created strictly before the cut.
//! 4. The summary counter follows the new dialog length.
//!
//! [`plan_truncation`] computes the result without touching storage;
//! [`TruncationEngine`] loads, plans, commits the plan as one
//! [`WriteBatch`], and only then asks the audit log to purge.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use rewind_core::time;
use rewind_core::{
    Breakpoint, ConversationId, DialogEntry, LogPurger, StateEntry, StateScope,
};

use crate::errors::Result;
use crate::repository::{ConversationRepository, WriteBatch};

/// Outcome of planning a rewind.
#[derive(Clone, Debug, PartialEq)]
pub struct TruncationPlan {
    /// Index of the first entry carrying the cutoff message ID.
    pub cut_index: usize,
    /// `created_time` of that entry at microsecond precision; the temporal
    /// boundary.
    pub ref_time: DateTime<Utc>,
    /// Distinct non-empty message IDs removed, in first-occurrence order.
    pub removed_ids: Vec<String>,
    /// Surviving dialog prefix.
    pub dialogs: Vec<DialogEntry>,
    /// Surviving state.
    pub state: Vec<StateEntry>,
    /// Surviving breakpoints.
    pub breakpoints: Vec<Breakpoint>,
}

/// Plan a rewind to `cutoff`. Returns `None` when no dialog entry carries
/// the cutoff message ID.
pub fn plan_truncation(
    dialogs: &[DialogEntry],
    state: &[StateEntry],
    breakpoints: &[Breakpoint],
    cutoff: &str,
) -> Option<TruncationPlan> {
    let cut_index = dialogs.iter().position(|d| d.message_id == cutoff)?;
    let ref_time = time::normalize(dialogs[cut_index].created_time);

    let mut seen = HashSet::new();
    let removed_ids = dialogs[cut_index..]
        .iter()
        .map(|d| d.message_id.as_str())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_owned)
        .collect();

    Some(TruncationPlan {
        cut_index,
        ref_time,
        removed_ids,
        dialogs: dialogs[..cut_index].to_vec(),
        state: surviving_state(state, cutoff, ref_time),
        breakpoints: breakpoints
            .iter()
            .filter(|b| time::normalize(b.created_time) < ref_time)
            .cloned()
            .collect(),
    })
}

fn surviving_state(state: &[StateEntry], cutoff: &str, ref_time: DateTime<Utc>) -> Vec<StateEntry> {
    state
        .iter()
        .filter_map(|entry| match entry.scope {
            StateScope::Session => Some(entry.clone()),
            StateScope::Turn => {
                let values: Vec<_> = entry
                    .values
                    .iter()
                    .filter(|v| {
                        v.message_id.as_deref() != Some(cutoff)
                            && time::normalize(v.update_time) < ref_time
                    })
                    .cloned()
                    .collect();
                (!values.is_empty()).then(|| StateEntry {
                    values,
                    ..entry.clone()
                })
            }
        })
        .collect()
}

/// Applies rewinds through a repository.
#[derive(Clone)]
pub struct TruncationEngine {
    repo: Arc<dyn ConversationRepository>,
    purger: Option<Arc<dyn LogPurger>>,
}

impl TruncationEngine {
    /// Engine without an audit log; `clean_logs` requests are ignored.
    pub fn new(repo: Arc<dyn ConversationRepository>) -> Self {
        Self { repo, purger: None }
    }

    /// Attach the audit log collaborator.
    #[must_use]
    pub fn with_purger(mut self, purger: Arc<dyn LogPurger>) -> Self {
        self.purger = Some(purger);
        self
    }

    /// Rewind `conversation_id` to just before `cutoff`.
    ///
    /// Returns the removed message IDs; empty when the cutoff is not in the
    /// timeline, in which case nothing is written. With `clean_logs`, audit
    /// logs from the boundary on are purged after the rewind has been
    /// committed. Purge failures are logged and do not fail the rewind.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub fn truncate(
        &self,
        conversation_id: &ConversationId,
        cutoff: &str,
        clean_logs: bool,
    ) -> Result<Vec<String>> {
        let dialogs = self.repo.load_dialogs(conversation_id)?;
        if dialogs.is_empty() {
            debug!("empty timeline, nothing to truncate");
            return Ok(Vec::new());
        }
        if !dialogs.iter().any(|d| d.message_id == cutoff) {
            debug!("cutoff not in timeline");
            return Ok(Vec::new());
        }

        let state = self.repo.load_state(conversation_id)?;
        let breakpoints = self.repo.load_breakpoints(conversation_id)?;
        let Some(plan) = plan_truncation(&dialogs, &state, &breakpoints, cutoff) else {
            return Ok(Vec::new());
        };

        let mut batch = WriteBatch::new(conversation_id.clone())
            .with_state(plan.state)
            .with_breakpoints(plan.breakpoints)
            .replace_dialogs(plan.dialogs);
        if let Some(mut summary) = self.repo.load_summary(conversation_id)? {
            summary.set_dialog_count(plan.cut_index);
            batch = batch.with_summary(summary);
        } else {
            warn!("timeline has no summary; dialog count not updated");
        }
        self.repo.apply(&batch)?;

        info!(
            cut_index = plan.cut_index,
            removed = plan.removed_ids.len(),
            "conversation truncated"
        );

        if clean_logs {
            self.purge_logs(conversation_id, plan.ref_time);
        }
        Ok(plan.removed_ids)
    }

    fn purge_logs(&self, conversation_id: &ConversationId, since: DateTime<Utc>) {
        let Some(purger) = &self.purger else {
            debug!("log cleaning requested but no audit log attached");
            return;
        };
        match purger.purge_logs_since(conversation_id, since) {
            Ok(purged) => debug!(purged, "audit logs purged"),
            Err(e) => warn!(error = %e, "audit log purge failed, rewind kept"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rewind_core::{Role, StateValue};

    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn timeline(ids: &[&str]) -> Vec<DialogEntry> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let secs = i64::try_from(i).unwrap() * 10;
                DialogEntry::new(Role::User, "a1", *id, format!("entry {i}")).at(t(secs))
            })
            .collect()
    }

    #[test]
    fn cut_at_first_occurrence() {
        let dialogs = timeline(&["m1", "m1", "m2", "m3", "m4"]);
        let plan = plan_truncation(&dialogs, &[], &[], "m2").unwrap();
        assert_eq!(plan.cut_index, 2);
        assert_eq!(plan.ref_time, t(20));
        assert_eq!(plan.dialogs, dialogs[..2].to_vec());
        assert_eq!(plan.removed_ids, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn boundary_compares_at_microsecond_precision() {
        let mut dialogs = timeline(&["m1", "m2"]);
        dialogs[1].created_time = t(10) + Duration::nanoseconds(900);
        let mut early = StateValue::text("A", "agent").for_message("m1");
        early.update_time = t(10) + Duration::nanoseconds(100);
        let mut marker = Breakpoint::new(t(0));
        marker.created_time = t(10) + Duration::nanoseconds(100);
        let state = vec![StateEntry::turn("topic").with_value(early)];

        let plan = plan_truncation(&dialogs, &state, &[marker], "m2").unwrap();

        assert_eq!(plan.ref_time, t(10));
        assert!(plan.state.is_empty());
        assert!(plan.breakpoints.is_empty());
    }

    #[test]
    fn removed_ids_distinct_and_non_empty() {
        let dialogs = timeline(&["m1", "m2", "", "m3", "m2", "m3"]);
        let plan = plan_truncation(&dialogs, &[], &[], "m2").unwrap();
        assert_eq!(plan.removed_ids, vec!["m2", "m3"]);
    }

    #[test]
    fn missing_cutoff_has_no_plan() {
        let dialogs = timeline(&["m1", "m2"]);
        assert!(plan_truncation(&dialogs, &[], &[], "m9").is_none());
        assert!(plan_truncation(&[], &[], &[], "m1").is_none());
    }

    #[test]
    fn cut_at_head_empties_timeline() {
        let dialogs = timeline(&["m1", "m2"]);
        let plan = plan_truncation(&dialogs, &[], &[], "m1").unwrap();
        assert!(plan.dialogs.is_empty());
        assert_eq!(plan.removed_ids, vec!["m1", "m2"]);
    }

    #[test]
    fn turn_state_filtered_by_message_and_time() {
        let dialogs = timeline(&["m1", "m2", "m3"]);
        let state = vec![
            StateEntry::turn("topic")
                .with_value(StateValue::text("A", "agent").for_message("m1").at(t(0)))
                .with_value(StateValue::text("B", "agent").for_message("m2").at(t(10))),
            // Written before the boundary but tagged with the cutoff turn.
            StateEntry::turn("draft")
                .with_value(StateValue::text("x", "agent").for_message("m2").at(t(5))),
            // Untagged, after the boundary.
            StateEntry::turn("mood")
                .with_value(StateValue::text("calm", "agent").at(t(0)))
                .with_value(StateValue::text("tense", "agent").at(t(15))),
        ];
        let plan = plan_truncation(&dialogs, &state, &[], "m2").unwrap();

        assert_eq!(plan.state.len(), 2);
        assert_eq!(plan.state[0].key, "topic");
        assert_eq!(plan.state[0].values.len(), 1);
        assert_eq!(plan.state[0].values[0].data, "A");
        assert_eq!(plan.state[1].key, "mood");
        assert_eq!(plan.state[1].values.len(), 1);
        assert_eq!(plan.state[1].values[0].data, "calm");
    }

    #[test]
    fn value_at_boundary_instant_is_dropped() {
        let dialogs = timeline(&["m1", "m2"]);
        let state = vec![
            StateEntry::turn("k").with_value(StateValue::text("v", "agent").for_message("m1").at(t(10))),
        ];
        let plan = plan_truncation(&dialogs, &state, &[], "m2").unwrap();
        assert!(plan.state.is_empty());
    }

    #[test]
    fn session_state_untouched() {
        let dialogs = timeline(&["m1", "m2"]);
        let locale = StateEntry::session("locale")
            .with_value(StateValue::text("en-US", "user").for_message("m2").at(t(30)));
        let plan = plan_truncation(&dialogs, std::slice::from_ref(&locale), &[], "m2").unwrap();
        assert_eq!(plan.state, vec![locale]);
    }

    #[test]
    fn breakpoints_strictly_before_boundary() {
        let dialogs = timeline(&["m1", "m2", "m3"]);
        let breakpoints = vec![
            Breakpoint::new(t(0)).created_at(t(5)),
            Breakpoint::new(t(0)).created_at(t(20)),
            Breakpoint::new(t(0)).created_at(t(25)),
        ];
        let plan = plan_truncation(&dialogs, &[], &breakpoints, "m3").unwrap();
        assert_eq!(plan.breakpoints, breakpoints[..1].to_vec());
    }
}
