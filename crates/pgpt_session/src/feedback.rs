//! Per-document feedback lifecycle.
//!
//! An entry is created the first time the user rates a summary and moves
//! `none → submitting → success | error`. Every transition stamps the entry with
//! a fresh [`EntryId`], so deferred work (the success expiry) can tell whether
//! the entry it was scheduled for is still the current one.

use std::collections::BTreeMap;

use pgpt_core::FeedbackType;
use serde::Serialize;
use uuid::Uuid;

pub const REFINED_MESSAGE: &str = "Thank you! The summary has been refined based on your feedback.";
pub const FAILED_MESSAGE: &str = "Failed to submit feedback. Please try again.";

pub type EntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackState {
    None,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackStatus {
    pub state: FeedbackState,
    pub feedback_type: Option<FeedbackType>,
    pub message: Option<String>,
    #[serde(skip)]
    entry: EntryId,
}

impl FeedbackStatus {
    fn new(state: FeedbackState, feedback_type: FeedbackType, message: Option<String>) -> Self {
        Self {
            state,
            feedback_type: Some(feedback_type),
            message,
            entry: Uuid::new_v4(),
        }
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }
}

pub fn recorded_message(feedback_type: FeedbackType) -> String {
    format!("Thank you! Your \"{}\" feedback has been recorded.", feedback_type)
}

#[derive(Debug, Default)]
pub struct FeedbackTracker {
    entries: BTreeMap<String, FeedbackStatus>,
}

impl FeedbackTracker {
    pub fn get(&self, filename: &str) -> Option<&FeedbackStatus> {
        self.entries.get(filename)
    }

    pub fn state(&self, filename: &str) -> Option<FeedbackState> {
        self.entries.get(filename).map(|status| status.state)
    }

    pub fn is_submitting(&self, filename: &str) -> bool {
        self.state(filename) == Some(FeedbackState::Submitting)
    }

    /// Whether `entry` still identifies the live entry for `filename`.
    pub fn is_current(&self, filename: &str, entry: EntryId) -> bool {
        self.entries
            .get(filename)
            .is_some_and(|status| status.entry == entry)
    }

    /// The user picked a feedback type: the entry (re)starts in `none`.
    pub fn record_type(&mut self, filename: &str, feedback_type: FeedbackType) -> EntryId {
        self.put(filename, FeedbackStatus::new(FeedbackState::None, feedback_type, None))
    }

    /// `none → submitting`. Returns `None` if a submission is already in flight.
    pub fn begin(&mut self, filename: &str, feedback_type: FeedbackType) -> Option<EntryId> {
        if self.is_submitting(filename) {
            return None;
        }
        let status = FeedbackStatus::new(FeedbackState::Submitting, feedback_type, None);
        Some(self.put(filename, status))
    }

    pub fn succeed(
        &mut self,
        filename: &str,
        feedback_type: FeedbackType,
        refined: bool,
    ) -> EntryId {
        let message = if refined {
            REFINED_MESSAGE.to_string()
        } else {
            recorded_message(feedback_type)
        };
        self.put(
            filename,
            FeedbackStatus::new(FeedbackState::Success, feedback_type, Some(message)),
        )
    }

    pub fn fail(&mut self, filename: &str, feedback_type: FeedbackType) -> EntryId {
        let message = Some(FAILED_MESSAGE.to_string());
        self.put(
            filename,
            FeedbackStatus::new(FeedbackState::Error, feedback_type, message),
        )
    }

    /// Drops a success entry, but only the one that `entry` was issued for.
    pub fn expire(&mut self, filename: &str, entry: EntryId) -> bool {
        let expired = self
            .entries
            .get(filename)
            .is_some_and(|status| status.entry == entry && status.state == FeedbackState::Success);
        if expired {
            self.entries.remove(filename);
        }
        expired
    }

    pub fn remove(&mut self, filename: &str) -> Option<FeedbackStatus> {
        self.entries.remove(filename)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &BTreeMap<String, FeedbackStatus> {
        &self.entries
    }

    fn put(&mut self, filename: &str, status: FeedbackStatus) -> EntryId {
        let entry = status.entry;
        self.entries.insert(filename.to_string(), status);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_runs_none_submitting_success() {
        let mut tracker = FeedbackTracker::default();
        assert_eq!(tracker.state("a.pdf"), None);

        tracker.record_type("a.pdf", FeedbackType::Unclear);
        assert_eq!(tracker.state("a.pdf"), Some(FeedbackState::None));
        assert_eq!(tracker.get("a.pdf").unwrap().feedback_type, Some(FeedbackType::Unclear));

        tracker.begin("a.pdf", FeedbackType::Unclear).unwrap();
        assert!(tracker.is_submitting("a.pdf"));
        assert_eq!(tracker.begin("a.pdf", FeedbackType::Unclear), None);

        tracker.succeed("a.pdf", FeedbackType::Unclear, true);
        let status = tracker.get("a.pdf").unwrap();
        assert_eq!(status.state, FeedbackState::Success);
        assert_eq!(status.message.as_deref(), Some(REFINED_MESSAGE));
    }

    #[test]
    fn plain_success_quotes_the_feedback_type() {
        let mut tracker = FeedbackTracker::default();
        tracker.succeed("a.pdf", FeedbackType::Helpful, false);
        assert_eq!(
            tracker.get("a.pdf").unwrap().message.as_deref(),
            Some("Thank you! Your \"helpful\" feedback has been recorded.")
        );
    }

    #[test]
    fn expiry_only_hits_the_entry_it_was_issued_for() {
        let mut tracker = FeedbackTracker::default();
        let first = tracker.succeed("a.pdf", FeedbackType::Helpful, false);

        let second = tracker.succeed("a.pdf", FeedbackType::Helpful, false);
        assert!(!tracker.expire("a.pdf", first));
        assert!(tracker.get("a.pdf").is_some());

        assert!(tracker.expire("a.pdf", second));
        assert!(tracker.get("a.pdf").is_none());
    }

    #[test]
    fn errors_never_expire() {
        let mut tracker = FeedbackTracker::default();
        let entry = tracker.fail("a.pdf", FeedbackType::Inaccurate);
        assert!(!tracker.expire("a.pdf", entry));
        assert_eq!(tracker.get("a.pdf").unwrap().message.as_deref(), Some(FAILED_MESSAGE));
    }

    #[test]
    fn every_transition_issues_a_new_entry() {
        let mut tracker = FeedbackTracker::default();
        let none = tracker.record_type("a.pdf", FeedbackType::Helpful);
        let submitting = tracker.begin("a.pdf", FeedbackType::Helpful).unwrap();
        assert_ne!(none, submitting);
        assert!(!tracker.is_current("a.pdf", none));
        assert!(tracker.is_current("a.pdf", submitting));
        assert!(!tracker.is_current("b.pdf", submitting));
    }
}
