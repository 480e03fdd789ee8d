//! Operator-facing provider traits
//!
//! Keystrokes and diagnostics are handed to the core as values so a run can
//! be driven from a terminal or from a script in tests.

use crate::confirm::{ConfirmationMode, Decision};
use crate::diff::MembershipPartition;
use crate::error::SearchError;
use crate::types::{AttributeChange, Group, ModifyOutcome, Outcome, RunSummary};

/// One key read from the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// A printable character
    Char(char),
    /// The operator interrupted (Ctrl-C)
    Cancel,
}

/// Source of single, unbuffered key presses
pub trait KeySource {
    /// Block until the operator presses a key
    fn read_key(&mut self) -> std::io::Result<Keystroke>;
}

/// Receiver of run diagnostics
///
/// Every method has an empty default so implementations only override what
/// they display.
pub trait Reporter {
    /// The principal search returned `count` identities
    fn on_principals_loaded(&mut self, _count: usize) {}

    /// The principal search failed
    ///
    /// `degraded` is true when the run continues with only the placeholder
    /// as a known principal.
    fn on_principal_search_failed(&mut self, _error: &SearchError, _degraded: bool) {}

    /// The group search returned `count` groups
    fn on_groups_loaded(&mut self, _count: usize) {}

    /// The group search failed; no group will be processed
    fn on_group_search_failed(&mut self, _error: &SearchError) {}

    /// Every member of the group is a known principal
    fn on_group_clean(&mut self, _group: &Group, _partition: &MembershipPartition) {}

    /// The group has members that no longer exist
    fn on_group_stale(&mut self, _group: &Group, _partition: &MembershipPartition) {}

    /// The operator is about to be asked about the group
    fn on_prompt(&mut self, _group: &Group) {}

    /// The operator pressed a key that is not a valid answer
    fn on_invalid_key(&mut self, _key: char) {}

    /// A decision was made for the group
    fn on_decision(&mut self, _group: &Group, _decision: Decision, _mode: ConfirmationMode) {}

    /// A modify request returned
    fn on_modify(&mut self, _group: &Group, _change: &AttributeChange, _outcome: &ModifyOutcome) {}

    /// The group was fully processed
    fn on_group_done(&mut self, _group: &Group, _outcome: Outcome) {}

    /// The run completed
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Reporter that discards everything
pub struct NoReport;

impl Reporter for NoReport {}
