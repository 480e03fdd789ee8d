//! In-memory fakes shared by the unit tests

use crate::confirm::{ConfirmationMode, Decision};
use crate::context::{KeySource, Keystroke, Reporter};
use crate::diff::MembershipPartition;
use crate::directory::Directory;
use crate::error::{AuthenticationError, ConnectionError, SearchError};
use crate::types::{AttributeChange, Entry, Group, ModifyOutcome, Outcome, RunSummary, Scope};
use std::collections::VecDeque;

/// Keys fed from a fixed script
pub struct ScriptedKeys {
    keys: VecDeque<Keystroke>,
}

impl ScriptedKeys {
    pub fn new(script: &str) -> Self {
        Self {
            keys: script.chars().map(Keystroke::Char).collect(),
        }
    }

    pub fn then_cancel(mut self) -> Self {
        self.keys.push_back(Keystroke::Cancel);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> std::io::Result<Keystroke> {
        self.keys
            .pop_front()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "script ended"))
    }
}

/// Reporter that records what it was told
#[derive(Default)]
pub struct RecordingReporter {
    pub prompts: usize,
    pub invalid_keys: Vec<char>,
    pub clean: Vec<String>,
    pub stale: Vec<(String, Vec<String>)>,
    pub decisions: Vec<(String, Decision, ConfirmationMode)>,
    pub modifies: Vec<(String, &'static str, u32)>,
    pub outcomes: Vec<(String, Outcome)>,
    pub principal_failures: Vec<bool>,
    pub group_search_failed: bool,
    pub summary: Option<RunSummary>,
}

impl Reporter for RecordingReporter {
    fn on_principal_search_failed(&mut self, _error: &SearchError, degraded: bool) {
        self.principal_failures.push(degraded);
    }

    fn on_group_search_failed(&mut self, _error: &SearchError) {
        self.group_search_failed = true;
    }

    fn on_group_clean(&mut self, group: &Group, _partition: &MembershipPartition) {
        self.clean.push(group.dn.clone());
    }

    fn on_group_stale(&mut self, group: &Group, partition: &MembershipPartition) {
        self.stale.push((group.dn.clone(), partition.remove.clone()));
    }

    fn on_prompt(&mut self, _group: &Group) {
        self.prompts += 1;
    }

    fn on_invalid_key(&mut self, key: char) {
        self.invalid_keys.push(key);
    }

    fn on_decision(&mut self, group: &Group, decision: Decision, mode: ConfirmationMode) {
        self.decisions.push((group.dn.clone(), decision, mode));
    }

    fn on_modify(&mut self, group: &Group, change: &AttributeChange, outcome: &ModifyOutcome) {
        self.modifies
            .push((group.dn.clone(), change.verb(), outcome.code));
    }

    fn on_group_done(&mut self, group: &Group, outcome: Outcome) {
        self.outcomes.push((group.dn.clone(), outcome));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}

/// A recorded modify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyCall {
    pub dn: String,
    pub changes: Vec<AttributeChange>,
}

/// A recorded search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub base: String,
    pub filter: String,
    pub scope: Scope,
    pub attributes: Vec<String>,
}

/// Directory backed by in-memory entries
///
/// Searches whose filter mentions `group` return the group entries, every
/// other search returns the principals.
#[derive(Default)]
pub struct FakeDirectory {
    pub principals: Vec<Entry>,
    pub groups: Vec<Entry>,
    pub connect_error: Option<fn() -> ConnectionError>,
    pub reject_bind: bool,
    pub fail_principal_search: bool,
    pub fail_group_search: bool,
    /// Result codes returned by successive modify calls; success once drained
    pub modify_codes: VecDeque<u32>,
    pub connected: bool,
    pub bound: bool,
    pub calls: Vec<ModifyCall>,
    pub searches: Vec<SearchCall>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principals(mut self, dns: &[&str]) -> Self {
        self.principals = dns.iter().map(|dn| Entry::new(*dn)).collect();
        self
    }

    pub fn with_group(mut self, dn: &str, members: &[&str]) -> Self {
        let label = dn.trim_start_matches("cn=").split(',').next().unwrap_or(dn);
        self.groups.push(
            Entry::new(dn)
                .with_attr("cn", [label])
                .with_attr("member", members.iter().copied()),
        );
        self
    }

    fn search_error(base: &str, filter: &str) -> SearchError {
        SearchError {
            base: base.to_string(),
            filter: filter.to_string(),
            message: "size limit exceeded".to_string(),
        }
    }
}

impl Directory for FakeDirectory {
    fn connect_and_secure(&mut self) -> Result<(), ConnectionError> {
        if let Some(make_error) = self.connect_error {
            return Err(make_error());
        }
        self.connected = true;
        Ok(())
    }

    fn bind(&mut self, identity: &str, _secret: &str) -> Result<(), AuthenticationError> {
        if self.reject_bind {
            return Err(AuthenticationError {
                identity: identity.to_string(),
                code: 49,
                message: "invalid credentials".to_string(),
            });
        }
        self.bound = true;
        Ok(())
    }

    fn search(
        &mut self,
        base: &str,
        filter: &str,
        scope: Scope,
        attributes: &[&str],
    ) -> Result<Vec<Entry>, SearchError> {
        self.searches.push(SearchCall {
            base: base.to_string(),
            filter: filter.to_string(),
            scope,
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
        });
        if filter.to_lowercase().contains("group") {
            if self.fail_group_search {
                return Err(Self::search_error(base, filter));
            }
            Ok(self.groups.clone())
        } else {
            if self.fail_principal_search {
                return Err(Self::search_error(base, filter));
            }
            Ok(self.principals.clone())
        }
    }

    fn modify(&mut self, identity: &str, changes: &[AttributeChange]) -> ModifyOutcome {
        self.calls.push(ModifyCall {
            dn: identity.to_string(),
            changes: changes.to_vec(),
        });
        match self.modify_codes.pop_front() {
            Some(0) | None => ModifyOutcome::success(),
            Some(code) => ModifyOutcome::failure(code, "rejected"),
        }
    }
}
