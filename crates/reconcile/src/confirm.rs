//! Interactive confirmation state machine

use crate::context::{KeySource, Keystroke, Reporter};
use crate::error::RunError;
use crate::types::Group;

/// Approval mode carried across the groups of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationMode {
    /// Ask the operator for every group with removals
    #[default]
    AskEveryTime,
    /// Apply every remaining group without asking
    AutoApprove,
    /// Skip every remaining group without asking
    AutoDeny,
}

impl ConfirmationMode {
    /// Whether the operator still gets asked
    pub fn prompts(self) -> bool {
        matches!(self, Self::AskEveryTime)
    }

    /// Fixed decision of a durable mode
    pub fn durable_decision(self) -> Option<Decision> {
        match self {
            Self::AskEveryTime => None,
            Self::AutoApprove => Some(Decision::Apply),
            Self::AutoDeny => Some(Decision::Skip),
        }
    }
}

/// What to do with the current group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Skip,
}

/// A valid operator answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// `y`: apply this group
    YesOnce,
    /// `n`: skip this group
    NoOnce,
    /// `a`: apply this and every following group
    YesToAll,
    /// `q`: skip this and every following group
    NoToAll,
}

impl Response {
    /// Key hint shown with the prompt
    pub const KEYS: &'static str = "[y]es / [n]o / [a]ll / [q]uit";

    /// Parse a key press; anything outside `y`, `n`, `a`, `q` is rejected
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'y' => Some(Self::YesOnce),
            'n' => Some(Self::NoOnce),
            'a' => Some(Self::YesToAll),
            'q' => Some(Self::NoToAll),
            _ => None,
        }
    }

    /// Decision and next mode for this answer
    pub fn transition(self) -> (Decision, ConfirmationMode) {
        match self {
            Self::YesOnce => (Decision::Apply, ConfirmationMode::AskEveryTime),
            Self::NoOnce => (Decision::Skip, ConfirmationMode::AskEveryTime),
            Self::YesToAll => (Decision::Apply, ConfirmationMode::AutoApprove),
            Self::NoToAll => (Decision::Skip, ConfirmationMode::AutoDeny),
        }
    }
}

/// Holds the run's confirmation mode
///
/// Durable modes are final: once left, `AskEveryTime` never comes back.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationController {
    mode: ConfirmationMode,
}

impl ConfirmationController {
    /// Start a run asking every time
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn mode(&self) -> ConfirmationMode {
        self.mode
    }

    /// Apply an answer, returning the decision for the current group
    pub fn apply_response(&mut self, response: Response) -> Decision {
        let (decision, next) = response.transition();
        if self.mode.prompts() {
            self.mode = next;
        }
        decision
    }

    /// Decide for `group`, prompting only while in `AskEveryTime`
    ///
    /// Invalid keys are reported and the operator is asked again. A cancel
    /// keystroke ends the whole run.
    pub fn decide<K, R>(
        &mut self,
        group: &Group,
        keys: &mut K,
        reporter: &mut R,
    ) -> Result<Decision, RunError>
    where
        K: KeySource + ?Sized,
        R: Reporter + ?Sized,
    {
        if let Some(decision) = self.mode.durable_decision() {
            return Ok(decision);
        }

        reporter.on_prompt(group);
        loop {
            match keys.read_key()? {
                Keystroke::Cancel => return Err(RunError::Cancelled),
                Keystroke::Char(key) => match Response::from_key(key) {
                    Some(response) => return Ok(self.apply_response(response)),
                    None => reporter.on_invalid_key(key),
                },
            }
        }
    }
}
