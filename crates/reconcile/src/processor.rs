//! Per-group cleanup - diff, confirm, converge
//!
//! Removal of the last real members is done in two writes: the placeholder
//! is added first, the stale members are deleted second. The member
//! attribute is therefore never empty, even if the run dies between the two
//! requests.

use crate::confirm::{ConfirmationController, Decision};
use crate::context::{KeySource, Reporter};
use crate::diff::{MembershipPartition, diff};
use crate::directory::Directory;
use crate::error::RunError;
use crate::types::{
    AttributeChange, Group, ModifyOutcome, Outcome, PLACEHOLDER_MEMBER, PrincipalSet,
    ProcessOptions,
};
use log::debug;

/// Result of one group, with what was actually deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub outcome: Outcome,
    pub partition: MembershipPartition,
    /// Number of member values the directory accepted for deletion
    pub removed: usize,
}

/// Processes groups one at a time against a shared session
pub struct GroupProcessor<'a, D: ?Sized, K: ?Sized, R: ?Sized> {
    directory: &'a mut D,
    keys: &'a mut K,
    reporter: &'a mut R,
    options: &'a ProcessOptions,
}

impl<'a, D, K, R> GroupProcessor<'a, D, K, R>
where
    D: Directory + ?Sized,
    K: KeySource + ?Sized,
    R: Reporter + ?Sized,
{
    pub fn new(
        directory: &'a mut D,
        keys: &'a mut K,
        reporter: &'a mut R,
        options: &'a ProcessOptions,
    ) -> Self {
        Self {
            directory,
            keys,
            reporter,
            options,
        }
    }

    /// Clean up one group
    ///
    /// The controller is consulted only when the group has stale members.
    /// Rejected writes are reported and folded into the outcome; only
    /// operator cancellation or unreadable input returns an error.
    pub fn process(
        &mut self,
        group: &Group,
        principals: &PrincipalSet,
        controller: &mut ConfirmationController,
    ) -> Result<GroupReport, RunError> {
        let partition = diff(&group.members, principals);

        if !partition.has_removals() {
            self.reporter.on_group_clean(group, &partition);
            return Ok(self.finish(group, Outcome::NoActionNeeded, partition, 0));
        }

        self.reporter.on_group_stale(group, &partition);

        if self.options.dry_run {
            return Ok(self.finish(group, Outcome::WouldApply, partition, 0));
        }

        let decision = controller.decide(group, &mut *self.keys, &mut *self.reporter)?;
        self.reporter.on_decision(group, decision, controller.mode());

        if decision == Decision::Skip {
            return Ok(self.finish(group, Outcome::Skipped, partition, 0));
        }

        let (outcome, removed) = self.apply(group, &partition);
        Ok(self.finish(group, outcome, partition, removed))
    }

    /// Write the cleanup for an approved group
    fn apply(&mut self, group: &Group, partition: &MembershipPartition) -> (Outcome, usize) {
        let options = self.options;
        let attribute = &options.attributes.member;

        if partition.empties_group() {
            let add = AttributeChange::Add {
                attribute: attribute.clone(),
                values: vec![PLACEHOLDER_MEMBER.to_string()],
            };
            if !self.write(group, add).is_success() {
                // Deleting now would leave the attribute empty
                debug!("Skipping delete on {}: placeholder was not added", group.dn);
                return (Outcome::AppliedWithErrors, 0);
            }
        }

        let delete = AttributeChange::Delete {
            attribute: attribute.clone(),
            values: partition.remove.clone(),
        };
        if self.write(group, delete).is_success() {
            (Outcome::Applied, partition.remove.len())
        } else {
            (Outcome::AppliedWithErrors, 0)
        }
    }

    fn write(&mut self, group: &Group, change: AttributeChange) -> ModifyOutcome {
        debug!(
            "{} {} value(s) on {}",
            change.verb(),
            change.values().len(),
            group.dn
        );
        let outcome = self
            .directory
            .modify(&group.dn, std::slice::from_ref(&change));
        self.reporter.on_modify(group, &change, &outcome);
        outcome
    }

    fn finish(
        &mut self,
        group: &Group,
        outcome: Outcome,
        partition: MembershipPartition,
        removed: usize,
    ) -> GroupReport {
        self.reporter.on_group_done(group, outcome);
        GroupReport {
            outcome,
            partition,
            removed,
        }
    }
}
