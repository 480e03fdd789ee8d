//! Membership diff - partition declared members against known principals

use crate::types::PrincipalSet;

/// Keep/remove split of a group's declared members
///
/// Both halves hold the member values in their original casing and in the
/// order the directory returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPartition {
    /// Members that are known principals
    pub keep: Vec<String>,
    /// Members that no longer exist
    pub remove: Vec<String>,
}

impl MembershipPartition {
    /// Whether anything needs to be removed
    pub fn has_removals(&self) -> bool {
        !self.remove.is_empty()
    }

    /// Whether removing all stale members would empty the group
    pub fn empties_group(&self) -> bool {
        self.keep.is_empty() && !self.remove.is_empty()
    }

    /// Total number of members
    pub fn total(&self) -> usize {
        self.keep.len() + self.remove.len()
    }
}

/// Split `members` into those present in `principals` and those that are not
///
/// Comparison ignores case. An empty member list yields an empty partition.
pub fn diff<S: AsRef<str>>(members: &[S], principals: &PrincipalSet) -> MembershipPartition {
    let (keep, remove): (Vec<String>, Vec<String>) = members
        .iter()
        .map(|m| m.as_ref().to_string())
        .partition(|m| principals.contains(m));

    MembershipPartition { keep, remove }
}
