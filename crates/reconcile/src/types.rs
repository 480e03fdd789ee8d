//! Core types for group membership reconciliation

use std::collections::HashMap;
use std::collections::HashSet;

/// Member value written to a group that would otherwise be left empty.
///
/// Groups of the `groupOfNames` family require at least one `member` value,
/// so this identity is added before the last real members are deleted. It is
/// always part of every [`PrincipalSet`], which keeps it out of every removal.
pub const PLACEHOLDER_MEMBER: &str = "cn=nobody";

/// Fold an identity for comparison.
pub fn fold_identity(identity: &str) -> String {
    identity.to_lowercase()
}

/// Search scope for a directory query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the base entry
    Base,
    /// Direct children of the base entry
    OneLevel,
    /// The base entry and everything below it
    Subtree,
}

/// A record returned by a directory search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Distinguished name of the record
    pub dn: String,
    /// Attribute values keyed by attribute name as returned by the server
    pub attrs: HashMap<String, Vec<String>>,
}

impl Entry {
    /// Create an entry with no attributes
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Builder-style attribute setter, mostly useful in tests
    pub fn with_attr<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attrs
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute, matching the name case-insensitively
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of an attribute, if any
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

/// Attribute names used to read a group record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAttributes {
    /// Multi-valued member attribute (`member`, `uniqueMember`, ...)
    pub member: String,
    /// Display label (`cn`)
    pub label: String,
    /// Free-text description
    pub description: String,
}

impl Default for GroupAttributes {
    fn default() -> Self {
        Self {
            member: "member".to_string(),
            label: "cn".to_string(),
            description: "description".to_string(),
        }
    }
}

impl GroupAttributes {
    /// Attribute projection for the group search
    pub fn projection(&self) -> Vec<&str> {
        vec![
            self.label.as_str(),
            self.description.as_str(),
            self.member.as_str(),
        ]
    }
}

/// A membership-holding directory record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    /// Distinguished name of the group
    pub dn: String,
    /// Display label
    pub label: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Declared member identities in original casing
    pub members: Vec<String>,
}

impl Group {
    /// Build a group from a search entry
    pub fn from_entry(entry: &Entry, attrs: &GroupAttributes) -> Self {
        Self {
            dn: entry.dn.clone(),
            label: entry.first(&attrs.label).map(str::to_string),
            description: entry.first(&attrs.description).map(str::to_string),
            members: entry.values(&attrs.member).to_vec(),
        }
    }
}

/// The set of identities known to exist
///
/// Identities are stored case-folded. The placeholder member is always
/// present, including in a set built from nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalSet {
    identities: HashSet<String>,
}

impl Default for PrincipalSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalSet {
    /// A set holding only the placeholder member
    pub fn new() -> Self {
        let mut identities = HashSet::new();
        identities.insert(fold_identity(PLACEHOLDER_MEMBER));
        Self { identities }
    }

    /// Build a set from identity strings
    pub fn from_identities<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for identity in identities {
            set.insert(identity.as_ref());
        }
        set
    }

    /// Add an identity
    pub fn insert(&mut self, identity: &str) {
        self.identities.insert(fold_identity(identity));
    }

    /// Whether the identity is a known principal, ignoring case
    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(&fold_identity(identity))
    }

    /// Number of identities, placeholder included
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Never true; the placeholder is always present
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Whether the set holds nothing but the placeholder
    pub fn is_placeholder_only(&self) -> bool {
        self.identities.len() == 1
    }
}

/// A single change to a multi-valued attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    /// Add values to the attribute
    Add { attribute: String, values: Vec<String> },
    /// Delete values from the attribute
    Delete { attribute: String, values: Vec<String> },
}

impl AttributeChange {
    /// Short verb for diagnostics
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
        }
    }

    /// Values carried by the change
    pub fn values(&self) -> &[String] {
        match self {
            Self::Add { values, .. } | Self::Delete { values, .. } => values,
        }
    }
}

/// Result of a modify request, as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyOutcome {
    /// LDAP result code, 0 on success
    pub code: u32,
    /// Human-readable description
    pub description: String,
}

impl ModifyOutcome {
    /// Result code used when the request never got a server answer
    pub const LOCAL_ERROR: u32 = 82;

    /// A successful outcome
    pub fn success() -> Self {
        Self {
            code: 0,
            description: "success".to_string(),
        }
    }

    /// A failed outcome
    pub fn failure(code: u32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// Whether the directory accepted the change
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Outcome of processing one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every member is a known principal
    NoActionNeeded,
    /// Stale members found, operator declined
    Skipped,
    /// Stale members found, dry run only
    WouldApply,
    /// All modifications accepted
    Applied,
    /// At least one modification was rejected
    AppliedWithErrors,
}

/// Options shared by every group in a run
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Report what would change without prompting or writing
    pub dry_run: bool,
    /// Attribute names used to read and write groups
    pub attributes: GroupAttributes,
}

/// Aggregate of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub no_action: usize,
    pub skipped: usize,
    pub would_apply: usize,
    pub applied: usize,
    pub applied_with_errors: usize,
    /// Member values the directory accepted for deletion
    pub members_removed: usize,
    /// Whether the principal set fell back to the placeholder only
    pub principals_degraded: bool,
}

impl RunSummary {
    /// Number of groups examined
    pub fn total(&self) -> usize {
        self.no_action + self.skipped + self.would_apply + self.applied + self.applied_with_errors
    }

    /// Whether every attempted write was accepted
    pub fn is_success(&self) -> bool {
        self.applied_with_errors == 0
    }

    /// Record the outcome of one group
    pub fn add_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::NoActionNeeded => self.no_action += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::WouldApply => self.would_apply += 1,
            Outcome::Applied => self.applied += 1,
            Outcome::AppliedWithErrors => self.applied_with_errors += 1,
        }
    }
}
