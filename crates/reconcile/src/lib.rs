//! # Reconcile
//!
//! Removes references to principals that no longer exist from directory
//! groups, one group at a time, under operator control.
//!
//! ## Core Concepts
//!
//! - **PrincipalSet**: every identity known to exist, snapshot once per run
//! - **MembershipPartition**: a group's members split into keep and remove
//! - **ConfirmationController**: asks the operator, remembers "to all" answers
//! - **GroupProcessor**: diffs, confirms and writes one group
//! - **run**: connects, snapshots principals and walks every group
//!
//! A group is never left without members: when every member is stale the
//! [`PLACEHOLDER_MEMBER`] is added before the stale members are deleted.
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{run, ProcessOptions, RunSettings};
//!
//! let settings = RunSettings {
//!     bind_dn: "cn=admin,dc=example,dc=org".into(),
//!     bind_secret: secret,
//!     base_dn: "dc=example,dc=org".into(),
//!     principal_filter: "(objectClass=person)".into(),
//!     group_filter: "(objectClass=groupOfNames)".into(),
//!     strict_principals: false,
//!     process: ProcessOptions::default(),
//! };
//!
//! let summary = run(&mut directory, &mut keys, &mut reporter, &settings)?;
//! println!("{} members removed", summary.members_removed);
//! ```
//!
//! ## Provider Traits
//!
//! - [`Directory`]: connect, bind, search and modify
//! - [`KeySource`]: single unbuffered operator key presses
//! - [`Reporter`]: receives diagnostics for every step
//!
//! None of the core touches the network or the terminal directly.

pub mod confirm;
pub mod context;
pub mod diff;
pub mod directory;
pub mod error;
pub mod orchestrator;
pub mod processor;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use confirm::{ConfirmationController, ConfirmationMode, Decision, Response};
pub use context::{KeySource, Keystroke, NoReport, Reporter};
pub use diff::{MembershipPartition, diff};
pub use directory::Directory;
pub use error::{AuthenticationError, ConnectionError, RunError, SearchError};
pub use orchestrator::{RunSettings, run};
pub use processor::{GroupProcessor, GroupReport};
pub use types::{
    AttributeChange, Entry, Group, GroupAttributes, ModifyOutcome, Outcome, PLACEHOLDER_MEMBER,
    PrincipalSet, ProcessOptions, RunSummary, Scope, fold_identity,
};
