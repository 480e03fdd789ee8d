//! Directory capability consumed by the reconciliation core
//!
//! The trait abstracts the directory transport, allowing:
//! - An LDAP implementation in the binary
//! - In-memory fakes for testing

use crate::error::{AuthenticationError, ConnectionError, SearchError};
use crate::types::{AttributeChange, Entry, ModifyOutcome, Scope};

/// Session with a directory service
///
/// Calls are made strictly in sequence on one session.
pub trait Directory {
    /// Open the session and, if configured, upgrade it to an encrypted channel
    fn connect_and_secure(&mut self) -> Result<(), ConnectionError>;

    /// Authenticate the session with simple credentials
    fn bind(&mut self, identity: &str, secret: &str) -> Result<(), AuthenticationError>;

    /// Run a search and collect every matching record
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        scope: Scope,
        attributes: &[&str],
    ) -> Result<Vec<Entry>, SearchError>;

    /// Apply attribute changes to one record in a single request
    ///
    /// A rejected change is reported in the outcome, never as an error.
    fn modify(&mut self, identity: &str, changes: &[AttributeChange]) -> ModifyOutcome;
}
