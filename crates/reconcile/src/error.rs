//! Error types for a reconciliation run.
//!
//! Only connection, authentication, operator cancellation and unusable
//! terminal input end a run early. Everything that goes wrong while a group is
//! being processed is reported and the run moves on.

use thiserror::Error;

/// Failure while opening or securing the directory session
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The socket could not be opened
    #[error("could not connect to {url}: {message}")]
    SocketOpen {
        /// Directory URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// StartTLS or the TLS handshake failed
    #[error("secure channel upgrade with {url} failed: {message}")]
    SecureUpgrade {
        /// Directory URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// Connection establishment exceeded the receive timeout
    #[error("connection to {url} timed out after {secs}s")]
    Timeout {
        /// Directory URL
        url: String,
        /// Configured timeout in seconds
        secs: u64,
    },
}

/// The bind was rejected
#[derive(Debug, Error)]
#[error("bind as {identity} failed (code {code}): {message}")]
pub struct AuthenticationError {
    /// Bind identity
    pub identity: String,
    /// LDAP result code
    pub code: u32,
    /// Server or transport message
    pub message: String,
}

/// A search could not be completed
#[derive(Debug, Error)]
#[error("search in {base} with {filter} failed: {message}")]
pub struct SearchError {
    /// Search base
    pub base: String,
    /// Search filter
    pub filter: String,
    /// Server or transport message
    pub message: String,
}

/// Errors that end a run
#[derive(Debug, Error)]
pub enum RunError {
    /// Connection or secure channel failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Bind rejected
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// Principal search failed and strict mode is on
    #[error("principal search failed: {0}")]
    PrincipalSearch(#[source] SearchError),

    /// The operator interrupted a prompt
    #[error("cancelled by operator")]
    Cancelled,

    /// Operator input could not be read
    #[error("could not read operator input: {0}")]
    Input(#[from] std::io::Error),
}

impl RunError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Connection(_) => 1,
            Self::Authentication(_) => 2,
            Self::Input(_) => 3,
            Self::PrincipalSearch(_) => 4,
            Self::Cancelled => 130,
        }
    }
}
