//! LDAP-backed directory session
//!
//! Uses the blocking `LdapConn` API; the whole run is sequential so there is
//! nothing to gain from driving the async connection ourselves.

use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, SearchEntry};
use log::{debug, info};
use reconcile::{
    AttributeChange, AuthenticationError, ConnectionError, Directory, Entry, ModifyOutcome, Scope,
    SearchError,
};
use std::collections::HashSet;
use std::time::Duration;

/// Result code for rejected credentials
const INVALID_CREDENTIALS: u32 = 49;

/// A single session against one directory server
pub struct LdapDirectory {
    url: String,
    starttls: bool,
    timeout: Duration,
    conn: Option<LdapConn>,
}

impl LdapDirectory {
    /// Create an unconnected session
    ///
    /// StartTLS is never attempted on `ldaps://` URLs, which are encrypted
    /// from the first byte.
    pub fn new(url: &str, starttls: bool, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            starttls: starttls && !url.starts_with("ldaps://"),
            timeout,
            conn: None,
        }
    }

    fn settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.starttls)
    }

    /// Map a connection failure onto the phase it happened in
    fn classify(&self, err: LdapError) -> ConnectionError {
        match err {
            LdapError::Timeout { .. } => ConnectionError::Timeout {
                url: self.url.clone(),
                secs: self.timeout.as_secs(),
            },
            LdapError::Io { source } => ConnectionError::SocketOpen {
                url: self.url.clone(),
                message: source.to_string(),
            },
            other if self.starttls => ConnectionError::SecureUpgrade {
                url: self.url.clone(),
                message: other.to_string(),
            },
            other => ConnectionError::SocketOpen {
                url: self.url.clone(),
                message: other.to_string(),
            },
        }
    }

    fn conn(&mut self) -> Option<&mut LdapConn> {
        self.conn.as_mut()
    }
}

impl Directory for LdapDirectory {
    fn connect_and_secure(&mut self) -> Result<(), ConnectionError> {
        debug!("Connecting to {} (starttls: {})", self.url, self.starttls);

        let conn = LdapConn::with_settings(self.settings(), &self.url)
            .map_err(|e| self.classify(e))?;
        self.conn = Some(conn);

        info!("Connected to {}", self.url);
        Ok(())
    }

    fn bind(&mut self, identity: &str, secret: &str) -> Result<(), AuthenticationError> {
        let fail = |code: u32, message: String| AuthenticationError {
            identity: identity.to_string(),
            code,
            message,
        };

        let conn = self
            .conn()
            .ok_or_else(|| fail(ModifyOutcome::LOCAL_ERROR, "not connected".to_string()))?;

        let result = conn
            .simple_bind(identity, secret)
            .map_err(|e| fail(ModifyOutcome::LOCAL_ERROR, e.to_string()))?;

        match result.rc {
            0 => Ok(()),
            INVALID_CREDENTIALS => Err(fail(result.rc, "invalid credentials".to_string())),
            rc => Err(fail(rc, result.text)),
        }
    }

    fn search(
        &mut self,
        base: &str,
        filter: &str,
        scope: Scope,
        attributes: &[&str],
    ) -> Result<Vec<Entry>, SearchError> {
        let fail = |message: String| SearchError {
            base: base.to_string(),
            filter: filter.to_string(),
            message,
        };

        let conn = self.conn().ok_or_else(|| fail("not connected".to_string()))?;

        debug!("Searching {base} for {filter}");
        let (entries, _) = conn
            .search(base, ldap_scope(scope), filter, attributes)
            .and_then(|result| result.success())
            .map_err(|e| fail(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                Entry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    fn modify(&mut self, identity: &str, changes: &[AttributeChange]) -> ModifyOutcome {
        let Some(conn) = self.conn() else {
            return ModifyOutcome::failure(ModifyOutcome::LOCAL_ERROR, "not connected");
        };

        let mods: Vec<Mod<String>> = changes.iter().map(ldap_mod).collect();
        match conn.modify(identity, mods) {
            Ok(result) if result.rc == 0 => ModifyOutcome::success(),
            Ok(result) => ModifyOutcome::failure(result.rc, result.text),
            Err(e) => ModifyOutcome::failure(ModifyOutcome::LOCAL_ERROR, e.to_string()),
        }
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let _ = conn.unbind();
        }
    }
}

fn ldap_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn ldap_mod(change: &AttributeChange) -> Mod<String> {
    match change {
        AttributeChange::Add { attribute, values } => {
            Mod::Add(attribute.clone(), values.iter().cloned().collect::<HashSet<_>>())
        }
        AttributeChange::Delete { attribute, values } => {
            Mod::Delete(attribute.clone(), values.iter().cloned().collect::<HashSet<_>>())
        }
    }
}
