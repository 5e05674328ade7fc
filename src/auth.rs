//! Login gate in front of the dashboard.
//!
//! The credential table is a fixed in-memory placeholder, not an access-control mechanism:
//! passwords are compared in plain text and sessions never expire.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BUILT_IN_USERS: &[(&str, &str)] = &[
    ("dhruv", "travel123"),
    ("john", "john2024"),
    ("alice", "passalice"),
];

/// Username to password lookup.
#[derive(Debug, Clone)]
pub struct CredentialTable {
    users: HashMap<String, String>,
}

impl CredentialTable {
    pub fn built_in() -> Self {
        Self::from_pairs(BUILT_IN_USERS.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            users: pairs
                .into_iter()
                .map(|(u, p)| (u.to_string(), p.to_string()))
                .collect(),
        }
    }

    /// Exact, case-sensitive match of both fields.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.users.get(user).is_some_and(|p| p == password)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for CredentialTable {
    fn default() -> Self {
        Self::built_in()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GateState {
    LoggedOut,
    LoggedIn { user: String },
}

impl GateState {
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::LoggedOut => None,
            Self::LoggedIn { user } => Some(user),
        }
    }
}

/// Opaque per-client session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid login.")]
    InvalidLogin,
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
}

/// Login state per session. Sessions start logged out.
#[derive(Debug, Default)]
pub struct SessionGate {
    credentials: CredentialTable,
    sessions: HashMap<SessionId, GateState>,
}

impl SessionGate {
    pub fn new(credentials: CredentialTable) -> Self {
        Self {
            credentials,
            sessions: HashMap::new(),
        }
    }

    pub fn open_session(&mut self) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(id, GateState::LoggedOut);
        debug!(session = %id, "session opened");
        id
    }

    /// On a mismatch the session stays logged out.
    pub fn login(
        &mut self,
        session: SessionId,
        user: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let ok = self.credentials.verify(user, password);
        let state = self
            .sessions
            .get_mut(&session)
            .ok_or(AuthError::UnknownSession(session))?;
        if ok {
            *state = GateState::LoggedIn {
                user: user.to_string(),
            };
            info!(session = %session, user, "login succeeded");
            Ok(())
        } else {
            *state = GateState::LoggedOut;
            warn!(session = %session, user, "login rejected");
            Err(AuthError::InvalidLogin)
        }
    }

    pub fn logout(&mut self, session: SessionId) -> Result<(), AuthError> {
        let state = self
            .sessions
            .get_mut(&session)
            .ok_or(AuthError::UnknownSession(session))?;
        if let GateState::LoggedIn { user } = state {
            info!(session = %session, user = %user, "logged out");
        }
        *state = GateState::LoggedOut;
        Ok(())
    }

    pub fn state(&self, session: SessionId) -> Result<&GateState, AuthError> {
        self.sessions
            .get(&session)
            .ok_or(AuthError::UnknownSession(session))
    }

    pub fn is_logged_in(&self, session: SessionId) -> bool {
        matches!(self.sessions.get(&session), Some(GateState::LoggedIn { .. }))
    }

    pub fn close_session(&mut self, session: SessionId) {
        if self.sessions.remove(&session).is_some() {
            debug!(session = %session, "session closed");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_with_valid_credentials() {
        let mut gate = SessionGate::default();
        let s = gate.open_session();
        assert_eq!(gate.state(s).unwrap(), &GateState::LoggedOut);
        gate.login(s, "dhruv", "travel123").unwrap();
        assert_eq!(
            gate.state(s).unwrap(),
            &GateState::LoggedIn {
                user: "dhruv".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_password_stays_logged_out() {
        let mut gate = SessionGate::default();
        let s = gate.open_session();
        let err = gate.login(s, "dhruv", "wrong").unwrap_err();
        assert_eq!(err, AuthError::InvalidLogin);
        assert_eq!(err.to_string(), "Invalid login.");
        assert!(!gate.is_logged_in(s));
        assert!(gate.login(s, "DHRUV", "travel123").is_err());
        assert!(gate.login(s, "mallory", "").is_err());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut gate = SessionGate::default();
        let a = gate.open_session();
        let b = gate.open_session();
        assert_ne!(a, b);
        gate.login(a, "alice", "passalice").unwrap();
        assert!(gate.is_logged_in(a));
        assert!(!gate.is_logged_in(b));

        gate.logout(a).unwrap();
        gate.logout(a).unwrap();
        assert!(!gate.is_logged_in(a));
    }

    #[test]
    fn test_unknown_session() {
        let mut gate = SessionGate::default();
        let s = gate.open_session();
        gate.close_session(s);
        assert_eq!(gate.session_count(), 0);
        assert_eq!(
            gate.login(s, "john", "john2024"),
            Err(AuthError::UnknownSession(s))
        );
        assert!(gate.state(s).is_err());
    }

    #[test]
    fn test_built_in_table() {
        let table = CredentialTable::built_in();
        assert_eq!(table.len(), 3);
        assert!(table.verify("john", "john2024"));
        assert!(!table.verify("john", "john2025"));
    }
}
