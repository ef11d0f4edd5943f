//! Session read contract
//!
//! Credential persistence belongs to the host application. The sync layer
//! only asks who is signed in and with which token.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::constants::GUEST_USER_ID;

/// The signed-in identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Owner id stamped on tasks
    pub id: String,
    /// Bearer token for the remote API; empty for guests
    pub access_token: Option<String>,
    pub is_guest: bool,
}

impl Session {
    pub fn user(id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: Some(access_token.into()),
            is_guest: false,
        }
    }

    /// Local-only session, tasks never leave the device
    pub fn guest() -> Self {
        Self {
            id: GUEST_USER_ID.to_string(),
            access_token: None,
            is_guest: true,
        }
    }

    /// Token usable for remote calls, if any
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<Session>;
}

/// In-process session holder
#[derive(Debug, Default)]
pub struct StaticSession {
    session: RwLock<Option<Session>>,
}

impl StaticSession {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub async fn set(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    pub async fn clear(&self) {
        *self.session.write().await = None;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}
