//! session.rs — Sessão do usuário (token + dados) usada pelas chamadas autenticadas
//!
//! A persistência fica a cargo de quem compõe a aplicação; aqui só existe o contrato
//! e uma implementação em memória.

use crate::types::{AuthResponse, User};
use std::sync::RwLock;

/// Origem do token bearer consumido pelo `ApiClient`.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn user(&self) -> Option<User>;
    fn store(&self, auth: AuthResponse);
    fn clear(&self);
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user: User,
}

/// Sessão mantida apenas em memória.
#[derive(Debug, Default)]
pub struct MemorySession {
    inner: RwLock<Option<Session>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|s| s.token.clone())
    }

    fn user(&self) -> Option<User> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|s| s.user.clone())
    }

    fn store(&self, auth: AuthResponse) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Session {
            token: auth.access_token,
            user: auth.user,
        });
    }

    fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}
