use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Identity established from a verified bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Verifies bearer tokens. `None` means the token is invalid or expired.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Claims>;
}

/// Token verifier backed by an in-memory token table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenVerifier {
    tokens: Arc<RwLock<HashMap<String, Claims>>>,
}

impl InMemoryTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for the given identity and returns it.
    pub fn issue(&self, claims: Claims) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().unwrap().insert(token.clone(), claims);
        token
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.write().unwrap().remove(token);
    }
}

#[async_trait]
impl TokenVerifier for InMemoryTokenVerifier {
    async fn verify(&self, token: &str) -> Option<Claims> {
        self.tokens.read().unwrap().get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Claims {
        Claims {
            user_id: UserId::new(),
            email: "jo@example.com".into(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn issued_tokens_verify_until_revoked() {
        let verifier = InMemoryTokenVerifier::new();
        let claims = customer();
        let token = verifier.issue(claims.clone());

        let verified = verifier.verify(&token).await.unwrap();
        assert_eq!(verified.user_id, claims.user_id);
        assert!(!verified.is_admin());

        verifier.revoke(&token);
        assert!(verifier.verify(&token).await.is_none());
    }

    #[tokio::test]
    async fn unknown_tokens_do_not_verify() {
        let verifier = InMemoryTokenVerifier::new();
        assert!(verifier.verify("not-a-token").await.is_none());
    }
}
