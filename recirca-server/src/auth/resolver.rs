//! Opaque bearer credential resolution.
//!
//! Token issuance lives in the identity service; this server only resolves
//! a presented credential to an identity. Tokens are stored hashed, never
//! in the clear.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use recirca_model::{Identity, Role, UserId};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// Resolves an opaque bearer credential to an identity. Any failure is
/// treated as unauthenticated.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<Identity>;
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Database-backed resolver: looks the token hash up in `access_tokens`
/// and checks expiry.
#[derive(Debug, Clone)]
pub struct PgCredentialResolver {
    pool: PgPool,
}

impl PgCredentialResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the token table if it does not exist yet. Rows are written
    /// by the identity service; this server only reads them.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_tokens (
                token_hash TEXT PRIMARY KEY,
                user_id UUID NOT NULL,
                role TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialResolver for PgCredentialResolver {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        let row = sqlx::query(
            "SELECT user_id, role, expires_at FROM access_tokens \
             WHERE token_hash = $1",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await
        .ok()??;

        let expires_at: chrono::DateTime<Utc> = row.try_get("expires_at").ok()?;
        if expires_at < Utc::now() {
            return None;
        }

        let role = match row.try_get::<String, _>("role").ok()?.as_str() {
            "requester" => Role::Requester,
            "collector" => Role::Collector,
            _ => return None,
        };
        let user_id: Uuid = row.try_get("user_id").ok()?;

        Some(Identity::new(UserId(user_id), role))
    }
}

/// In-memory resolver for the `memory` store mode and tests. Accepts
/// registered tokens, plus self-describing `requester:<uuid>` /
/// `collector:<uuid>` tokens so a local stack needs no identity service.
#[derive(Debug, Default)]
pub struct MemoryCredentialResolver {
    tokens: DashMap<String, Identity>,
}

impl MemoryCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

#[async_trait]
impl CredentialResolver for MemoryCredentialResolver {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        if let Some(identity) = self.tokens.get(token) {
            return Some(*identity);
        }

        let (role, id) = token.split_once(':')?;
        let role = match role {
            "requester" => Role::Requester,
            "collector" => Role::Collector,
            _ => return None,
        };
        let user_id = Uuid::parse_str(id).ok()?;
        Some(Identity::new(UserId(user_id), role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_resolver_accepts_registered_tokens() {
        let resolver = MemoryCredentialResolver::new();
        let identity = Identity::new(UserId::new(), Role::Collector);
        resolver.register("opaque-token", identity);

        assert_eq!(resolver.resolve("opaque-token").await, Some(identity));
        assert_eq!(resolver.resolve("other-token").await, None);
    }

    #[tokio::test]
    async fn memory_resolver_parses_self_describing_tokens() {
        let resolver = MemoryCredentialResolver::new();
        let id = Uuid::new_v4();

        let identity = resolver
            .resolve(&format!("collector:{id}"))
            .await
            .unwrap();
        assert_eq!(identity.role, Role::Collector);
        assert_eq!(identity.user_id.to_uuid(), id);

        assert!(resolver.resolve("admin:not-a-role").await.is_none());
        assert!(resolver.resolve("collector:not-a-uuid").await.is_none());
    }

    #[test]
    fn token_hashing_is_stable_and_hex() {
        let a = hash_token("secret");
        let b = hash_token("secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("Secret"));
    }
}
