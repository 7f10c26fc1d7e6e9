use std::collections::HashMap;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens revoked before their natural expiry (logout).
///
/// Entries are keyed by the SHA-256 of the token and dropped once the token
/// would have expired anyway.
pub struct RevocationList {
    enabled: bool,
    entries: RwLock<HashMap<String, i64>>,
}

fn fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

impl RevocationList {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Revoke `token` until `expires_at` (unix seconds).
    pub async fn revoke(&self, token: &str, expires_at: i64) {
        if !self.enabled {
            return;
        }
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        entries.retain(|_, exp| *exp > now);
        entries.insert(fingerprint(token), expires_at);
        debug!("Revoked token, {} entries held", entries.len());
    }

    pub async fn is_revoked(&self, token: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let now = Utc::now().timestamp();
        self.entries
            .read()
            .await
            .get(&fingerprint(token))
            .map(|exp| *exp > now)
            .unwrap_or(false)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_tokens_are_remembered_until_expiry() {
        let list = RevocationList::new(true);
        let later = Utc::now().timestamp() + 3600;

        list.revoke("token-a", later).await;
        assert!(list.is_revoked("token-a").await);
        assert!(!list.is_revoked("token-b").await);

        // Already-expired entries are pruned on the next revoke
        list.revoke("token-old", Utc::now().timestamp() - 1).await;
        assert!(!list.is_revoked("token-old").await);
        list.revoke("token-c", later).await;
        assert_eq!(list.len().await, 2);
    }

    #[tokio::test]
    async fn disabled_list_never_revokes() {
        let list = RevocationList::new(false);
        list.revoke("token", Utc::now().timestamp() + 60).await;
        assert!(!list.is_revoked("token").await);
        assert!(list.is_empty().await);
    }
}
