//! Storage gateway for the controller
//!
//! Persistent state is an opaque async key-value store with a fixed set of
//! well-known keys: the selected repository kind and one credential slot per
//! [`RepositoryKind`]. There is no transactionality across keys; every
//! multi-key read is a sequence of independent reads that tolerates absent
//! values.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::StorageResult;
use iconbridge_shared::models::redact_token;
use iconbridge_shared::{Credential, RepositoryKind};

/// Key holding the last selected repository kind
pub const SELECTED_REPOSITORY_KEY: &str = "repo_selected";

/// Opaque async key-value capability
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        (**self).delete(key).await
    }
}

/// Typed view of the well-known keys
pub struct SessionStorage<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last selected kind; missing or unrecognized values give the default
    pub async fn selected_kind(&self) -> StorageResult<RepositoryKind> {
        Ok(match self.store.get(SELECTED_REPOSITORY_KEY).await? {
            Some(value) => RepositoryKind::parse_or_default(&value),
            None => RepositoryKind::default(),
        })
    }

    pub async fn set_selected_kind(&self, kind: RepositoryKind) -> StorageResult<()> {
        debug!("Persisting selected repository {}", kind);
        self.store.set(SELECTED_REPOSITORY_KEY, kind.as_str()).await
    }

    /// Stored credential for `kind`; an empty stored value counts as absent
    pub async fn token(&self, kind: RepositoryKind) -> StorageResult<Option<Credential>> {
        Ok(self
            .store
            .get(kind.token_storage_key())
            .await?
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    pub async fn set_token(&self, kind: RepositoryKind, token: &Credential) -> StorageResult<()> {
        debug!("Persisting token {} for {}", token.redacted(), kind);
        self.store
            .set(kind.token_storage_key(), token.reveal())
            .await
    }

    pub async fn clear_token(&self, kind: RepositoryKind) -> StorageResult<()> {
        debug!("Removing token for {}", kind);
        self.store.delete(kind.token_storage_key()).await
    }

    /// Every credential slot, with absent slots as empty strings
    pub async fn all_tokens(&self) -> StorageResult<BTreeMap<RepositoryKind, String>> {
        let mut tokens = BTreeMap::new();
        for kind in RepositoryKind::ALL {
            let token = self
                .store
                .get(kind.token_storage_key())
                .await?
                .unwrap_or_default();
            if !token.is_empty() {
                debug!("Found stored token {} for {}", redact_token(&token), kind);
            }
            tokens.insert(kind, token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_selected_kind_defaults() {
        let storage = SessionStorage::new(MemoryStore::new());
        assert_eq!(
            storage.selected_kind().await.unwrap(),
            RepositoryKind::PublicIcons
        );

        storage
            .store()
            .set(SELECTED_REPOSITORY_KEY, "garbage")
            .await
            .unwrap();
        assert_eq!(
            storage.selected_kind().await.unwrap(),
            RepositoryKind::PublicIcons
        );

        storage
            .set_selected_kind(RepositoryKind::InternalImages)
            .await
            .unwrap();
        assert_eq!(
            storage.store().get("repo_selected").await.unwrap().as_deref(),
            Some("internal-images")
        );
    }

    #[tokio::test]
    async fn test_token_slots_are_independent() {
        let storage = SessionStorage::new(MemoryStore::new());
        storage
            .set_token(RepositoryKind::PrivateIcons, &Credential::new("glpat-1"))
            .await
            .unwrap();

        let tokens = storage.all_tokens().await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[&RepositoryKind::PrivateIcons], "glpat-1");
        assert_eq!(tokens[&RepositoryKind::PublicIcons], "");
        assert_eq!(tokens[&RepositoryKind::InternalImages], "");

        storage.clear_token(RepositoryKind::PrivateIcons).await.unwrap();
        assert!(storage
            .token(RepositoryKind::PrivateIcons)
            .await
            .unwrap()
            .is_none());
        assert!(storage
            .store()
            .get("token_private_icons")
            .await
            .unwrap()
            .is_none());
    }
}
