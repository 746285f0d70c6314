use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{KvStore, NewUser, StoreError, User, UserStore};

struct Entry {
    value: String,
    /// Unix seconds; the entry reads as absent once `now > expires_at`
    expires_at: i64,
}

/// Process-local `KvStore`. Expired entries are evicted on read and by
/// `purge_expired`.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Utc::now().timestamp();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| now <= entry.expires_at)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now().timestamp();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if now <= entry.expires_at => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| now > entry.expires_at) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        let expires_at = Utc::now().timestamp().saturating_add(ttl_seconds);
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        Ok((before - entries.len()) as u64)
    }
}

#[derive(Default)]
struct UserTable {
    rows: HashMap<i64, User>,
    next_id: i64,
}

/// Process-local `UserStore` enforcing email uniqueness
#[derive(Default)]
pub struct InMemoryUserStore {
    table: RwLock<UserTable>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        table.next_id += 1;
        let row = User {
            id: table.next_id,
            email: user.email,
            role: user.role,
            password_hash: user.password_hash,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_kv_put_get_delete() {
        let kv = InMemoryKvStore::new();

        kv.put("k", "v", 60).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));

        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);

        // deleting again is fine
        kv.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_kv_expired_entry_reads_as_absent() {
        let kv = InMemoryKvStore::new();

        kv.put("k", "v", -1).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_drops_unread_expired_entries() {
        let kv = InMemoryKvStore::new();

        for i in 0..1000 {
            kv.put(&format!("stale-{}", i), "v", -1).await.unwrap();
        }
        kv.put("live", "v", 60).await.unwrap();

        assert_eq!(kv.purge_expired().await.unwrap(), 1000);
        assert_eq!(kv.entries.read().await.len(), 1);
        assert_eq!(kv.get("live").await.unwrap().as_deref(), Some("v"));

        assert_eq!(kv.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_ids_are_sequential() {
        let users = InMemoryUserStore::new();

        let a = users.insert(new_user("a@b.com")).await.unwrap();
        let b = users.insert(new_user("c@d.com")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(users.find_by_id(2).await.unwrap(), Some(b));
        assert_eq!(users.find_by_email("a@b.com").await.unwrap(), Some(a));
        assert_eq!(users.find_by_id(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let users = InMemoryUserStore::new();

        users.insert(new_user("a@b.com")).await.unwrap();
        let result = users.insert(new_user("a@b.com")).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }
}
