use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::accounts::{error::StoreError, repo::UserStore, repo_types::User};

/// In-process [`UserStore`] with the same conflict rules as the DynamoDB transaction.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    nicknames: HashMap<String, String>,
}

impl MemoryUserStore {
    pub fn get(&self, email: &str) -> Option<User> {
        self.inner.lock().unwrap().users.get(email).cloned()
    }

    pub fn remove(&self, email: &str) {
        let mut tables = self.inner.lock().unwrap();
        if let Some(user) = tables.users.remove(email) {
            tables.nicknames.remove(&user.nickname);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();
        if tables.nicknames.contains_key(&user.nickname) {
            return Err(StoreError::NicknameTaken);
        }
        if tables.users.contains_key(&user.email) {
            return Err(StoreError::EmailTaken);
        }
        tables
            .nicknames
            .insert(user.nickname.clone(), user.email.clone());
        tables.users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.get(email))
    }

    async fn mark_confirmed(&self, email: &str) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();
        let user = tables.users.get_mut(email).ok_or(StoreError::NotFound)?;
        user.confirmed = true;
        Ok(())
    }
}
