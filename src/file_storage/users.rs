//! Account storage in `users.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{read_json, write_json, FileResult};
use crate::models::{StoreError, User};
use crate::utils::{lock_mutex_recover, users_path};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersFile {
    updated_at: DateTime<Utc>,
    users: Vec<User>,
}

pub struct UserStore {
    path: PathBuf,
    users: Mutex<Vec<User>>,
}

impl UserStore {
    pub fn open(data_dir: &Path) -> FileResult<Self> {
        let path = users_path(data_dir);
        let users = if path.exists() {
            read_json::<UsersFile>(&path)?.users
        } else {
            Vec::new()
        };
        log::debug!("Loaded {} accounts from {:?}", users.len(), path);
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    /// Look up by already-normalized email
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        lock_mutex_recover(&self.users)
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Add an account; the email must not be registered yet
    pub fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = lock_mutex_recover(&self.users);
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(
                "User with this email already exists".to_string(),
            ));
        }

        users.push(user.clone());
        let file = UsersFile {
            updated_at: Utc::now(),
            users: users.clone(),
        };
        if let Err(e) = write_json(&self.path, &file) {
            users.pop();
            return Err(StoreError::Io(e));
        }
        Ok(user)
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.users).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(email: &str) -> User {
        User {
            id: crate::utils::generate_id(),
            email: email.to_string(),
            name: Some("Dana".to_string()),
            password_hash: "$argon2id$stub".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_persists() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        let saved = store.insert(user("dana@example.com")).unwrap();

        let reopened = UserStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.find_by_email("dana@example.com").unwrap().id,
            saved.id
        );
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        store.insert(user("dana@example.com")).unwrap();
        let err = store.insert(user("dana@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }
}
