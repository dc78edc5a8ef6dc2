//! In-memory store implementations for router and service tests.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crime_track_core::{CriminalId, Email, ResetCode, UserId};

use super::{CriminalStore, RepositoryError, ResetTokenStore, UserStore};
use crate::models::{Criminal, CriminalSearch, NewUser, PasswordResetToken, User};

/// Strictly increasing timestamps so "most recently updated" is well defined
/// even when two writes land in the same clock tick.
#[derive(Default)]
struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
    clock: Clock,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
            clock: Clock::default(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Table<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.lock().unwrap().rows.get(&id.as_i32()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let table = self.inner.lock().unwrap();
        Ok(table.rows.values().find(|u| &u.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.inner.lock().unwrap();
        if table.rows.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(
                "email already registered".to_string(),
            ));
        }

        let id = table.allocate_id();
        let now = table.clock.tick();
        let created = User {
            id: UserId::new(id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            phone_number: user.phone_number,
            image: None,
            image_id: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn save(&self, user: &User) -> Result<User, RepositoryError> {
        let mut table = self.inner.lock().unwrap();
        let now = table.clock.tick();
        let stored = table
            .rows
            .get_mut(&user.id.as_i32())
            .ok_or(RepositoryError::NotFound)?;

        stored.name.clone_from(&user.name);
        stored.password_hash.clone_from(&user.password_hash);
        stored.phone_number.clone_from(&user.phone_number);
        stored.image.clone_from(&user.image);
        stored.image_id.clone_from(&user.image_id);
        stored.updated_at = now;
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct MemoryCriminalStore {
    inner: Mutex<Table<Criminal>>,
}

#[async_trait]
impl CriminalStore for MemoryCriminalStore {
    async fn list(
        &self,
        search: Option<&CriminalSearch>,
    ) -> Result<Vec<Criminal>, RepositoryError> {
        let table = self.inner.lock().unwrap();
        let mut records: Vec<Criminal> = table
            .rows
            .values()
            .filter(|c| search.is_none_or(|s| s.matches(c)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn find_by_id(&self, id: CriminalId) -> Result<Option<Criminal>, RepositoryError> {
        Ok(self.inner.lock().unwrap().rows.get(&id.as_i32()).cloned())
    }

    async fn create(&self, name: &str) -> Result<Criminal, RepositoryError> {
        let mut table = self.inner.lock().unwrap();
        let id = table.allocate_id();
        let now = table.clock.tick();
        let created = Criminal {
            id: CriminalId::new(id),
            name: name.to_string(),
            alias: None,
            statement: None,
            image: None,
            image_id: None,
            inmate_number: None,
            dob: None,
            gender: None,
            nationality: None,
            address: None,
            identification_number: None,
            height: None,
            weight: None,
            eye_color: None,
            hair_color: None,
            arrest_date: None,
            arrest_location: None,
            charges: None,
            status: None,
            sealed: false,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn save(&self, criminal: &Criminal) -> Result<Criminal, RepositoryError> {
        let mut table = self.inner.lock().unwrap();
        let now = table.clock.tick();
        let stored = table
            .rows
            .get_mut(&criminal.id.as_i32())
            .ok_or(RepositoryError::NotFound)?;

        let created_at = stored.created_at;
        *stored = Criminal {
            created_at,
            updated_at: now,
            ..criminal.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: CriminalId) -> Result<bool, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .rows
            .remove(&id.as_i32())
            .is_some())
    }
}

#[derive(Default)]
pub struct MemoryResetTokenStore {
    inner: Mutex<BTreeMap<i32, PasswordResetToken>>,
}

#[async_trait]
impl ResetTokenStore for MemoryResetTokenStore {
    async fn find_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        Ok(self.inner.lock().unwrap().get(&user_id.as_i32()).cloned())
    }

    async fn insert(&self, token: &PasswordResetToken) -> Result<(), RepositoryError> {
        let mut tokens = self.inner.lock().unwrap();
        if tokens.contains_key(&token.user_id.as_i32()) {
            return Err(RepositoryError::Conflict(
                "reset code already outstanding".to_string(),
            ));
        }
        tokens.insert(token.user_id.as_i32(), token.clone());
        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().remove(&user_id.as_i32());
        Ok(())
    }

    async fn consume(&self, user_id: UserId, code: &ResetCode) -> Result<bool, RepositoryError> {
        let mut tokens = self.inner.lock().unwrap();
        let key = user_id.as_i32();
        if tokens.get(&key).is_some_and(|token| token.code.matches(code)) {
            tokens.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }
}
