// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user role cache used by the permission middleware.
//!
//! Entries are evicted least-recently-used once the cache holds
//! [`ROLE_CACHE_CAPACITY`] users, and each entry expires after
//! [`ROLE_CACHE_TTL`]. Loads on a miss happen outside the lock, so two
//! concurrent misses for the same user may both hit the database.

use crate::db::Database;
use crate::error::AppError;
use crate::models::Role;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const ROLE_CACHE_CAPACITY: usize = 200;
pub const ROLE_CACHE_TTL: Duration = Duration::from_secs(60);

struct CachedRoles {
    roles: Vec<Role>,
    expires_at: Instant,
    /// Value of the use counter when this entry was last read or written
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, CachedRoles>,
    tick: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

pub struct RoleCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new(ROLE_CACHE_CAPACITY, ROLE_CACHE_TTL)
    }
}

impl RoleCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Roles held by `user_id`, loading from the database on a miss.
    pub async fn roles(&self, db: &Database, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        if let Some(roles) = self.get_at(user_id, Instant::now()) {
            return Ok(roles);
        }

        let roles = db.roles_for_user(user_id).await?;
        tracing::debug!(user_id = %user_id, count = roles.len(), "Loaded roles into cache");
        self.insert_at(user_id, roles.clone(), Instant::now());
        Ok(roles)
    }

    /// Drop any cached roles for `user_id`.
    pub fn invalidate(&self, user_id: Uuid) {
        self.lock().entries.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_at(&self, user_id: Uuid, now: Instant) -> Option<Vec<Role>> {
        let mut inner = self.lock();
        let tick = inner.next_tick();

        let expired = match inner.entries.get_mut(&user_id) {
            None => return None,
            Some(entry) if entry.expires_at <= now => true,
            Some(entry) => {
                entry.last_used = tick;
                return Some(entry.roles.clone());
            }
        };
        if expired {
            inner.entries.remove(&user_id);
        }
        None
    }

    fn insert_at(&self, user_id: Uuid, roles: Vec<Role>, now: Instant) {
        let mut inner = self.lock();
        let tick = inner.next_tick();

        if !inner.entries.contains_key(&user_id) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            user_id,
            CachedRoles {
                roles,
                expires_at: now + self.ttl,
                last_used: tick,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Vec<Role> {
        vec![Role::admin()]
    }

    #[test]
    fn test_hit_before_ttl_and_miss_after() {
        let cache = RoleCache::default();
        let user = Uuid::new_v4();
        let start = Instant::now();

        cache.insert_at(user, admin(), start);
        assert_eq!(
            cache.get_at(user, start + Duration::from_secs(59)),
            Some(admin())
        );
        assert_eq!(cache.get_at(user, start + Duration::from_secs(60)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_role_list_is_cached() {
        let cache = RoleCache::default();
        let user = Uuid::new_v4();
        let now = Instant::now();

        cache.insert_at(user, Vec::new(), now);
        assert_eq!(cache.get_at(user, now), Some(Vec::new()));
    }

    #[test]
    fn test_evicts_least_recently_used_past_capacity() {
        let cache = RoleCache::default();
        let now = Instant::now();
        let users: Vec<Uuid> = (0..ROLE_CACHE_CAPACITY).map(|_| Uuid::new_v4()).collect();

        for user in &users {
            cache.insert_at(*user, admin(), now);
        }
        assert_eq!(cache.len(), ROLE_CACHE_CAPACITY);

        // Touch the oldest entry so the second-oldest becomes the victim.
        assert!(cache.get_at(users[0], now).is_some());

        let newcomer = Uuid::new_v4();
        cache.insert_at(newcomer, admin(), now);

        assert_eq!(cache.len(), ROLE_CACHE_CAPACITY);
        assert!(cache.get_at(users[0], now).is_some());
        assert!(cache.get_at(users[1], now).is_none());
        assert!(cache.get_at(newcomer, now).is_some());
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let cache = RoleCache::new(2, ROLE_CACHE_TTL);
        let now = Instant::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        cache.insert_at(a, admin(), now);
        cache.insert_at(b, admin(), now);
        cache.insert_at(a, Vec::new(), now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(a, now), Some(Vec::new()));
        assert_eq!(cache.get_at(b, now), Some(admin()));
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let cache = RoleCache::default();
        let user = Uuid::new_v4();
        let now = Instant::now();

        cache.insert_at(user, admin(), now);
        cache.invalidate(user);
        assert_eq!(cache.get_at(user, now), None);
    }

    #[tokio::test]
    async fn test_roles_loads_from_database_once() {
        let db = Database::in_memory();
        let user = Uuid::new_v4();
        db.grant_role(user, &Role::admin()).await.unwrap();

        let cache = RoleCache::default();
        assert_eq!(cache.roles(&db, user).await.unwrap(), admin());

        // Served from cache even though the store changed underneath.
        db.revoke_role(user, &Role::admin()).await.unwrap();
        assert_eq!(cache.roles(&db, user).await.unwrap(), admin());

        cache.invalidate(user);
        assert!(cache.roles(&db, user).await.unwrap().is_empty());
    }
}
