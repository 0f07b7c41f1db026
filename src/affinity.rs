//! Per-user topic affinities with lazy, time-based decay.
//!
//! Each `(user, topic)` record stores the weight as of its last
//! interaction. The effective weight at time `now` is
//!
//! ```text
//! weight × decay_factor ^ floor(days since last interaction)
//! ```
//!
//! so reading never compounds decay. An interaction materializes the
//! effective weight, adds `learning_rate`, and caps at 1.0. Records whose
//! effective weight falls below `epsilon` are pruned whenever the user's
//! records are touched.
//!
//! The user map is behind an `RwLock`; each user's records sit behind their
//! own `Mutex`, so the read-decay-update sequence is atomic per user while
//! different users never contend. A user whose last record is pruned is
//! removed from the map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::config::AffinityConfig;
use crate::models::InteractionKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityRecord {
    /// Weight as of `last_interaction`.
    pub weight: f64,
    pub last_interaction: DateTime<Utc>,
    pub last_interaction_type: InteractionKind,
}

type UserRecords = Arc<Mutex<HashMap<String, AffinityRecord>>>;

pub struct AffinityStore {
    config: AffinityConfig,
    users: RwLock<HashMap<String, UserRecords>>,
}

fn lock(records: &UserRecords) -> MutexGuard<'_, HashMap<String, AffinityRecord>> {
    records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AffinityStore {
    pub fn new(config: AffinityConfig) -> Self {
        Self {
            config,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Weight of `record` at `now`.
    pub fn effective_weight(&self, record: &AffinityRecord, now: DateTime<Utc>) -> f64 {
        let days = (now - record.last_interaction).num_days().max(0);
        let exponent = i32::try_from(days).unwrap_or(i32::MAX);
        record.weight * self.config.decay_factor.powi(exponent)
    }

    pub fn record_interaction(&self, user_id: &str, topic_id: &str, kind: InteractionKind) -> f64 {
        self.record_interaction_at(user_id, topic_id, kind, Utc::now())
    }

    /// Apply one interaction and return the topic's new weight.
    pub fn record_interaction_at(
        &self,
        user_id: &str,
        topic_id: &str,
        kind: InteractionKind,
        now: DateTime<Utc>,
    ) -> f64 {
        loop {
            {
                // The read guard is held while updating so an emptied user
                // cannot be dropped from the map underneath this write.
                let users = self.read_users();
                if let Some(user) = users.get(user_id) {
                    let mut records = lock(user);
                    let current = records
                        .get(topic_id)
                        .map(|r| self.effective_weight(r, now))
                        .unwrap_or(0.0);
                    let weight = (current + self.config.learning_rate).min(1.0);
                    records.insert(
                        topic_id.to_string(),
                        AffinityRecord {
                            weight,
                            last_interaction: now,
                            last_interaction_type: kind,
                        },
                    );
                    self.prune(&mut records, now);

                    debug!(user = %user_id, topic = %topic_id, kind = ?kind, weight, "Recorded interaction.");
                    return weight;
                }
            }
            self.write_users()
                .entry(user_id.to_string())
                .or_default();
        }
    }

    pub fn affinities(&self, user_id: &str) -> HashMap<String, f64> {
        self.affinities_at(user_id, Utc::now())
    }

    /// Decayed topic weights for `user_id`. Unknown users get an empty map.
    pub fn affinities_at(&self, user_id: &str, now: DateTime<Utc>) -> HashMap<String, f64> {
        self.decay_at(user_id, now)
    }

    pub fn decay(&self, user_id: &str) -> HashMap<String, f64> {
        self.decay_at(user_id, Utc::now())
    }

    /// Prune records below epsilon and return the surviving decayed weights.
    /// A user left with no records is forgotten.
    pub fn decay_at(&self, user_id: &str, now: DateTime<Utc>) -> HashMap<String, f64> {
        let Some(user) = self.existing_user(user_id) else {
            return HashMap::new();
        };
        {
            let mut records = lock(&user);
            self.prune(&mut records, now);
            if !records.is_empty() {
                return records
                    .iter()
                    .map(|(topic, r)| (topic.clone(), self.effective_weight(r, now)))
                    .collect();
            }
        }
        self.remove_if_empty(user_id);
        HashMap::new()
    }

    /// Raw records for `user_id`, for inspection.
    pub fn records(&self, user_id: &str) -> HashMap<String, AffinityRecord> {
        match self.existing_user(user_id) {
            Some(user) => lock(&user).clone(),
            None => HashMap::new(),
        }
    }

    pub fn user_count(&self) -> usize {
        self.read_users().len()
    }

    fn prune(&self, records: &mut HashMap<String, AffinityRecord>, now: DateTime<Utc>) {
        let epsilon = self.config.epsilon;
        records.retain(|_, r| self.effective_weight(r, now) >= epsilon);
    }

    fn existing_user(&self, user_id: &str) -> Option<UserRecords> {
        self.read_users().get(user_id).cloned()
    }

    /// Drop `user_id` if its records are still empty once the map is
    /// exclusively held; an interaction may have landed in between.
    fn remove_if_empty(&self, user_id: &str) {
        let mut users = self.write_users();
        let empty = users
            .get(user_id)
            .map(|user| lock(user).is_empty())
            .unwrap_or(false);
        if empty {
            users.remove(user_id);
            debug!(user = %user_id, "Forgot user with no remaining affinities.");
        }
    }

    fn read_users(&self) -> RwLockReadGuard<'_, HashMap<String, UserRecords>> {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_users(&self) -> RwLockWriteGuard<'_, HashMap<String, UserRecords>> {
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn store() -> AffinityStore {
        AffinityStore::new(AffinityConfig::default())
    }

    #[test]
    fn test_five_views_then_ten_days() {
        let s = store();
        let mut last = t0();
        for i in 0..5 {
            last = t0() + Duration::minutes(12 * i);
            s.record_interaction_at("u1", "congress", InteractionKind::View, last);
        }
        let w = s.affinities_at("u1", last)["congress"];
        assert!((w - 0.5).abs() < 1e-9, "got {}", w);

        let later = last + Duration::days(10);
        let w = s.affinities_at("u1", later)["congress"];
        assert!((w - 0.5 * 0.95f64.powi(10)).abs() < 1e-9, "got {}", w);

        // reading again does not compound decay
        let again = s.affinities_at("u1", later)["congress"];
        assert_eq!(w, again);
    }

    #[test]
    fn test_weight_caps_at_one() {
        let s = store();
        for _ in 0..15 {
            s.record_interaction_at("u1", "climate", InteractionKind::Like, t0());
        }
        assert_eq!(s.affinities_at("u1", t0())["climate"], 1.0);
        assert_eq!(
            s.records("u1")["climate"].last_interaction_type,
            InteractionKind::Like
        );
    }

    #[test]
    fn test_decay_is_monotonic_and_prunes() {
        let s = store();
        s.record_interaction_at("u1", "economy", InteractionKind::Share, t0());

        let mut previous = f64::MAX;
        let mut pruned_on = None;
        for day in 0..120 {
            let map = s.decay_at("u1", t0() + Duration::days(day));
            match map.get("economy") {
                Some(w) => {
                    assert!(*w <= previous);
                    previous = *w;
                }
                None => {
                    pruned_on = Some(day);
                    break;
                }
            }
        }
        // 0.1 × 0.95^d < 0.01 first at d = 45
        assert_eq!(pruned_on, Some(45));
        assert!(s.records("u1").is_empty());
    }

    #[test]
    fn test_fully_decayed_user_is_forgotten() {
        let s = store();
        s.record_interaction_at("u1", "transit", InteractionKind::View, t0());
        s.record_interaction_at("u2", "transit", InteractionKind::View, t0());
        assert_eq!(s.user_count(), 2);

        assert!(s.decay_at("u1", t0() + Duration::days(100)).is_empty());
        assert_eq!(s.user_count(), 1);
        assert!(s.records("u1").is_empty());

        // a forgotten user starts over from zero
        let w = s.record_interaction_at("u1", "transit", InteractionKind::View, t0() + Duration::days(101));
        assert!((w - 0.1).abs() < 1e-9);
        assert_eq!(s.user_count(), 2);
    }

    #[test]
    fn test_interaction_after_decay_materializes_weight() {
        let s = store();
        s.record_interaction_at("u1", "elections", InteractionKind::View, t0());
        let w = s.record_interaction_at("u1", "elections", InteractionKind::Debate, t0() + Duration::days(2));
        assert!((w - (0.1 * 0.95 * 0.95 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let s = store();
        assert!(s.affinities_at("nobody", t0()).is_empty());
        assert_eq!(s.user_count(), 0);
    }

    #[test]
    fn test_concurrent_interactions_do_not_lose_increments() {
        let s = Arc::new(AffinityStore::new(AffinityConfig {
            learning_rate: 0.01,
            ..Default::default()
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        s.record_interaction_at("shared", "congress", InteractionKind::View, t0());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let w = s.affinities_at("shared", t0())["congress"];
        assert!((w - 0.8).abs() < 1e-9, "got {}", w);
        assert_eq!(s.user_count(), 1);
    }
}
