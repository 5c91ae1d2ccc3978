//! Owner-scoped, optimistically updated cache of food entries kept in sync
//! with the remote nutrition store.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::{
    aggregation::{recent_entries, NutritionDashboard},
    api::NutritionStore,
    error::{PlatewiseError, PlatewiseResult},
    models::{entry::TEMP_ID_PREFIX, DateRange, FoodEntry, Goal, NewFoodEntry},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local set was replaced with this many entries.
    Loaded(usize),
    /// The owner changed while the request was in flight; the snapshot was discarded.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Default)]
struct LedgerState {
    owner: Option<String>,
    /// Bumped on every owner change so replies for a previous owner are ignored.
    epoch: u64,
    entries: Vec<FoodEntry>,
    /// Temp ids deleted while their create was still in flight.
    withdrawn: HashSet<String>,
}

impl LedgerState {
    fn switch_owner(&mut self, owner: Option<&str>) -> bool {
        if self.owner.as_deref() == owner {
            return false;
        }
        self.owner = owner.map(str::to_string);
        self.epoch += 1;
        self.entries.clear();
        self.withdrawn.clear();
        true
    }
}

#[derive(Clone)]
pub struct NutritionLedger {
    store: Arc<dyn NutritionStore>,
    state: Arc<Mutex<LedgerState>>,
    updates: Arc<watch::Sender<Vec<FoodEntry>>>,
}

impl NutritionLedger {
    pub fn new(store: Arc<dyn NutritionStore>) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            store,
            state: Arc::new(Mutex::new(LedgerState::default())),
            updates: Arc::new(updates),
        }
    }

    /// Point the ledger at `owner`. Entries of a different (or no) owner are
    /// cleared before this returns. Returns whether the owner changed.
    pub async fn set_owner(&self, owner: Option<&str>) -> bool {
        let owner = normalize_owner(owner);
        let mut state = self.state.lock().await;
        let changed = state.switch_owner(owner);
        if changed {
            log_info!("ledger owner changed; local entries cleared");
            self.publish(&state);
        }
        changed
    }

    pub async fn owner(&self) -> Option<String> {
        self.state.lock().await.owner.clone()
    }

    /// Entries in insertion order.
    pub async fn entries(&self) -> Vec<FoodEntry> {
        self.state.lock().await.entries.clone()
    }

    /// The `limit` newest entries by timestamp, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<FoodEntry> {
        recent_entries(&self.state.lock().await.entries, limit)
    }

    /// Receiver that observes the entry set after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<FoodEntry>> {
        self.updates.subscribe()
    }

    pub async fn dashboard(
        &self,
        goal: &Goal,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> NutritionDashboard {
        let entries = self.entries().await;
        NutritionDashboard::build(&entries, goal, range, now)
    }

    /// Replace the local set with the store's snapshot for `owner`.
    pub async fn fetch(&self, owner: Option<&str>) -> PlatewiseResult<FetchOutcome> {
        let (owner_id, epoch) = {
            let mut state = self.state.lock().await;
            self.claim(&mut state, owner)?
        };

        let records = self
            .store
            .list(&owner_id)
            .await
            .map_err(|err| {
                log_warn!("failed to fetch entries: {err}");
                err.into_network()
            })?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            match record.into_entry(&owner_id, None) {
                Ok(entry) => entries.push(entry),
                Err(err) => log_warn!("skipping malformed remote entry: {err}"),
            }
        }

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            log_debug!("discarding fetched snapshot for a previous owner");
            return Ok(FetchOutcome::Superseded);
        }
        let loaded = entries.len();
        state.entries = entries;
        self.publish(&state);
        log_info!("loaded {loaded} entries");
        Ok(FetchOutcome::Loaded(loaded))
    }

    /// Insert `entry` immediately under a temporary id, then swap in the
    /// store-issued id once the create call succeeds. On failure the
    /// optimistic entry is removed again.
    pub async fn add(&self, owner: Option<&str>, entry: NewFoodEntry) -> PlatewiseResult<FoodEntry> {
        let temp_id = format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4());
        let (owner_id, epoch) = {
            let mut state = self.state.lock().await;
            let (owner_id, epoch) = self.claim(&mut state, owner)?;
            entry.validate()?;
            state
                .entries
                .push(FoodEntry::from_new(temp_id.clone(), &owner_id, &entry));
            self.publish(&state);
            (owner_id, epoch)
        };
        log_debug!("optimistically inserted {temp_id}");

        let created = self
            .store
            .create(&owner_id, &entry)
            .await
            .and_then(|record| record.into_entry(&owner_id, Some(entry.timestamp)));

        let mut state = self.state.lock().await;
        let current = state.epoch == epoch;
        let withdrawn = state.withdrawn.remove(&temp_id);
        match created {
            Ok(saved) if withdrawn => {
                if current {
                    state.entries.retain(|e| e.id != saved.id);
                    self.publish(&state);
                }
                drop(state);
                log_debug!("{temp_id} was deleted before its create landed; removing {}", saved.id);
                if let Err(err) = self.store.delete(&owner_id, &saved.id).await {
                    log_warn!("failed to remove withdrawn entry {}: {err}", saved.id);
                }
                Ok(saved)
            }
            Ok(saved) => {
                if current {
                    match state.entries.iter().position(|e| e.id == temp_id) {
                        Some(index) => state.entries[index] = saved.clone(),
                        // A fetch replaced the set mid-flight and may predate the create.
                        None if !state.entries.iter().any(|e| e.id == saved.id) => {
                            state.entries.push(saved.clone())
                        }
                        None => {}
                    }
                    self.publish(&state);
                }
                log_debug!("reconciled {temp_id} as {}", saved.id);
                Ok(saved)
            }
            Err(err) => {
                if current {
                    state.entries.retain(|e| e.id != temp_id);
                    self.publish(&state);
                }
                log_warn!("create failed, rolled back {temp_id}: {err}");
                Err(err.into_network())
            }
        }
    }

    /// Remove `id` immediately, then confirm with the store. On failure the
    /// entry is put back at its original position. A still-pending entry is
    /// only withdrawn locally; its create removes the stored record on arrival.
    pub async fn delete(&self, owner: Option<&str>, id: &str) -> PlatewiseResult<DeleteOutcome> {
        let (owner_id, epoch, index, removed) = {
            let mut state = self.state.lock().await;
            let (owner_id, epoch) = self.claim(&mut state, owner)?;
            let Some(index) = state.entries.iter().position(|e| e.id == id) else {
                log_debug!("delete of unknown entry {id}");
                return Ok(DeleteOutcome::NotFound);
            };
            let removed = state.entries.remove(index);
            self.publish(&state);
            if removed.is_pending() {
                // The store has not issued an id yet; add() finishes the removal.
                state.withdrawn.insert(removed.id);
                log_debug!("withdrew pending entry {id}");
                return Ok(DeleteOutcome::Deleted);
            }
            (owner_id, epoch, index, removed)
        };

        match self.store.delete(&owner_id, id).await {
            Ok(()) => {
                log_debug!("deleted {id}");
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                if state.epoch == epoch && !state.entries.iter().any(|e| e.id == id) {
                    let index = index.min(state.entries.len());
                    state.entries.insert(index, removed);
                    self.publish(&state);
                }
                log_warn!("delete of {id} failed, restored locally: {err}");
                Err(err.into_network())
            }
        }
    }

    /// Resolve the owner for an operation, clearing the ledger if it changed.
    /// An absent owner is refused before any remote call.
    fn claim(&self, state: &mut LedgerState, owner: Option<&str>) -> PlatewiseResult<(String, u64)> {
        let owner = normalize_owner(owner);
        if state.switch_owner(owner) {
            self.publish(state);
        }
        match owner {
            Some(owner_id) => Ok((owner_id.to_string(), state.epoch)),
            None => Err(PlatewiseError::AuthRequired),
        }
    }

    fn publish(&self, state: &LedgerState) {
        self.updates.send_replace(state.entries.clone());
    }
}

fn normalize_owner(owner: Option<&str>) -> Option<&str> {
    owner.map(str::trim).filter(|owner| !owner.is_empty())
}
