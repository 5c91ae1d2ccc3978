//! In-memory stand-ins for the remote services, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::api::{DetectionService, NutritionStore, RemoteFoodRecord};
use crate::capture::FrameSource;
use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::{ImagePayload, NewFoodEntry};

pub(crate) fn detection_body(names: &[(&str, f64)]) -> Value {
    let foods: Vec<Value> = names
        .iter()
        .map(|(name, confidence)| {
            json!({"food_name": name, "calories": 100, "protein": 5, "carbs": 10, "fat": 2, "confidence": confidence})
        })
        .collect();
    json!({ "detected_foods": foods })
}

/// Detector that answers from a script of responses (then a fallback),
/// optionally taking `delay` per call, and records concurrency.
pub(crate) struct FakeDetector {
    script: Mutex<VecDeque<PlatewiseResult<Value>>>,
    fallback: PlatewiseResult<Value>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDetector {
    pub(crate) fn new(fallback: PlatewiseResult<Value>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn then(self, response: PlatewiseResult<Value>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionService for FakeDetector {
    async fn detect(&self, _image: ImagePayload) -> PlatewiseResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Frame source that always (or never) has a JPEG frame ready.
pub(crate) struct StaticFrames {
    ready: bool,
}

impl StaticFrames {
    pub(crate) fn ready() -> Self {
        Self { ready: true }
    }

    pub(crate) fn empty() -> Self {
        Self { ready: false }
    }
}

#[async_trait]
impl FrameSource for StaticFrames {
    async fn capture_frame(&self) -> PlatewiseResult<Option<ImagePayload>> {
        Ok(self
            .ready
            .then(|| ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 16], "capture.jpg")))
    }
}

pub(crate) fn remote_record(
    id: &str,
    name: &str,
    calories: f64,
    timestamp: DateTime<Utc>,
) -> RemoteFoodRecord {
    RemoteFoodRecord {
        id: id.to_string(),
        user_id: None,
        food_name: name.to_string(),
        calories,
        protein: 10.0,
        carbs: 20.0,
        fat: 5.0,
        timestamp: Some(timestamp.to_rfc3339()),
    }
}

/// Per-owner in-memory store with switchable failures and gates that hold
/// a call open until the test releases it.
#[derive(Default)]
pub(crate) struct FakeStore {
    records: Mutex<HashMap<String, Vec<RemoteFoodRecord>>>,
    pub(crate) fail_list: AtomicBool,
    pub(crate) fail_create: AtomicBool,
    pub(crate) fail_delete: AtomicBool,
    list_gate: Mutex<Option<Arc<Notify>>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
    next_id: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn seed(&self, owner: &str, records: Vec<RemoteFoodRecord>) {
        self.records
            .lock()
            .unwrap()
            .insert(owner.to_string(), records);
    }

    pub(crate) fn stored(&self, owner: &str) -> Vec<RemoteFoodRecord> {
        self.records
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn gate_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
        let gate = gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl NutritionStore for FakeStore {
    async fn list(&self, owner_id: &str) -> PlatewiseResult<Vec<RemoteFoodRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.list_gate).await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(PlatewiseError::network("list failed"));
        }
        Ok(self.stored(owner_id))
    }

    async fn create(
        &self,
        owner_id: &str,
        entry: &NewFoodEntry,
    ) -> PlatewiseResult<RemoteFoodRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.write_gate).await;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PlatewiseError::network("create failed"));
        }

        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = RemoteFoodRecord {
            id,
            user_id: Some(owner_id.to_string()),
            food_name: entry.food_name.clone(),
            calories: entry.calories,
            protein: entry.protein,
            carbs: entry.carbs,
            fat: entry.fat,
            timestamp: Some(entry.timestamp.to_rfc3339()),
        };
        self.records
            .lock()
            .unwrap()
            .entry(owner_id.to_string())
            .or_default()
            .push(record.clone());

        // The create reply echoes the body plus the id, without a timestamp.
        Ok(RemoteFoodRecord {
            timestamp: None,
            ..record
        })
    }

    async fn delete(&self, owner_id: &str, id: &str) -> PlatewiseResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.write_gate).await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(PlatewiseError::network("delete failed"));
        }
        if let Some(records) = self.records.lock().unwrap().get_mut(owner_id) {
            records.retain(|record| record.id != id);
        }
        Ok(())
    }
}
