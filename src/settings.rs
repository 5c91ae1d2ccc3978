use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::detection::MAX_CANDIDATES;
use crate::models::Goal;

pub const API_URL_ENV: &str = "PLATEWISE_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_CAPTURE_PERIOD_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_base_url: String,
    pub capture_period_ms: u64,
    pub max_candidates: usize,
    pub goal: Goal,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            capture_period_ms: DEFAULT_CAPTURE_PERIOD_MS,
            max_candidates: MAX_CANDIDATES,
            goal: Goal::default(),
        }
    }
}

impl Settings {
    /// Repair values a hand-edited file may carry. Out-of-range fields fall
    /// back to (or are clamped into) their valid range.
    fn sanitized(mut self) -> Self {
        if self.capture_period_ms == 0 {
            warn!("capturePeriodMs must be positive; using {DEFAULT_CAPTURE_PERIOD_MS}");
            self.capture_period_ms = DEFAULT_CAPTURE_PERIOD_MS;
        }
        let clamped = self.max_candidates.clamp(1, MAX_CANDIDATES);
        if clamped != self.max_candidates {
            warn!(
                "maxCandidates {} is outside 1..={MAX_CANDIDATES}; using {clamped}",
                self.max_candidates
            );
            self.max_candidates = clamped;
        }
        if let Err(err) = self.goal.validate() {
            warn!("Ignoring invalid goal in settings: {err}");
            self.goal = Goal::default();
        }
        self
    }
}

/// JSON-file backed settings. Every update is written through immediately.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
    /// `PLATEWISE_API_URL` as seen at construction; reapplied on reload.
    api_url_override: Option<String>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let api_url_override = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
        Self::with_api_url_override(path, api_url_override)
    }

    pub(crate) fn with_api_url_override(
        path: PathBuf,
        api_url_override: Option<String>,
    ) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        let store = Self {
            path,
            data: RwLock::new(Settings::default()),
            api_url_override,
        };
        *store.write() = store.prepare(data);
        Ok(store)
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn goal(&self) -> Goal {
        self.read().goal
    }

    pub fn update_goal(&self, goal: Goal) -> Result<()> {
        goal.validate()?;
        let mut guard = self.write();
        guard.goal = goal;
        self.persist(&guard)
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.goal.validate()?;
        anyhow::ensure!(
            settings.capture_period_ms > 0,
            "capture period must be greater than zero"
        );
        anyhow::ensure!(
            (1..=MAX_CANDIDATES).contains(&settings.max_candidates),
            "max candidates must be between 1 and {MAX_CANDIDATES}"
        );
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: Settings = serde_json::from_str(&contents)?;
        *self.write() = self.prepare(data);
        Ok(())
    }

    fn prepare(&self, data: Settings) -> Settings {
        let mut data = data.sanitized();
        if let Some(url) = &self.api_url_override {
            data.api_base_url = url.clone();
        }
        data
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
