mod utils;

pub mod aggregation;
pub mod api;
pub mod capture;
pub mod detection;
pub mod error;
pub mod ledger;
pub mod models;
pub mod settings;

#[cfg(test)]
mod testing;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;

pub use aggregation::NutritionDashboard;
pub use api::{DetectionService, HttpApi, NutritionStore};
pub use capture::{CaptureConfig, CaptureOutcome, CaptureScheduler, CaptureSnapshot, FrameSource};
pub use error::{PlatewiseError, PlatewiseResult};
pub use ledger::{DeleteOutcome, FetchOutcome, NutritionLedger};
pub use models::{
    DateRange, DetectionCandidate, FoodEntry, Goal, GoalProgress, ImagePayload, NewFoodEntry,
    NutritionTotals,
};
pub use settings::{Settings, SettingsStore};
pub use utils::logging::init_logging;

/// The wired-up core handed to the presentation layer.
pub struct AppState {
    pub api: HttpApi,
    pub capture: CaptureScheduler,
    pub ledger: NutritionLedger,
    pub settings: SettingsStore,
}

impl AppState {
    /// Load settings from `settings_path` and connect both components to the
    /// configured API, capturing frames from `source`.
    pub fn new(settings_path: PathBuf, source: Arc<dyn FrameSource>) -> anyhow::Result<Self> {
        let settings = SettingsStore::new(settings_path)?;
        let current = settings.get();

        let api = HttpApi::new(current.api_base_url.clone())
            .context("failed to create API client")?;
        let capture = CaptureScheduler::new(
            Arc::new(api.clone()),
            source,
            CaptureConfig::from(&current),
        );
        let ledger = NutritionLedger::new(Arc::new(api.clone()));

        log::info!("Platewise core ready (API at {})", api.base_url());

        Ok(Self {
            api,
            capture,
            ledger,
            settings,
        })
    }

    /// Dashboard for the current ledger contents using the configured goal.
    pub async fn dashboard(&self, range: DateRange) -> NutritionDashboard {
        let goal = self.settings.goal();
        self.ledger.dashboard(&goal, range, chrono::Utc::now()).await
    }

    /// Stop capture and forget the signed-in owner.
    pub async fn shutdown(&self) {
        self.capture.teardown().await;
        self.ledger.set_owner(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFrames;

    #[tokio::test]
    async fn app_state_wires_components_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            dir.path().join("settings.json"),
            Arc::new(StaticFrames::empty()),
        )
        .unwrap();

        let dashboard = state.dashboard(DateRange::Week).await;
        assert_eq!(dashboard.today, NutritionTotals::default());
        assert!(dashboard.trend.is_empty());

        state.shutdown().await;
        state.shutdown().await;
        assert_eq!(state.ledger.owner().await, None);
        assert_eq!(
            state.capture.snapshot().await.status,
            capture::CaptureStatus::Idle
        );
    }
}
