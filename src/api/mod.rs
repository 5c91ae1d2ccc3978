//! Seams to the remote recognizer and nutrition store.

pub mod http;
pub mod wire;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlatewiseResult;
use crate::models::{ImagePayload, NewFoodEntry};

pub use http::HttpApi;
pub use wire::{CatalogFood, FoodQuery, RemoteFoodRecord};

/// The opaque recognition service behind `POST /detect/`.
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Upload one frame and return the raw response body for normalization.
    async fn detect(&self, image: ImagePayload) -> PlatewiseResult<Value>;
}

/// The opaque persistence behind `/nutrition/food/`, scoped per owner.
#[async_trait]
pub trait NutritionStore: Send + Sync {
    async fn list(&self, owner_id: &str) -> PlatewiseResult<Vec<RemoteFoodRecord>>;

    async fn create(&self, owner_id: &str, entry: &NewFoodEntry)
        -> PlatewiseResult<RemoteFoodRecord>;

    /// Removing an id the store no longer has counts as success.
    async fn delete(&self, owner_id: &str, id: &str) -> PlatewiseResult<()>;
}
