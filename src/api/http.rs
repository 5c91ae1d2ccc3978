use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{multipart, Client, Response, StatusCode};
use serde_json::Value;

use super::wire::{decode_records, CatalogFood, CreateFoodRequest, FoodQuery, RemoteFoodRecord};
use super::{DetectionService, NutritionStore};
use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::{ImagePayload, NewFoodEntry};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// `reqwest` client for the detection and nutrition endpoints.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> PlatewiseResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|err| PlatewiseError::network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Browse or search the food catalog.
    pub async fn list_foods(&self, query: &FoodQuery) -> PlatewiseResult<Vec<CatalogFood>> {
        let response = self
            .client
            .get(self.url("foods/"))
            .query(&query.query_pairs())
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Vec<CatalogFood>>().await?)
    }
}

#[async_trait]
impl DetectionService for HttpApi {
    async fn detect(&self, image: ImagePayload) -> PlatewiseResult<Value> {
        if image.is_empty() {
            return Err(PlatewiseError::validation("captured frame is empty"));
        }

        let mime = image.mime_type();
        let size = image.bytes.len();
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(mime)?;
        let form = multipart::Form::new().part("image", part);

        debug!("POST detect/ with {size} byte {mime} frame");
        let response = self
            .client
            .post(self.url("detect/"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|err| PlatewiseError::validation(format!("response is not JSON: {err}")))
    }
}

#[async_trait]
impl NutritionStore for HttpApi {
    async fn list(&self, owner_id: &str) -> PlatewiseResult<Vec<RemoteFoodRecord>> {
        let response = self
            .client
            .get(self.url("nutrition/food/"))
            .query(&[("userId", owner_id)])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let values = response.json::<Vec<Value>>().await?;
        Ok(decode_records(values))
    }

    async fn create(
        &self,
        owner_id: &str,
        entry: &NewFoodEntry,
    ) -> PlatewiseResult<RemoteFoodRecord> {
        let response = self
            .client
            .post(self.url("nutrition/food/"))
            .json(&CreateFoodRequest::new(owner_id, entry))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<RemoteFoodRecord>().await?)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> PlatewiseResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("nutrition/food/{id}/")))
            .query(&[("userId", owner_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("store has no entry {id} for {owner_id}; treating delete as done");
            return Ok(());
        }
        ensure_success(response).await.map(|_| ())
    }
}

async fn ensure_success(response: Response) -> PlatewiseResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_from_status(status, &body))
}

/// Build the error for a non-2xx reply: the body's `error` string when it
/// carries one, else the status' reason phrase.
pub(crate) fn error_from_status(status: StatusCode, body: &str) -> PlatewiseError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        });
    PlatewiseError::network(message)
}
