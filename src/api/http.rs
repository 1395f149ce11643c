use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::models::{DetectedIngredient, Recipe};

use super::wire::{
    ErrorBody, LiveScanResponse, RecipeListResponse, RecommendRequest, RecommendResponse,
    SaveDetectionsRequest, SaveDetectionsResponse, WireDetection,
};
use super::{BackendError, BackendResult, Recommendations, ScanBackend};

const LIVE_SCAN_PATH: &str = "/api/scan/live-scan";
const SAVE_LIVE_SCAN_PATH: &str = "/api/scan/save-live-scan";
const RECOMMEND_PATH: &str = "/api/recipes/recommend";
const SEARCH_PATH: &str = "/api/recipes/search";

/// `ScanBackend` over the product's REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> BackendResult<Self> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BackendError::InvalidConfig(format!(
                "base url must be http(s): {base_url}"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|value| !value.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<T> {
        let response = self.authorize(request).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|err| err.error)
            .unwrap_or(body);
        return Err(BackendError::Http {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))
}

#[async_trait]
impl ScanBackend for HttpBackend {
    async fn detect_ingredients(
        &self,
        jpeg: Vec<u8>,
        cancel: CancellationToken,
    ) -> BackendResult<Vec<DetectedIngredient>> {
        let part = multipart::Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("image", part);
        let request = self.client.post(self.url(LIVE_SCAN_PATH)).multipart(form);

        let response: LiveScanResponse = tokio::select! {
            result = self.send(request) => result?,
            _ = cancel.cancelled() => return Err(BackendError::Aborted),
        };

        debug!(
            "live scan returned {} detections",
            response.detected_ingredients.len()
        );

        Ok(response
            .detected_ingredients
            .into_iter()
            .map(DetectedIngredient::from)
            .collect())
    }

    async fn save_detections(&self, ingredients: &[DetectedIngredient]) -> BackendResult<usize> {
        let body = SaveDetectionsRequest {
            ingredients: ingredients.iter().map(WireDetection::from).collect(),
        };
        let request = self.client.post(self.url(SAVE_LIVE_SCAN_PATH)).json(&body);
        let response: SaveDetectionsResponse = self.send(request).await?;

        Ok(response.saved_count.unwrap_or(ingredients.len()))
    }

    async fn recommend_recipes(
        &self,
        ingredients: &[DetectedIngredient],
        confidence_threshold: f32,
    ) -> BackendResult<Recommendations> {
        let body = RecommendRequest {
            detected_ingredients: ingredients.iter().map(WireDetection::from).collect(),
            confidence_threshold,
        };
        let request = self.client.post(self.url(RECOMMEND_PATH)).json(&body);
        let response: RecommendResponse = self.send(request).await?;

        let high_confidence_ingredients =
            response.high_confidence(ingredients, confidence_threshold);
        if response.recommendations.is_empty() {
            warn!(
                "no recipes matched {} ingredients",
                high_confidence_ingredients.len()
            );
        }

        Ok(Recommendations {
            recipes: response.recommendations,
            high_confidence_ingredients,
        })
    }

    async fn popular_recipes(&self, limit: usize) -> BackendResult<Vec<Recipe>> {
        let request = self
            .client
            .get(self.url(SEARCH_PATH))
            .query(&[("page", "1".to_string()), ("limit", limit.to_string())]);
        let response: RecipeListResponse = self.send(request).await?;

        Ok(response.recipes)
    }
}
