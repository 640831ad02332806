use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::AppError;

const ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

#[derive(Serialize)]
struct ImageRequest<'a> {
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

/// Weather-aware city image generation over the image-capable model
/// endpoint. The response carries the image inline as base64.
pub struct ImageGenerator {
    client: reqwest::Client,
    model: String,
    api_key: String,
}

impl ImageGenerator {
    pub fn new(model: &str, api_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(e.to_string()))?;
        Ok(Self {
            client,
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Generates a city scene reflecting the given conditions, returning the
    /// raw image bytes.
    pub async fn generate_city_image(
        &self,
        city_name: &str,
        state_or_region: &str,
        country: &str,
        weather_summary: &str,
        time_of_day: &str,
    ) -> Result<Vec<u8>, AppError> {
        let prompt = build_prompt(city_name, state_or_region, country, weather_summary, time_of_day);
        self.generate_from_prompt(&prompt).await
    }

    pub async fn generate_from_prompt(&self, prompt: &str) -> Result<Vec<u8>, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::ExternalService(
                "no image generation key configured".to_string(),
            ));
        }

        let url = format!("{ENDPOINT_BASE}/{}:generateContent", self.model);
        let request = ImageRequest {
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!(status = status.as_u16(), "Image generation request failed");
            return Err(AppError::ExternalService(format!(
                "image endpoint returned status {status}: {body}"
            )));
        }

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let encoded = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()))
            .map(|inline| inline.data.clone())
            .ok_or_else(|| {
                AppError::ExternalService("response carried no inline image data".to_string())
            })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| AppError::ExternalService(format!("invalid base64 image data: {e}")))?;
        debug!(bytes = bytes.len(), "Decoded generated image");
        Ok(bytes)
    }

    /// Fire-and-forget variant; the callback receives the result from the
    /// spawned task.
    pub fn generate_city_image_async<F>(
        self: &Arc<Self>,
        city_name: &str,
        state_or_region: &str,
        country: &str,
        weather_summary: &str,
        time_of_day: &str,
        callback: F,
    ) where
        F: FnOnce(Result<Vec<u8>, AppError>) + Send + 'static,
    {
        let generator = Arc::clone(self);
        let prompt = build_prompt(city_name, state_or_region, country, weather_summary, time_of_day);
        tokio::spawn(async move {
            let result = generator.generate_from_prompt(&prompt).await;
            callback(result);
        });
    }
}

fn build_prompt(
    city_name: &str,
    state_or_region: &str,
    country: &str,
    weather_summary: &str,
    time_of_day: &str,
) -> String {
    let mut prompt = format!("Create a realistic photo of a city scene in {city_name}");
    if !state_or_region.trim().is_empty() {
        prompt.push_str(&format!(", {state_or_region}"));
    }
    prompt.push_str(&format!(
        ", {country}\n\n\
         The scene should accurately reflect these current conditions:\n\
         - Weather: {weather_summary}\n\
         - Time of day: {time_of_day}\n\n\
         Show recognizable architecture or landmarks where appropriate. \
         No text or watermarks in the image."
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_place_and_conditions() {
        let prompt = build_prompt("Chicago", "IL", "US", "light rain, 55°F", "dusk");
        assert!(prompt.starts_with("Create a realistic photo of a city scene in Chicago, IL, US"));
        assert!(prompt.contains("light rain, 55°F"));
        assert!(prompt.contains("dusk"));
    }

    #[test]
    fn blank_region_is_left_out() {
        let prompt = build_prompt("Reykjavik", "  ", "IS", "snow", "night");
        assert!(prompt.contains("Reykjavik, IS"));
        assert!(!prompt.contains(",  ,"));
    }
}
