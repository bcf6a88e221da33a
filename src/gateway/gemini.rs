use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::gateway::{GatewayError, GenerationGateway, GenerationRequest};
use crate::state::data::GeneratedImage;
use crate::state::features::FeatureConfiguration;

pub struct GeminiGateway {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GatewayError> {
        let prompt = build_prompt(&request.features);

        let body = json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.source.mime_type,
                            "data": request.source.base64,
                        }
                    },
                    { "text": prompt },
                ]
            }],
            "generationConfig": {
                "seed": request.seed,
                "responseModalities": ["IMAGE"],
            },
        });

        debug!(model = %self.model, seed = request.seed, "Calling generation service");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", request.credential.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status,
                message: api_error_message(&text),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let image = first_image(parsed).ok_or(GatewayError::EmptyResponse)?;

        Ok(GeneratedImage {
            id: format!("{}-{}", chrono::Utc::now().timestamp_millis(), request.seed),
            base64: image.data,
            mime_type: image.mime_type,
            prompt_used: prompt,
        })
    }
}

fn first_image(response: GenerateResponse) -> Option<InlineData> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.inline_data)
}

/// Pull `error.message` out of an error body, or fall back to the raw text
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Compose the instruction sent alongside the source portrait
pub fn build_prompt(features: &FeatureConfiguration) -> String {
    let mut prompt = String::from(
        "Create a professional headshot of the person in the attached photo. \
         Preserve their identity, facial structure and skin tone exactly.\n",
    );

    for (axis, value) in features.entries() {
        prompt.push_str(&format!("{}: {}\n", axis.label(), value.trim()));
    }

    prompt.push_str("Output a single photorealistic square image.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::features::FeatureAxis;

    #[test]
    fn test_prompt_mentions_every_axis() {
        let mut features = FeatureConfiguration::default();
        features.set(FeatureAxis::Background, "  City skyline at dusk ");

        let prompt = build_prompt(&features);

        for axis in FeatureAxis::ALL {
            assert!(prompt.contains(&format!("{}: ", axis.label())));
        }
        assert!(prompt.contains("Background: City skyline at dusk\n"));
    }

    #[test]
    fn test_first_image_skips_text_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"Here you go"},
                {"inlineData":{"mimeType":"image/png","data":"aW1n"}}
            ]}}]}"#,
        )
        .unwrap();

        let image = first_image(response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "aW1n");
    }

    #[test]
    fn test_no_candidates_means_no_image() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(first_image(response).is_none());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid."}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message(" upstream timeout "), "upstream timeout");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let gateway = GeminiGateway::new(&GatewayConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            model: "image-model".to_string(),
        });

        assert_eq!(
            gateway.endpoint(),
            "https://example.test/v1beta/models/image-model:generateContent"
        );
    }
}
