//! `OpenAI` GPT provider implementation.
//!
//! Also talks to any `OpenAI`-compatible chat completions server (Ollama,
//! vLLM, llama.cpp, LM Studio) when a base URL is configured.

use serde::{Deserialize, Serialize};

use super::{MAX_TOKENS, VisionProvider};
use crate::AiError;
use crate::image::ImageInput;
use crate::retry;

/// Default API root, overridden by `AI_BASE_URL`.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider. `base_url` defaults to
    /// [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new(api_key: Option<String>, model: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAiMessage<'a> {
    System { content: &'a str },
    User { content: Vec<ContentPart<'a>> },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn build_request<'a>(
    model: &'a str,
    system_prompt: &'a str,
    prompt: &'a str,
    image: &ImageInput,
) -> OpenAiRequest<'a> {
    OpenAiRequest {
        model,
        messages: vec![
            OpenAiMessage::System {
                content: system_prompt,
            },
            OpenAiMessage::User {
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                        },
                    },
                ],
            },
        ],
        max_tokens: MAX_TOKENS,
    }
}

fn extract_text(body: &str) -> Result<String, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AiError::Provider {
            message: "No text in OpenAI response".to_string(),
        }),
    }
}

#[async_trait::async_trait]
impl VisionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn describe_image(
        &self,
        system_prompt: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, AiError> {
        let request = build_request(&self.model, system_prompt, prompt, image);
        let url = self.completions_url();

        let resp = retry::send_with_retry(|| {
            let builder = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&request);
            match &self.api_key {
                Some(key) => builder.header("Authorization", format!("Bearer {key}")),
                None => builder,
            }
        })
        .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::PNG_HEADER;

    #[test]
    fn request_sends_system_message_and_data_url_part() {
        let image = ImageInput::from_bytes(PNG_HEADER.to_vec()).unwrap();
        let request = build_request("gpt-test", "system", "classify", &image);
        let json = serde_json::to_value(&request).unwrap();

        let messages = &json["messages"];
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"][0]["type"], "text");
        assert_eq!(messages[1]["content"][0]["text"], "classify");
        assert_eq!(messages[1]["content"][1]["type"], "image_url");
        assert_eq!(
            messages[1]["content"][1]["image_url"]["url"],
            image.to_data_url()
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new(
            None,
            "llava".to_string(),
            Some("http://localhost:11434/v1/".to_string()),
        );
        assert_eq!(
            provider.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );

        let provider = OpenAiProvider::new(Some("sk".to_string()), "gpt-4o".to_string(), None);
        assert_eq!(
            provider.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn extracts_first_choice_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"45% residential"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "45% residential");
    }

    #[test]
    fn missing_content_is_provider_error() {
        assert!(matches!(
            extract_text(r#"{"choices":[]}"#),
            Err(AiError::Provider { .. })
        ));
        assert!(matches!(
            extract_text(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(AiError::Provider { .. })
        ));
    }
}
