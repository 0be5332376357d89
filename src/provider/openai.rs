//! Chat-completion provider backed by the OpenAI API.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

use super::{CompletionProvider, ProviderError};

const PROVIDER: &str = "OpenAI";

/// [`CompletionProvider`] over the OpenAI chat completions endpoint.
///
/// The formatted prompt is sent as a single system message; the model's
/// reply is split into one completion per non-empty line, with surrounding
/// quotes and `Prediction N: ` prefixes stripped.
pub struct OpenAiCompletionProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompletionProvider {
    pub fn new(api_key: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn generate(
        &self,
        prompt_text: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let message = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt_text)
            .build()
            .map_err(|e| ProviderError::Other {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages([message.into()])
            .temperature(temperature)
            .max_completion_tokens(max_tokens)
            .build()
            .map_err(|e| ProviderError::Other {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: PROVIDER,
                reason: "no completion text found in chat completion".to_string(),
            })?;

        debug!(chars = text.len(), "completion text extracted from response");
        Ok(split_completion_lines(&text))
    }
}

/// Splits the raw reply into cleaned completion strings.
pub(crate) fn split_completion_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_prediction_prefix(line))
        .map(|line| line.replace(['"', '\''], ""))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Drops a leading `Prediction <digits>: ` label, if present.
fn strip_prediction_prefix(line: &str) -> &str {
    let Some(rest) = line.strip_prefix("Prediction ") else {
        return line;
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    match rest[digits..].strip_prefix(": ") {
        Some(tail) => tail,
        None => line,
    }
}

fn map_openai_error(error: OpenAIError) -> ProviderError {
    match error {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => ProviderError::http(PROVIDER, status.as_u16(), e.to_string()),
            None => ProviderError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            },
        },
        OpenAIError::ApiError(api) => {
            let status = status_for_api_error(&api);
            ProviderError::http(PROVIDER, status, api.message)
        }
        other => ProviderError::Other {
            provider: PROVIDER,
            message: other.to_string(),
        },
    }
}

/// Best-effort HTTP status for an OpenAI API error body, which does not
/// carry the status code itself.
fn status_for_api_error(api: &ApiError) -> u16 {
    let kind = api.r#type.as_deref().unwrap_or("");
    let message = api.message.to_ascii_lowercase();

    if kind.contains("rate_limit") || kind.contains("insufficient_quota") {
        429
    } else if kind.contains("authentication") || message.contains("api key") {
        401
    } else if message.contains("overloaded") {
        503
    } else if kind.contains("server_error") {
        500
    } else {
        400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_reply_into_nonempty_lines() {
        let lines = split_completion_lines("first\n\nsecond\nthird");
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn strips_quotes_and_prediction_prefixes() {
        let lines = split_completion_lines("Prediction 1: \"hello there\"\nPrediction 2: 'hi'");
        assert_eq!(lines, vec!["hello there", "hi"]);
    }

    #[test]
    fn leaves_unlabelled_lines_alone() {
        let lines = split_completion_lines("Prediction: not numbered\nPrediction x: nope");
        assert_eq!(lines, vec!["Prediction: not numbered", "Prediction x: nope"]);
    }

    #[test]
    fn rate_limit_api_errors_map_to_429() {
        let api = ApiError {
            message: "Rate limit reached".to_string(),
            r#type: Some("rate_limit_exceeded".to_string()),
            param: None,
            code: None,
        };
        assert_eq!(status_for_api_error(&api), 429);
    }

    #[test]
    fn authentication_api_errors_map_to_401() {
        let api = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        };
        assert_eq!(status_for_api_error(&api), 401);
    }
}
