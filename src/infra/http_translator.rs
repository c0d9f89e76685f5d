use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::app::ports::Translator;
use crate::error::TranslateError;

/// Client for a LibreTranslate-compatible `/translate` endpoint.
pub struct HttpTranslator {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

impl HttpTranslator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            timeout,
            client: Self::build_client(timeout)?,
        })
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }

    fn request<'a>(&'a self, text: &'a str, source: &'a str, target: &'a str) -> TranslateRequest<'a> {
        TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    fn name(&self) -> &str {
        "http"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&self.request(text, source_lang, target_lang))
            .send()
            .await?;
        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<TranslateResponse>(&raw)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(raw);
            return Err(TranslateError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let body: TranslateResponse = serde_json::from_str(&raw)
            .map_err(|e| TranslateError::Engine(format!("malformed response: {e}")))?;
        match body.translated_text {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(TranslateError::EmptyResponse),
        }
    }

    async fn reset(&mut self) -> Result<(), TranslateError> {
        debug!(endpoint = %self.endpoint, "rebuilding HTTP client");
        self.client = Self::build_client(self.timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let translator = HttpTranslator::new(
            "http://localhost:5000/translate",
            Some("secret".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        let body = serde_json::to_value(translator.request("Haus", "de", "tr")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "q": "Haus", "source": "de", "target": "tr", "format": "text", "api_key": "secret"
            })
        );
    }

    #[test]
    fn test_api_key_omitted_when_absent() {
        let translator =
            HttpTranslator::new("http://localhost:5000/translate", None, Duration::from_secs(5)).unwrap();
        let body = serde_json::to_value(translator.request("Haus", "de", "tr")).unwrap();
        assert!(body.get("api_key").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let ok: TranslateResponse = serde_json::from_str(r#"{"translatedText":"Ev"}"#).unwrap();
        assert_eq!(ok.translated_text.as_deref(), Some("Ev"));
        let err: TranslateResponse = serde_json::from_str(r#"{"error":"Invalid API key"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("Invalid API key"));
    }
}
