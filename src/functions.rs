//! Client for the translation and summary edge functions.
//!
//! Failures are always structured ([`FunctionError`]); nothing is ever
//! embedded in the translated text. Display sites that want the legacy
//! chat-panel rendering derive it with [`translation_failure_text`].

use crate::auth::ResolvedAuth;
use crate::error::{ConfabLinkError, FunctionError, Result};
use crate::models::functions::{
    FunctionErrorBody, SummaryRequest, Summary, TranslateRequest, TranslateResponseBody,
    Translation,
};
use crate::timeouts::ConfabLinkTimeouts;
use std::time::Duration;

/// Handle for invoking edge functions on one Confab backend.
///
/// # Examples
///
/// ```rust,no_run
/// use confab_link::{ConfabLinkClient, TranslateRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ConfabLinkClient::builder()
///     .base_url("http://localhost:3000")
///     .build()?;
///
/// let translation = client
///     .functions()
///     .translate(TranslateRequest::detect("bonjour à tous", "en"))
///     .await?;
/// println!("{}", translation.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FunctionsClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: ResolvedAuth,
    timeout: Duration,
}

impl FunctionsClient {
    pub(crate) fn new(
        base_url: String,
        http_client: reqwest::Client,
        auth: ResolvedAuth,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url,
            http_client,
            auth,
            timeout,
        }
    }

    /// Translate text into `target_language`.
    ///
    /// When the request carries a source language equal to the target, the
    /// original text is returned unchanged without a network call. Detection
    /// happens server-side when the source language is omitted; a detected
    /// source equal to the target likewise comes back untranslated.
    pub async fn translate(&self, request: TranslateRequest) -> Result<Translation> {
        if let Some(source) = &request.source_language {
            if source == &request.target_language {
                return Ok(Translation {
                    text: request.source_text,
                    source_language: request.source_language,
                    translated: false,
                });
            }
        }

        let body = self.invoke("translate", serde_json::to_value(&request)?).await?;
        let parsed: TranslateResponseBody =
            serde_json::from_value(body).map_err(|e| FunctionError::MalformedResponse {
                message: format!("translate response: {}", e),
            })?;

        let source_language = request
            .source_language
            .or(parsed.detected_source_language);
        Ok(Translation {
            text: parsed.translated_text,
            source_language,
            translated: true,
        })
    }

    /// Generate a meeting summary.
    pub async fn summarize(&self, request: SummaryRequest) -> Result<Summary> {
        let body = self.invoke("summary", serde_json::to_value(&request)?).await?;
        serde_json::from_value(body)
            .map_err(|e| {
                FunctionError::MalformedResponse {
                    message: format!("summary response: {}", e),
                }
                .into()
            })
    }

    async fn invoke(&self, function: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/v1/functions/{}", self.base_url, function);
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(self.http_client.post(&url).json(&payload))?;

        let call = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            interpret_function_response(function, status, &body)
        };

        if ConfabLinkTimeouts::is_no_timeout(self.timeout) {
            call.await
        } else {
            tokio::time::timeout(self.timeout, call).await.map_err(|_| {
                ConfabLinkError::TimeoutError(format!(
                    "Function '{}' timed out ({:?})",
                    function, self.timeout
                ))
            })?
        }
    }
}

/// Map an edge-function HTTP response to the error taxonomy.
///
/// - 404 ⇒ the function is not deployed on this backend
/// - 429 ⇒ quota exceeded
/// - other non-success ⇒ generic failure with the body as message
/// - success with empty/undecodable body ⇒ malformed response
/// - success with an in-band error body ⇒ re-classified by its tag
fn interpret_function_response(
    function: &str,
    status: u16,
    body: &str,
) -> Result<serde_json::Value> {
    if status == 404 {
        return Err(FunctionError::NotDeployed {
            function: function.to_string(),
        }
        .into());
    }

    if status == 429 {
        let message = error_body_message(body)
            .unwrap_or_else(|| "Too many requests".to_string());
        return Err(FunctionError::QuotaExceeded { message }.into());
    }

    if !(200..300).contains(&status) {
        let message = error_body_message(body).unwrap_or_else(|| body.to_string());
        return Err(FunctionError::Failed {
            status: Some(status),
            message,
        }
        .into());
    }

    if body.trim().is_empty() {
        return Err(FunctionError::MalformedResponse {
            message: format!("empty response body from '{}'", function),
        }
        .into());
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FunctionError::MalformedResponse {
            message: format!("undecodable response body: {}", e),
        })?;

    // Some function runtimes report failures inside a 200.
    if let Ok(err_body) = serde_json::from_value::<FunctionErrorBody>(value.clone()) {
        let quota = err_body.error_type.as_deref() == Some("quota_exceeded")
            || err_body.status_code == Some(429);
        if quota {
            return Err(FunctionError::QuotaExceeded {
                message: err_body.error,
            }
            .into());
        }
        return Err(FunctionError::Failed {
            status: err_body.status_code,
            message: err_body.error,
        }
        .into());
    }

    Ok(value)
}

fn error_body_message(body: &str) -> Option<String> {
    serde_json::from_str::<FunctionErrorBody>(body)
        .ok()
        .map(|b| b.error)
}

/// Render a translation failure the way the chat panel displays it.
pub fn translation_failure_text(error: &ConfabLinkError) -> String {
    format!("Translation failed: {}", error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrap_function_error(result: Result<serde_json::Value>) -> FunctionError {
        match result.unwrap_err() {
            ConfabLinkError::FunctionError(e) => e,
            other => panic!("expected FunctionError, got {:?}", other),
        }
    }

    #[test]
    fn test_success_body_passes_through() {
        let value =
            interpret_function_response("translate", 200, r#"{"translatedText":"hello"}"#).unwrap();
        assert_eq!(value["translatedText"], "hello");
    }

    #[test]
    fn test_404_is_not_deployed() {
        let err = unwrap_function_error(interpret_function_response("summary", 404, ""));
        assert_eq!(
            err,
            FunctionError::NotDeployed {
                function: "summary".to_string()
            }
        );
    }

    #[test]
    fn test_429_is_quota_exceeded() {
        let err = unwrap_function_error(interpret_function_response(
            "translate",
            429,
            r#"{"error":"monthly quota used up"}"#,
        ));
        assert_eq!(
            err,
            FunctionError::QuotaExceeded {
                message: "monthly quota used up".to_string()
            }
        );
    }

    #[test]
    fn test_tagged_error_in_200_is_quota_exceeded() {
        let err = unwrap_function_error(interpret_function_response(
            "translate",
            200,
            r#"{"error":"quota","errorType":"quota_exceeded"}"#,
        ));
        assert!(matches!(err, FunctionError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let err = unwrap_function_error(interpret_function_response("translate", 200, "  "));
        assert!(matches!(err, FunctionError::MalformedResponse { .. }));
    }

    #[test]
    fn test_undecodable_body_is_malformed() {
        let err =
            unwrap_function_error(interpret_function_response("translate", 200, "<html>oops"));
        assert!(matches!(err, FunctionError::MalformedResponse { .. }));
    }

    #[test]
    fn test_plain_500_is_generic_failure() {
        let err =
            unwrap_function_error(interpret_function_response("summary", 500, "internal error"));
        assert_eq!(
            err,
            FunctionError::Failed {
                status: Some(500),
                message: "internal error".to_string()
            }
        );
    }

    #[test]
    fn test_failure_display_text_has_exact_prefix() {
        let error: ConfabLinkError = FunctionError::Failed {
            status: Some(500),
            message: "backend exploded".to_string(),
        }
        .into();
        let text = translation_failure_text(&error);
        assert!(
            text.starts_with("Translation failed: "),
            "unexpected rendering: {}",
            text
        );
        assert!(text.contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_same_language_skips_network() {
        // Dead port: an actual request would error, proving no I/O happened.
        let functions = FunctionsClient::new(
            "http://127.0.0.1:1".to_string(),
            reqwest::Client::new(),
            crate::auth::ResolvedAuth::Static(crate::auth::AuthProvider::none()),
            Duration::from_secs(1),
        );
        let translation = functions
            .translate(TranslateRequest::new("hola", "es", "es"))
            .await
            .unwrap();
        assert_eq!(translation.text, "hola");
        assert!(!translation.translated);
        assert_eq!(translation.source_language.as_deref(), Some("es"));
    }
}
