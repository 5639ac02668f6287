//! Backend seam between the generation client and a concrete service.

use async_trait::async_trait;
use regex::Regex;

use super::request::{CompletionCall, SamplingParameter};
use crate::errors::BackendError;

/// A single-shot completion transport.
///
/// Implementations perform exactly one call and classify its failure; the
/// [`GenerationClient`](super::GenerationClient) owns retries and parameter
/// negotiation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends one call and returns the raw model text.
    async fn send(&self, call: CompletionCall) -> Result<String, BackendError>;
}

/// Classifies a non-success HTTP answer.
///
/// Validation failures that name a parameter the call actually carried are
/// reported as [`BackendError::UnsupportedParameter`]; other client errors
/// are terminal; rate limits, conflicts and server errors are transient.
#[must_use]
pub fn classify_http_failure(status: u16, body: &str, call: &CompletionCall) -> BackendError {
    match status {
        400 | 422 => {
            let offending = offending_parameters(body, call);
            if offending.is_empty() {
                BackendError::rejected(status, body)
            } else {
                BackendError::unsupported(offending, body)
            }
        }
        408 | 409 | 425 | 429 => BackendError::transient_status(status, body),
        s if s >= 500 => BackendError::transient_status(status, body),
        _ => BackendError::rejected(status, body),
    }
}

/// Parameters sent by `call` that `message` names.
#[must_use]
pub fn offending_parameters(message: &str, call: &CompletionCall) -> Vec<SamplingParameter> {
    SamplingParameter::ALL
        .into_iter()
        .filter(|p| call.sends(*p) && mentions(message, p.wire_name()))
        .collect()
}

fn mentions(message: &str, name: &str) -> bool {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
        .map(|re| re.is_match(message))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationRequest;
    use std::time::Duration;

    fn full_call() -> CompletionCall {
        GenerationRequest::new("p")
            .with_temperature(0.2)
            .structured()
            .to_call(Duration::from_secs(1))
    }

    #[test]
    fn test_bad_request_naming_temperature() {
        let err = classify_http_failure(
            400,
            "Unsupported value: 'temperature' does not support 0.2 with this model.",
            &full_call(),
        );
        assert_eq!(
            err,
            BackendError::unsupported(
                vec![SamplingParameter::Temperature],
                "Unsupported value: 'temperature' does not support 0.2 with this model."
            )
        );
    }

    #[test]
    fn test_bad_request_naming_unsent_parameter_is_rejection() {
        let call = GenerationRequest::new("p").to_call(Duration::from_secs(1));
        let err = classify_http_failure(400, "Invalid 'Temperature'", &call);
        assert!(matches!(err, BackendError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_bad_request_naming_both_parameters() {
        let offending = offending_parameters(
            "response_format is not supported; TEMPERATURE must be 1",
            &full_call(),
        );
        assert_eq!(
            offending,
            vec![SamplingParameter::Temperature, SamplingParameter::ResponseFormat]
        );
    }

    #[test]
    fn test_status_classes() {
        let call = full_call();
        assert!(classify_http_failure(429, "slow down", &call).is_transient());
        assert!(classify_http_failure(503, "overloaded", &call).is_transient());
        assert!(classify_http_failure(408, "timeout", &call).is_transient());
        assert!(!classify_http_failure(401, "bad key", &call).is_transient());
        assert!(!classify_http_failure(404, "no such model", &call).is_transient());
    }

    #[test]
    fn test_word_boundary_matching() {
        assert!(!mentions("temperatures are fine", "temperature"));
        assert!(mentions("bad 'temperature'", "temperature"));
    }
}
