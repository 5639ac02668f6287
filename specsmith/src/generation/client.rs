//! The generation client: retries and parameter negotiation over a backend.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::CompletionBackend;
use super::request::{GenerationRequest, GenerationResult};
use super::retry::{RetryConfig, RetryState};
use crate::errors::{BackendError, GenerationFailure};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Resilient single-request client.
///
/// Cheap to clone and holds no per-call state, so one instance can be shared
/// by every worker of a batch.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn CompletionBackend>,
    retry: RetryConfig,
    timeout: Duration,
}

impl GenerationClient {
    /// Creates a client over a backend with default retry and timeout.
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Builds an OpenAI-compatible client from application config.
    #[cfg(feature = "openai")]
    pub fn from_config(
        config: &crate::config::AppConfig,
    ) -> Result<Self, crate::errors::SpecsmithError> {
        let backend = super::openai::OpenAiBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend))
            .with_retry(config.retry.clone())
            .with_timeout(config.request_timeout()))
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Convenience form of [`generate`](Self::generate) returning only the text.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: Option<f32>,
        structured: bool,
    ) -> Result<String, GenerationFailure> {
        let mut request = GenerationRequest::new(prompt);
        if let Some(system) = system {
            request = request.with_system(system);
        }
        if let Some(temperature) = temperature {
            request = request.with_temperature(temperature);
        }
        if structured {
            request = request.structured();
        }
        self.generate(&request).await.map(|result| result.text)
    }

    /// Issues a request, retrying transient failures and negotiating away
    /// refused parameters.
    ///
    /// Negotiation happens at most once per request, reissues immediately and
    /// does not count against the backoff ceiling.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationFailure> {
        let mut call = request.to_call(self.timeout);
        let mut state = RetryState::new();
        let mut attempts = 0u32;
        let mut negotiated = false;
        let mut dropped_parameters = Vec::new();

        loop {
            attempts += 1;
            debug!(attempt = attempts, json_mode = call.json_mode, "Issuing generation call");

            let outcome = match tokio::time::timeout(self.timeout, self.backend.send(call.clone()))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(BackendError::Timeout {
                    duration: self.timeout,
                }),
            };

            let error = match outcome {
                Ok(text) => {
                    return Ok(GenerationResult {
                        text,
                        attempts,
                        dropped_parameters,
                    })
                }
                Err(error) => error,
            };

            if let BackendError::UnsupportedParameter { parameters, .. } = &error {
                let offending: Vec<_> = parameters
                    .iter()
                    .copied()
                    .filter(|p| call.sends(*p))
                    .collect();

                if negotiated || offending.is_empty() {
                    return Err(GenerationFailure::new(attempts, error));
                }

                warn!(dropped = ?offending, "Service refused parameters, reissuing without them");
                for parameter in &offending {
                    call.drop_parameter(*parameter);
                }
                dropped_parameters.extend(offending);
                negotiated = true;
                continue;
            }

            if error.is_transient() && state.can_retry(&self.retry) {
                let delay = state.next_delay(&self.retry);
                warn!(
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Transient generation failure, will retry"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(GenerationFailure::new(attempts, error));
        }
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::backend::MockCompletionBackend;
    use crate::generation::SamplingParameter;
    use crate::testing::ScriptedBackend;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn client(backend: MockCompletionBackend, max_attempts: u32) -> GenerationClient {
        GenerationClient::new(Arc::new(backend)).with_retry(RetryConfig::immediate(max_attempts))
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_send()
            .times(1)
            .returning(|_| Ok("hello".to_string()));

        let result = client(backend, 4)
            .generate(&GenerationRequest::new("p"))
            .await
            .unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.attempts, 1);
        assert!(result.dropped_parameters.is_empty());
    }

    #[tokio::test]
    async fn test_negotiates_unsupported_temperature() {
        let mut backend = MockCompletionBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|call| call.temperature == Some(0.2) && call.json_mode)
            .returning(|_| {
                Err(BackendError::unsupported(
                    vec![SamplingParameter::Temperature],
                    "'temperature' is not supported with this model",
                ))
            });
        backend
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|call| call.temperature.is_none() && call.json_mode)
            .returning(|_| Ok("{}".to_string()));

        // A ceiling of one attempt proves negotiation sits outside the backoff budget.
        let text = client(backend, 1)
            .complete("p", Some("s"), Some(0.2), true)
            .await
            .unwrap();

        assert_eq!(text, "{}");
    }

    #[tokio::test]
    async fn test_negotiation_is_one_shot() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_send().times(2).returning(|_| {
            Err(BackendError::unsupported(
                vec![SamplingParameter::Temperature, SamplingParameter::ResponseFormat],
                "nope",
            ))
        });

        let failure = client(backend, 4)
            .generate(&GenerationRequest::new("p").with_temperature(0.5).structured())
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 2);
        assert!(matches!(
            failure.last_error,
            BackendError::UnsupportedParameter { .. }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_parameter_not_sent_is_terminal() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_send().times(1).returning(|_| {
            Err(BackendError::unsupported(
                vec![SamplingParameter::Temperature],
                "temperature",
            ))
        });

        let failure = client(backend, 4)
            .generate(&GenerationRequest::new("p"))
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let mut backend = MockCompletionBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BackendError::transient_status(502, "bad gateway")));
        backend
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("done".to_string()));

        let result = client(backend, 4)
            .generate(&GenerationRequest::new("p"))
            .await
            .unwrap();

        assert_eq!(result.text, "done");
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_retry_ceiling_surfaces_last_error() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_send()
            .times(4)
            .returning(|_| Err(BackendError::transient("connection reset")));

        let failure = client(backend, 4)
            .generate(&GenerationRequest::new("p"))
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 4);
        assert_eq!(failure.last_error, BackendError::transient("connection reset"));
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_send()
            .times(1)
            .returning(|_| Err(BackendError::rejected(401, "invalid api key")));

        let failure = client(backend, 4)
            .generate(&GenerationRequest::new("p"))
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_default_response("late")
                .with_delay(Duration::from_millis(200)),
        );
        let client = GenerationClient::new(backend.clone())
            .with_retry(RetryConfig::immediate(2))
            .with_timeout(Duration::from_millis(10));

        let failure = client.generate(&GenerationRequest::new("p")).await.unwrap_err();

        assert_eq!(failure.attempts, 2);
        assert!(matches!(failure.last_error, BackendError::Timeout { .. }));
        assert_eq!(backend.call_count(), 2);
    }
}
