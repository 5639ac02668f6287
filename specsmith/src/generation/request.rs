//! Request and result types for a single generation call.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Temperature the service applies when none is sent.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// How the model is asked to format its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingMode {
    /// Free-form text.
    #[default]
    PlainText,
    /// A single JSON object.
    StructuredDocument,
}

/// An optional request parameter the service may refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingParameter {
    /// Sampling temperature.
    Temperature,
    /// The structured-output flag.
    ResponseFormat,
}

impl SamplingParameter {
    /// All negotiable parameters.
    pub const ALL: [Self; 2] = [Self::Temperature, Self::ResponseFormat];

    /// Name of the parameter on the wire.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::ResponseFormat => "response_format",
        }
    }
}

impl std::fmt::Display for SamplingParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Sampling parameters for a request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Sampling temperature. `None` leaves the service default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A single logical request to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt.
    pub prompt: String,
    /// Optional system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Requested output format.
    #[serde(default)]
    pub mode: DecodingMode,
    /// Sampling parameters.
    #[serde(default)]
    pub sampling: SamplingParams,
}

impl GenerationRequest {
    /// Creates a plain-text request.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            mode: DecodingMode::PlainText,
            sampling: SamplingParams::default(),
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = Some(temperature);
        self
    }

    /// Sets the completion token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = Some(max_tokens);
        self
    }

    /// Asks for a structured (JSON object) answer.
    #[must_use]
    pub fn structured(mut self) -> Self {
        self.mode = DecodingMode::StructuredDocument;
        self
    }

    /// Builds the wire-level call for this request.
    ///
    /// A temperature equal to the service default is not sent: several models
    /// reject any explicit value.
    #[must_use]
    pub fn to_call(&self, timeout: Duration) -> CompletionCall {
        let temperature = self
            .sampling
            .temperature
            .filter(|t| (t - DEFAULT_TEMPERATURE).abs() > f32::EPSILON);

        CompletionCall {
            prompt: self.prompt.clone(),
            system: self.system.clone(),
            temperature,
            max_tokens: self.sampling.max_tokens,
            json_mode: self.mode == DecodingMode::StructuredDocument,
            timeout,
        }
    }
}

/// The exact parameters sent to a backend for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    /// The user prompt.
    pub prompt: String,
    /// Optional system instruction.
    pub system: Option<String>,
    /// Sampling temperature, if sent.
    pub temperature: Option<f32>,
    /// Completion token limit, if sent.
    pub max_tokens: Option<u32>,
    /// Whether the structured-output flag is sent.
    pub json_mode: bool,
    /// Deadline for this call.
    pub timeout: Duration,
}

impl CompletionCall {
    /// Returns true if the call carries the given negotiable parameter.
    #[must_use]
    pub fn sends(&self, parameter: SamplingParameter) -> bool {
        match parameter {
            SamplingParameter::Temperature => self.temperature.is_some(),
            SamplingParameter::ResponseFormat => self.json_mode,
        }
    }

    /// Removes a negotiable parameter from the call.
    pub fn drop_parameter(&mut self, parameter: SamplingParameter) {
        match parameter {
            SamplingParameter::Temperature => self.temperature = None,
            SamplingParameter::ResponseFormat => self.json_mode = false,
        }
    }
}

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Raw model text.
    pub text: String,
    /// Backend calls issued, negotiation reissues included.
    pub attempts: u32,
    /// Parameters removed by negotiation before the call succeeded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_parameters: Vec<SamplingParameter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("prompt")
            .with_system("system")
            .with_temperature(0.2)
            .with_max_tokens(512)
            .structured();

        assert_eq!(request.system.as_deref(), Some("system"));
        assert_eq!(request.sampling.temperature, Some(0.2));
        assert_eq!(request.sampling.max_tokens, Some(512));
        assert_eq!(request.mode, DecodingMode::StructuredDocument);
    }

    #[test]
    fn test_default_temperature_is_not_sent() {
        let call = GenerationRequest::new("p")
            .with_temperature(1.0)
            .to_call(Duration::from_secs(5));
        assert_eq!(call.temperature, None);

        let call = GenerationRequest::new("p")
            .with_temperature(0.3)
            .to_call(Duration::from_secs(5));
        assert_eq!(call.temperature, Some(0.3));
    }

    #[test]
    fn test_call_drop_parameter() {
        let mut call = GenerationRequest::new("p")
            .with_temperature(0.3)
            .structured()
            .to_call(Duration::from_secs(5));

        assert!(call.sends(SamplingParameter::Temperature));
        assert!(call.sends(SamplingParameter::ResponseFormat));

        call.drop_parameter(SamplingParameter::ResponseFormat);
        assert!(!call.sends(SamplingParameter::ResponseFormat));
        assert!(call.sends(SamplingParameter::Temperature));
    }
}
