//! Scripted completion backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::BackendError;
use crate::generation::{CompletionBackend, CompletionCall};

type Reply = Result<String, BackendError>;

struct Rule {
    needle: String,
    queued: Mutex<VecDeque<Reply>>,
    steady: Reply,
}

/// A backend that answers from a script instead of a service.
///
/// Rules match on a substring of the prompt and are tried in registration
/// order; unmatched prompts get the default reply. Every call is recorded.
pub struct ScriptedBackend {
    rules: Vec<Rule>,
    default: Reply,
    delay: Duration,
    max_random_delay: Duration,
    calls: AtomicUsize,
    history: Mutex<Vec<CompletionCall>>,
}

impl ScriptedBackend {
    /// Creates a backend that answers every prompt with an empty string.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: Ok(String::new()),
            delay: Duration::ZERO,
            max_random_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Sets the reply for unmatched prompts.
    #[must_use]
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default = Ok(text.into());
        self
    }

    /// Makes unmatched prompts fail.
    #[must_use]
    pub fn with_default_error(mut self, error: BackendError) -> Self {
        self.default = Err(error);
        self
    }

    /// Answers prompts containing `needle` with `text`.
    #[must_use]
    pub fn on_prompt(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_rule(needle, Vec::new(), Ok(text.into()))
    }

    /// Fails prompts containing `needle` with `error`.
    #[must_use]
    pub fn fail_on_prompt(self, needle: impl Into<String>, error: BackendError) -> Self {
        self.with_rule(needle, Vec::new(), Err(error))
    }

    /// Plays `replies` in order for prompts containing `needle`, then repeats
    /// the last one.
    #[must_use]
    pub fn with_sequence(self, needle: impl Into<String>, mut replies: Vec<Reply>) -> Self {
        let steady = replies.pop().unwrap_or_else(|| Ok(String::new()));
        self.with_rule(needle, replies, steady)
    }

    fn with_rule(mut self, needle: impl Into<String>, queued: Vec<Reply>, steady: Reply) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            queued: Mutex::new(queued.into()),
            steady,
        });
        self
    }

    /// Adds a fixed delay to every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Adds a random delay of up to `max` to every call.
    #[must_use]
    pub fn with_random_delay(mut self, max: Duration) -> Self {
        self.max_random_delay = max;
        self
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every call received, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.history.lock().clone()
    }

    /// Number of calls whose prompt contained `needle`.
    #[must_use]
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.history
            .lock()
            .iter()
            .filter(|call| call.prompt.contains(needle))
            .count()
    }

    fn reply_for(&self, prompt: &str) -> Reply {
        for rule in &self.rules {
            if prompt.contains(&rule.needle) {
                return rule
                    .queued
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| rule.steady.clone());
            }
        }
        self.default.clone()
    }

    fn pause(&self) -> Duration {
        let jitter = if self.max_random_delay.is_zero() {
            Duration::ZERO
        } else {
            let max = u64::try_from(self.max_random_delay.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(rand::thread_rng().gen_range(0..=max))
        };
        self.delay + jitter
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("rules", &self.rules.len())
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn send(&self, call: CompletionCall) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply_for(&call.prompt);
        self.history.lock().push(call);

        let pause = self.pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationRequest;

    fn call(prompt: &str) -> CompletionCall {
        GenerationRequest::new(prompt).to_call(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_rules_and_default() {
        let backend = ScriptedBackend::new()
            .with_default_response("default")
            .on_prompt("alpha", "A")
            .fail_on_prompt("beta", BackendError::rejected(400, "no"));

        assert_eq!(backend.send(call("x alpha y")).await.unwrap(), "A");
        assert!(backend.send(call("beta")).await.is_err());
        assert_eq!(backend.send(call("other")).await.unwrap(), "default");
        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.calls_matching("alpha"), 1);
    }

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let backend = ScriptedBackend::new().with_sequence(
            "p",
            vec![Err(BackendError::transient("reset")), Ok("one".into()), Ok("two".into())],
        );

        assert!(backend.send(call("p")).await.is_err());
        assert_eq!(backend.send(call("p")).await.unwrap(), "one");
        assert_eq!(backend.send(call("p")).await.unwrap(), "two");
        assert_eq!(backend.send(call("p")).await.unwrap(), "two");
    }
}
