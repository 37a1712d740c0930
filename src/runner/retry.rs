//! Bounded retry with per-attempt input and full history

use log::{info, warn};
use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to pause in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// One finished attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt<T> {
    /// 1-based attempt number
    pub number: u32,
    /// Input the attempt ran with
    pub input: String,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    pub succeeded: bool,
    /// Every attempt in order; never empty
    pub history: Vec<Attempt<T>>,
}

impl<T> RetryOutcome<T> {
    /// The successful attempt, or the last failed one
    pub fn last(&self) -> &Attempt<T> {
        // history always holds at least one attempt
        &self.history[self.history.len() - 1]
    }
}

/// Run `attempt` until `is_success` accepts its value or the policy runs out
///
/// `input_for(n)` derives the input of attempt `n` (1-based). A policy with
/// zero attempts still runs once.
pub async fn run_with_retry<T, I, F, Fut, S>(
    policy: RetryPolicy,
    input_for: I,
    mut attempt: F,
    is_success: S,
) -> RetryOutcome<T>
where
    I: Fn(u32) -> String,
    F: FnMut(u32, String) -> Fut,
    Fut: Future<Output = T>,
    S: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut history = Vec::with_capacity(max_attempts as usize);

    for number in 1..=max_attempts {
        let input = input_for(number);
        info!("Attempt {}/{} with {}", number, max_attempts, input);

        let value = attempt(number, input.clone()).await;
        let ok = is_success(&value);
        history.push(Attempt {
            number,
            input,
            value,
        });

        if ok {
            return RetryOutcome {
                succeeded: true,
                history,
            };
        }
        if number < max_attempts {
            warn!("Attempt {} failed, retrying...", number);
            tokio::time::sleep(policy.delay).await;
        }
    }

    RetryOutcome {
        succeeded: false,
        history,
    }
}
