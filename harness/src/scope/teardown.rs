//! Ordered teardown with error and panic capture
//!
//! Steps run strictly in the order they were added. A step that fails or
//! panics is logged and recorded; the remaining steps still run.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::debug;

use crate::error::HarnessResult;
use shared::logging::log_suppressed;
use shared::Component;

/// One teardown step that did not complete cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub step: String,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Outcome of a teardown run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Append the failures of a later teardown
    pub fn merge(&mut self, other: TeardownReport) {
        self.failures.extend(other.failures);
    }
}

pub struct Teardown<'a> {
    component: Component,
    steps: Vec<(String, BoxFuture<'a, HarnessResult<()>>)>,
}

impl<'a> Teardown<'a> {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            steps: Vec::new(),
        }
    }

    /// Add a fallible step
    pub fn step<S, F>(mut self, label: S, step: F) -> Self
    where
        S: Into<String>,
        F: Future<Output = HarnessResult<()>> + Send + 'a,
    {
        self.steps.push((label.into(), step.boxed()));
        self
    }

    /// Add a step that cannot report an error (it may still panic)
    pub fn action<S, F>(self, label: S, action: F) -> Self
    where
        S: Into<String>,
        F: Future<Output = ()> + Send + 'a,
    {
        self.step(label, async move {
            action.await;
            Ok(())
        })
    }

    pub async fn run(self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for (label, step) in self.steps {
            let message = match AssertUnwindSafe(step).catch_unwind().await {
                Ok(Ok(())) => {
                    debug!("Teardown step '{}' done", label);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };

            log_suppressed(&self.component, &label, &message);
            report.failures.push(TeardownFailure { step: label, message });
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
