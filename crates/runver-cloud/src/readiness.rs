//! Bounded polling until a cloud resource reports ready.

use std::time::Duration;

use serde_json::Value;

use crate::client::GcloudClient;
use crate::executor::GcloudExecutor;
use crate::gcloud::GcloudError;

/// Resource types that can be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A Cloud Run service; ready once it reports a URL.
    Service,
    /// A Secret Manager secret; ready once it can be described.
    Secret,
}

impl ResourceKind {
    fn describe_command(self) -> &'static [&'static str] {
        match self {
            Self::Service => &["run", "services", "describe"],
            Self::Secret => &["secrets", "describe"],
        }
    }

    /// Apply the readiness predicate to a `--format=json` describe response.
    pub fn is_ready(self, response: &str) -> bool {
        let Ok(doc) = serde_json::from_str::<Value>(response) else {
            return false;
        };
        let field = match self {
            Self::Service => doc.pointer("/status/url"),
            Self::Secret => doc.get("name"),
        };
        field
            .and_then(Value::as_str)
            .is_some_and(|value| !value.is_empty())
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service => f.write_str("service"),
            Self::Secret => f.write_str("secret"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(2000),
        }
    }
}

impl<E: GcloudExecutor> GcloudClient<E> {
    /// Poll `kind`/`name` with the client's [`PollPolicy`] until it is ready.
    ///
    /// `params` become `--key=value` flags on the describe command. A failed
    /// describe counts as a failed attempt.
    pub async fn wait_for_ready(
        &self,
        kind: ResourceKind,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<(), ReadinessError> {
        let mut cmd: Vec<String> = kind
            .describe_command()
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        cmd.push(name.to_owned());
        cmd.extend(params.iter().map(|(key, value)| format!("--{key}={value}")));
        cmd.push("--format=json".to_owned());

        let mut last_error = None;
        for attempt in 1..=self.poll.max_attempts {
            match self.executor.exec(&cmd).await {
                Ok(response) if kind.is_ready(&response) => {
                    tracing::debug!(%kind, resource = name, attempt, "resource ready");
                    return Ok(());
                }
                Ok(_) => {
                    tracing::debug!(%kind, resource = name, attempt, "resource not ready yet");
                    last_error = None;
                }
                Err(e) => {
                    tracing::debug!(%kind, resource = name, attempt, error = %e, "describe failed");
                    last_error = Some(e);
                }
            }

            if attempt < self.poll.max_attempts {
                tokio::time::sleep(self.poll.delay).await;
            }
        }

        Err(ReadinessError::ResourceNotReady {
            kind,
            name: name.to_owned(),
            attempts: self.poll.max_attempts,
            last_error,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("{kind} {name} not ready after {attempts} attempts")]
    ResourceNotReady {
        kind: ResourceKind,
        name: String,
        attempts: u32,
        #[source]
        last_error: Option<GcloudError>,
    },
}

impl ReadinessError {
    /// gcloud failure of the final attempt, if the describe itself failed.
    pub fn last_error(&self) -> Option<&GcloudError> {
        match self {
            Self::ResourceNotReady { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Whether the final attempt failed because the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.last_error().is_some_and(GcloudError::is_not_found)
    }
}
