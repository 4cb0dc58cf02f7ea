use std::process::Stdio;

use crate::gcloud::GcloudError;

/// Abstraction over gcloud CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait GcloudExecutor: Send + Sync {
    /// Execute a gcloud command and capture stdout, trimmed.
    async fn exec(&self, args: &[String]) -> Result<String, GcloudError>;

    /// Execute a gcloud command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), GcloudError>;
}

/// Real gcloud CLI executor.
pub struct RealExecutor;

impl GcloudExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, GcloudError> {
        tracing::debug!(?args, "gcloud");

        let output = tokio::process::Command::new("gcloud")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GcloudError::NotInstalled { source: e })?;

        if output.status.success() {
            stdout_text(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(GcloudError::CommandFailed {
                args: args.to_vec(),
                stderr,
            })
        }
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), GcloudError> {
        tracing::debug!(?args, "gcloud (streaming)");

        let status = tokio::process::Command::new("gcloud")
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| GcloudError::NotInstalled { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(GcloudError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }
}

fn stdout_text(stdout: Vec<u8>) -> Result<String, GcloudError> {
    let text = String::from_utf8(stdout).map_err(|e| GcloudError::InvalidUtf8 { source: e })?;
    Ok(text.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_is_trimmed() {
        assert_eq!(stdout_text(b"  test-project\n".to_vec()).unwrap(), "test-project");
        assert_eq!(stdout_text(b"\n".to_vec()).unwrap(), "");
    }

    #[test]
    fn stdout_must_be_utf8() {
        assert!(matches!(
            stdout_text(vec![0xff, 0xfe]),
            Err(GcloudError::InvalidUtf8 { .. })
        ));
    }
}
