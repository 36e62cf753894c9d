//! Running external command-line tools (ffmpeg, tesseract, pdftoppm, soffice)

use crate::error::{EdutopiaError, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Run `program` with `args`, returning stdout on success.
///
/// A missing binary, a non-zero exit or exceeding `limit` all map to
/// `ExternalTool` errors carrying stderr.
pub(crate) async fn run<I, S>(program: &str, args: I, limit: Duration) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!("Running {:?}", cmd.as_std());

    let output = match timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EdutopiaError::tool(program, "command not found"));
        }
        Ok(Err(e)) => return Err(EdutopiaError::tool(program, e.to_string())),
        Err(_) => {
            return Err(EdutopiaError::tool(
                program,
                format!("timed out after {} seconds", limit.as_secs()),
            ))
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EdutopiaError::tool(
            program,
            format!(
                "exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ),
        ));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_external_tool_error() {
        let err = run(
            "edutopia-definitely-missing-binary",
            ["--version"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            EdutopiaError::ExternalTool { tool, message } => {
                assert_eq!(tool, "edutopia-definitely-missing-binary");
                assert_eq!(message, "command not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
