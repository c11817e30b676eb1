//! # Utility Functions Module
//!
//! Helpers for invoking external tools: argument building and a single
//! process runner with an optional timeout.

use crate::error::ConvertError;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Converts one argument (string or path) into an owned `OsString`.
///
/// Paths are passed through untouched, so non-UTF-8 file names reach the
/// child process intact.
pub fn os_arg<T: AsRef<OsStr> + ?Sized>(item: &T) -> OsString {
    item.as_ref().to_os_string()
}

/// Converts any iterable of string-like items to `Vec<OsString>`.
///
/// # Example
/// ```rust,ignore
/// let args = to_os_args(["-v", "error", "-show_format"]);
/// ```
pub fn to_os_args<T, I>(items: I) -> Vec<OsString>
where
    T: AsRef<OsStr>,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| os_arg(&item)).collect()
}

/// Macro for building argument vectors from mixed strings and paths.
///
/// # Example
/// ```rust,ignore
/// let args = args!["-i", input_path, "-y"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($crate::utils::os_arg(&$item)),*]
    };
}

/// Run `program` to completion, capturing stdout and stderr.
///
/// With `timeout = None` this blocks until the child exits, however long that
/// takes. When the limit is hit the child is killed and `ConvertError::Timeout`
/// is returned.
pub async fn run_command(
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<Output, ConvertError> {
    debug!("Running {} {:?}", program.display(), args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd.output();
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, output).await.map_err(|_| ConvertError::Timeout {
            program: tool_name(program),
            limit,
        })?,
        None => output.await,
    };

    result.map_err(|e| {
        ConvertError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to execute {}: {}", program.display(), e),
        ))
    })
}

/// Last lines of a tool's stderr, for error messages
pub fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = lines[lines.len().saturating_sub(3)..].join(" | ");
    if tail.is_empty() {
        format!("exit status {}", output.status)
    } else {
        format!("{} ({})", tail, output.status)
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_to_os_args_string_literals() {
        let result = to_os_args(["hello", "world"]);
        assert_eq!(result, vec![OsString::from("hello"), OsString::from("world")]);
    }

    #[test]
    fn test_to_os_args_empty() {
        let result = to_os_args(Vec::<&str>::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_args_macro_mixes_paths_and_strings() {
        let input = PathBuf::from("/media/in put.mov");
        let result = args!["-i", input, "-y", String::from("-c:v")];
        assert_eq!(
            result,
            vec![
                OsString::from("-i"),
                OsString::from("/media/in put.mov"),
                OsString::from("-y"),
                OsString::from("-c:v"),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command(Path::new("/bin/sh"), &args!["-c", "echo hi; echo oops >&2; exit 3"], None)
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
        assert_eq!(output.status.code(), Some(3));
        assert!(stderr_tail(&output).starts_with("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_times_out() {
        let started = std::time::Instant::now();
        let result = run_command(
            Path::new("/bin/sh"),
            &args!["-c", "sleep 5"],
            Some(Duration::from_millis(200)),
        )
        .await;
        assert!(matches!(result, Err(ConvertError::Timeout { ref program, .. }) if program == "sh"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sub_second_timeout_message_keeps_millis() {
        let err = run_command(
            Path::new("/bin/sh"),
            &args!["-c", "sleep 5"],
            Some(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "sh did not finish within 200ms");
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let result = run_command(Path::new("/definitely/not/a/tool"), &[], None).await;
        assert!(matches!(result, Err(ConvertError::Io(_))));
    }
}
