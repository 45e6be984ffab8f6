//! External MOBI/AZW3 to EPUB conversion.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::ConverterConfig;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the converter on `input`, writing `converted.epub` next to it.
///
/// The child is polled against the configured timeout and killed when the
/// deadline passes. Every failure maps to `ConversionToolUnavailable`.
pub fn convert_to_epub(converter: &ConverterConfig, input: &Path) -> Result<PathBuf> {
    let output = input.with_file_name("converted.epub");
    let program = converter.program.display().to_string();

    let mut child = Command::new(&converter.program)
        .arg(input)
        .arg(&output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                format!("{program} not found")
            } else {
                format!("failed to start {program}: {e}")
            };
            Error::ConversionToolUnavailable(reason)
        })?;
    debug!(program = %program, pid = child.id(), "converter started");

    let deadline = Instant::now() + converter.timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::ConversionToolUnavailable(format!(
                        "{program} timed out after {}s",
                        converter.timeout.as_secs()
                    )));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(Error::ConversionToolUnavailable(format!(
                    "failed to wait on {program}: {e}"
                )));
            }
        }
    };

    if !status.success() {
        return Err(Error::ConversionToolUnavailable(format!(
            "{program} exited with {status}"
        )));
    }
    if !output.is_file() {
        return Err(Error::ConversionToolUnavailable(format!(
            "{program} produced no output"
        )));
    }
    info!(program = %program, "converted to EPUB");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("book.mobi");
        std::fs::write(&input, b"x").unwrap();

        let converter = ConverterConfig::new(dir.path().join("no-such-converter"));
        let err = convert_to_epub(&converter, &input).unwrap_err();
        assert!(matches!(err, Error::ConversionToolUnavailable(ref m) if m.contains("not found")));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("book.mobi");
        std::fs::write(&input, b"x").unwrap();

        let err = convert_to_epub(&ConverterConfig::new("false"), &input).unwrap_err();
        assert!(matches!(err, Error::ConversionToolUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("book.mobi");
        std::fs::write(&input, b"x").unwrap();

        // `true` exits cleanly but writes nothing.
        let err = convert_to_epub(&ConverterConfig::new("true"), &input).unwrap_err();
        assert!(matches!(err, Error::ConversionToolUnavailable(ref m) if m.contains("no output")));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let input = dir.path().join("book.mobi");
        std::fs::write(&input, b"x").unwrap();

        let converter = ConverterConfig::new(&script).with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = convert_to_epub(&converter, &input).unwrap_err();
        assert!(matches!(err, Error::ConversionToolUnavailable(ref m) if m.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
