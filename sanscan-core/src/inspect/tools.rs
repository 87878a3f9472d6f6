use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::inspect::{CommentExtractor, FileDescriber, MimeInspector, SymbolExtractor};
use crate::InspectError;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shells out to `file` and `readelf`, killing any call that outlives
/// `timeout`.
#[derive(Debug, Clone)]
pub struct ToolInspector {
    pub timeout: Duration,
    pub file: String,
    pub readelf: String,
}

impl Default for ToolInspector {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolInspector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            file: "file".to_string(),
            readelf: "readelf".to_string(),
        }
    }

    fn run(&self, program: &str, args: &[&str], path: &Path) -> Result<String, InspectError> {
        let tool = format!("{} {}", program, args.join(" "));
        log::debug!("Running `{} {}`", tool, path.display());

        let mut child = Command::new(program)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InspectError::ToolUnavailable {
                tool: tool.clone(),
                source,
            })?;

        // Pipes are drained on their own threads so a chatty tool cannot
        // block on a full pipe while we poll for exit.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!("`{}` timed out after {:?}", tool, self.timeout);
                    return Err(InspectError::ToolTimeout {
                        tool,
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(InspectError::ToolUnavailable { tool, source }),
            }
        };

        let stdout = collect(stdout);
        if !status.success() {
            return Err(InspectError::ToolFailed {
                tool,
                status: status.to_string(),
                stderr: collect(stderr).trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle.and_then(|h| h.join().ok()).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl MimeInspector for ToolInspector {
    fn mime_type(&self, path: &Path) -> Result<String, InspectError> {
        let out = self.run(&self.file, &["--brief", "--mime-type"], path)?;
        Ok(out.trim().to_string())
    }
}

impl FileDescriber for ToolInspector {
    fn describe(&self, path: &Path) -> Result<String, InspectError> {
        let out = self.run(&self.file, &["--brief"], path)?;
        Ok(out.trim().to_string())
    }
}

impl CommentExtractor for ToolInspector {
    fn comment_section(&self, path: &Path) -> Result<String, InspectError> {
        self.run(&self.readelf, &["-p", ".comment"], path)
    }
}

impl SymbolExtractor for ToolInspector {
    fn symbol_table(&self, path: &Path) -> Result<String, InspectError> {
        self.run(&self.readelf, &["-s", "-W"], path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn inspector(file: &str, readelf: &str, timeout: Duration) -> ToolInspector {
        ToolInspector {
            timeout,
            file: file.to_string(),
            readelf: readelf.to_string(),
        }
    }

    #[test]
    fn captures_stdout_of_successful_tool() {
        // `echo --brief --mime-type <path>` stands in for file(1).
        let tools = inspector("echo", "echo", DEFAULT_TOOL_TIMEOUT);
        let out = tools.mime_type(Path::new("/bin/true")).unwrap();
        assert_eq!(out, "--brief --mime-type /bin/true");
    }

    #[test]
    fn non_zero_exit_is_tool_failure() {
        let tools = inspector("false", "false", DEFAULT_TOOL_TIMEOUT);
        let err = tools.comment_section(Path::new("/bin/true")).unwrap_err();
        assert!(matches!(err, InspectError::ToolFailed { .. }), "{err}");
    }

    #[test]
    fn missing_tool_is_unavailable() {
        let tools = inspector(
            "/nonexistent/sanscan-file",
            "/nonexistent/sanscan-readelf",
            DEFAULT_TOOL_TIMEOUT,
        );
        let err = tools.symbol_table(Path::new("/bin/true")).unwrap_err();
        assert!(matches!(err, InspectError::ToolUnavailable { .. }), "{err}");
    }

    #[test]
    fn slow_tool_is_killed() {
        let tools = inspector("file", "readelf", Duration::from_millis(50));
        let started = Instant::now();
        let err = tools.run("sleep", &["5"], Path::new("5")).unwrap_err();
        assert!(matches!(err, InspectError::ToolTimeout { .. }), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
