//! Command-line optimiser backends.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::error::{MontageError, Result};

use super::Backend;

/// How often a running tool is polled (and the progress callback ticked).
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const INPUT: &str = "{in}";
const OUTPUT: &str = "{out}";

/// How a tool writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// The tool rewrites the input file itself.
    InPlace,
    /// The tool writes to a separate output file, which replaces the input
    /// only if it is smaller.
    ToFile,
}

/// An optimiser provided by an external command.
///
/// Arguments may contain `{in}` and `{out}`, which are replaced with the
/// file being optimised and (for `ToFile` tools) the temporary output.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    command: String,
    args: Vec<String>,
    mode: ToolMode,
}

impl ExternalTool {
    pub fn new(command: impl Into<String>, args: &[&str], mode: ToolMode) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            mode,
        }
    }

    pub fn in_place(command: impl Into<String>, args: &[&str]) -> Self {
        Self::new(command, args, ToolMode::InPlace)
    }

    pub fn to_file(command: impl Into<String>, args: &[&str]) -> Self {
        Self::new(command, args, ToolMode::ToFile)
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    fn arguments(&self, input: &Path, output: Option<&Path>) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match (arg.as_str(), output) {
                (INPUT, _) => input.as_os_str().to_owned(),
                (OUTPUT, Some(output)) => output.as_os_str().to_owned(),
                _ => OsString::from(arg),
            })
            .collect()
    }

    fn execute(&self, input: &Path, output: Option<&Path>, tick: &mut dyn FnMut()) -> Result<()> {
        let mut child = Command::new(&self.command)
            .args(self.arguments(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.failed(format!("could not start: {}", e)))?;

        let status = wait(&mut child, tick).map_err(|e| self.failed(e.to_string()))?;
        if !status.success() {
            return Err(self.failed(status.to_string()));
        }
        Ok(())
    }

    fn failed(&self, message: String) -> MontageError {
        MontageError::Tool {
            tool: self.command.clone(),
            message,
        }
    }
}

impl Backend for ExternalTool {
    fn name(&self) -> &str {
        &self.command
    }

    fn is_supported(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    fn run(&self, path: &Path, tick: &mut dyn FnMut()) -> Result<u64> {
        let before = file_size(path)?;

        match self.mode {
            ToolMode::InPlace => {
                self.execute(path, None, tick)?;
                let after = file_size(path)?;
                Ok(before.saturating_sub(after))
            }
            ToolMode::ToFile => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
                let temp = tempfile::Builder::new()
                    .prefix(".montage-")
                    .suffix(".png")
                    .tempfile_in(dir)
                    .map_err(|e| MontageError::write_failed(dir, e))?;

                self.execute(path, Some(temp.path()), tick)?;

                let after = file_size(temp.path())?;
                if after == 0 || after >= before {
                    return Ok(0);
                }

                temp.persist(path).map_err(|e| MontageError::write_failed(path, e.error))?;
                Ok(before - after)
            }
        }
    }
}

/// The optimisers montage knows about, highest priority first.
pub fn default_tools() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(ExternalTool::to_file("pngout", &["-q", "-y", INPUT, OUTPUT])),
        Box::new(ExternalTool::in_place("optipng", &["-quiet", "-o7", INPUT])),
        Box::new(ExternalTool::in_place("advpng", &["-z", "-4", "-q", INPUT])),
        Box::new(ExternalTool::to_file("pngcrush", &["-q", INPUT, OUTPUT])),
    ]
}

/// Wait for `child`, calling `tick` every `POLL_INTERVAL` until it exits.
fn wait(child: &mut Child, tick: &mut dyn FnMut()) -> std::io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        tick();
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path).map(|m| m.len()).map_err(|e| MontageError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read file size: {}", e),
    })
}
