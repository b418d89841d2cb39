//! Running external programs (converters, geometry tools, the docking engine)

use log::{debug, info};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::str::FromStr;
use thiserror::Error;

/// Number of trailing stderr lines kept in a failure message
const STDERR_TAIL_LINES: usize = 20;

/// Errors from launching or running an external tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// An external program plus the arguments always passed before the call-specific
/// ones, e.g. `pythonsh prepare_ligand4.py`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Name used in log and error messages
    pub fn display_name(&self) -> String {
        match self.leading_args.last() {
            Some(script) => Path::new(script)
                .file_name()
                .unwrap_or(script.as_os_str())
                .to_string_lossy()
                .into_owned(),
            None => self.program.to_string_lossy().into_owned(),
        }
    }

    /// Run the tool with `args` appended and wait for it to finish.
    /// `search_path` directories are appended to the child's `PATH`.
    pub fn run<I, S>(&self, args: I, search_path: &[PathBuf]) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args).args(args);

        if !search_path.is_empty() {
            if let Some(path) = extended_path(search_path) {
                command.env("PATH", path);
            }
        }

        info!("Running command: {}", CommandLine(&command));

        let output = command.output().map_err(|source| ToolError::Spawn {
            program: self.display_name(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("[{}] {}", self.display_name(), line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Failed {
                program: self.display_name(),
                status: output.status,
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(())
    }
}

impl FromStr for ExternalTool {
    type Err = String;

    /// Parse a whitespace separated command, e.g. `"pythonsh /opt/mgl/prepare_ligand4.py"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| "empty tool command".to_string())?;
        Ok(Self::with_args(program, parts))
    }
}

impl fmt::Display for ExternalTool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.leading_args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Current `PATH` with `extra` appended
fn extended_path(extra: &[PathBuf]) -> Option<OsString> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let paths = std::env::split_paths(&current).chain(extra.iter().cloned());
    std::env::join_paths(paths).ok()
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Shell-like rendering of a command for logging
struct CommandLine<'a>(&'a Command);

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.get_program().to_string_lossy())?;
        for arg in self.0.get_args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
