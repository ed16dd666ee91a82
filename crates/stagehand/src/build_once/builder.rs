//! External build command contract.
//!
//! The coordinator only cares about one signal: did the builder exit
//! successfully. Output is captured so failures can carry stderr text.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Something that can construct the artifact once the marker is held.
pub trait ArtifactBuilder {
    /// Build the artifact at `artifact`. Must not return before the
    /// artifact is fully written; the marker is removed right after.
    ///
    /// # Errors
    ///
    /// Any failure; the coordinator clears the marker and surfaces it.
    fn build(&mut self, artifact: &Path) -> Result<()>;
}

/// Adapter so a closure can act as a builder (in-process builds, tests).
pub struct FnBuilder<F>(pub F);

impl<F> ArtifactBuilder for FnBuilder<F>
where
    F: FnMut(&Path) -> Result<()>,
{
    fn build(&mut self, artifact: &Path) -> Result<()> {
        (self.0)(artifact)
    }
}

/// Builder that runs an external command synchronously, capturing output.
/// A non-zero exit status is the only failure signal consulted.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    /// Create a builder for `program` with no arguments yet.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl ArtifactBuilder for CommandBuilder {
    fn build(&mut self, artifact: &Path) -> Result<()> {
        debug!("running builder: {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| Error::Build {
                artifact: artifact.to_path_buf(),
                detail: format!("failed to spawn {}: {err}", self.program),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::Build {
            artifact: artifact.to_path_buf(),
            detail: match output.status.code() {
                Some(code) => format!("exit code {code}: {}", stderr.trim()),
                None => format!("terminated by signal: {}", stderr.trim()),
            },
        })
    }
}
