use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while loading or persisting the sanitizer policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to access policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy file {path} couldn't be parsed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("policy file {path} is incorrect ({reason}). Use '--reset' to restore the default policy.")]
    Shape { path: PathBuf, reason: String },
}

/// A binary-integrity gate rejected the file.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file {path} does not exist or is not a file. Use '--force' if you are sure that's a bug or you know what you're doing.")]
    NotAFile { path: PathBuf },

    #[error("file {path} is not an executable. Use '--force' if you are sure that's a bug or you know what you're doing.")]
    NotExecutable { path: PathBuf },

    #[error("file {path} has unacceptable mime type '{mime}'. Change the policy file or use '--force' if you know what you are doing.")]
    UnacceptableMimeType { path: PathBuf, mime: String },

    #[error("file {path} is not an ELF binary or shared library ({description}). Use '--force' if you are sure that's a bug or you know what you're doing.")]
    NotElfOrSharedObject { path: PathBuf, description: String },

    #[error("could not read version information from file {path}: {source}. Use '--force' if you are sure that's a bug or you know what you're doing.")]
    ProvenanceUnreadable {
        path: PathBuf,
        #[source]
        source: InspectError,
    },

    #[error("file {path} was not built with clang version {minimum} or higher. Use '--force' if you are sure that's a bug or you know what you're doing.")]
    UnsupportedCompilerVersion {
        path: PathBuf,
        found: Option<u32>,
        minimum: u32,
    },

    #[error("could not inspect file {path}: {source}. Use '--force' if you are sure that's a bug or you know what you're doing.")]
    Inspection {
        path: PathBuf,
        #[source]
        source: InspectError,
    },
}

/// The symbol table needed for classification could not be produced.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("could not read the symbol table of {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: InspectError,
    },
}

/// Failure reported by one of the binary-introspection collaborators.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed binary {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },

    #[error("{path} is not an ELF object")]
    NotElf { path: PathBuf },

    #[error("cannot run `{tool}`: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{tool}` failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("`{tool}` did not finish within {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },
}

impl InspectError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
