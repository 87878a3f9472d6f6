use std::path::Path;

use crate::inspect::{CommentExtractor, FileDescriber, MimeInspector};
use crate::{Policy, ValidationError};

/// Oldest clang major version whose sanitizer symbols we know how to read.
pub const MIN_CLANG_MAJOR: u32 = 14;

const CLANG_MARKER: &str = "clang version ";

/// Gates a file before its symbols are classified.
///
/// The gates run in a fixed order and stop at the first failure:
/// regular file, executable, accepted mime type, ELF or shared object,
/// built by clang >= [`MIN_CLANG_MAJOR`].
pub struct BinaryValidator<'a, T: ?Sized> {
    policy: &'a Policy,
    tools: &'a T,
}

impl<'a, T> BinaryValidator<'a, T>
where
    T: MimeInspector + FileDescriber + CommentExtractor + ?Sized,
{
    pub fn new(policy: &'a Policy, tools: &'a T) -> Self {
        Self { policy, tools }
    }

    pub fn validate(&self, path: &Path) -> Result<(), ValidationError> {
        self.check_path(path)?;
        self.check_binary(path)
    }

    /// Existence and executability gates.
    pub fn check_path(&self, path: &Path) -> Result<(), ValidationError> {
        if !path.is_file() {
            return Err(ValidationError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        if !is_executable(path) {
            return Err(ValidationError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
        log::debug!("{}: regular executable file", path.display());
        Ok(())
    }

    /// Mime type, format and compiler provenance gates.
    pub fn check_binary(&self, path: &Path) -> Result<(), ValidationError> {
        let inspection = |source| ValidationError::Inspection {
            path: path.to_path_buf(),
            source,
        };

        let mime = self.tools.mime_type(path).map_err(inspection)?;
        if !self.policy.accepts_mime(&mime) {
            return Err(ValidationError::UnacceptableMimeType {
                path: path.to_path_buf(),
                mime,
            });
        }

        let description = self.tools.describe(path).map_err(inspection)?;
        if !is_elf_description(&description) {
            return Err(ValidationError::NotElfOrSharedObject {
                path: path.to_path_buf(),
                description,
            });
        }

        let comment = self
            .tools
            .comment_section(path)
            .map_err(|source| ValidationError::ProvenanceUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        match clang_major_version(&comment) {
            Some(major) if major >= MIN_CLANG_MAJOR => {
                log::debug!("{}: built with clang {}", path.display(), major);
                Ok(())
            }
            found => Err(ValidationError::UnsupportedCompilerVersion {
                path: path.to_path_buf(),
                found,
                minimum: MIN_CLANG_MAJOR,
            }),
        }
    }
}

fn is_elf_description(description: &str) -> bool {
    ["ELF", "shared object"]
        .iter()
        .any(|needle| description.contains(needle))
}

/// Major clang version from the first `.comment` line naming clang.
///
/// Everything after the marker other than digits and dots is dropped, so
/// `clang version 15.0.7 (Fedora 15.0.7-2.fc37)` reads as `15`.
pub fn clang_major_version(comment: &str) -> Option<u32> {
    let line = comment.lines().find(|line| line.contains(CLANG_MARKER))?;
    let (_, rest) = line.rsplit_once(CLANG_MARKER)?;
    let version: String = rest
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    version.split('.').next()?.parse().ok()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};
    access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
