use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PolicyError, SanitizerKind};

/// Default location of the policy file, relative to the working directory.
pub const DEFAULT_POLICY_PATH: &str = "config.yaml";

/// On-disk layout of the policy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub sanitizer_prefixes: PrefixTable,
    #[serde(rename = "mime-types")]
    pub mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixTable {
    pub asan: Vec<String>,
    pub tsan: Vec<String>,
    pub msan: Vec<String>,
}

/// Acceptance criteria for binaries and the symbol prefixes that identify
/// each sanitizer.
///
/// Every [`SanitizerKind`] has a non-empty prefix list and at least one mime
/// type is accepted; both are checked whenever a `Policy` is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    mime_types: Vec<String>,
    prefixes: BTreeMap<SanitizerKind, Vec<String>>,
}

impl Policy {
    pub fn new<M, P, L>(mime_types: M, prefixes: P) -> Result<Self, String>
    where
        M: IntoIterator,
        M::Item: Into<String>,
        P: IntoIterator<Item = (SanitizerKind, L)>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let mime_types: Vec<String> = mime_types.into_iter().map(Into::into).collect();
        let prefixes: BTreeMap<SanitizerKind, Vec<String>> = prefixes
            .into_iter()
            .map(|(kind, list)| (kind, list.into_iter().map(Into::into).collect()))
            .collect();

        if mime_types.is_empty() {
            return Err("`mime-types` must not be empty".to_string());
        }
        for kind in SanitizerKind::ALL {
            match prefixes.get(&kind) {
                Some(list) if !list.is_empty() => {}
                _ => {
                    return Err(format!(
                        "`sanitizer_prefixes.{}` must not be empty",
                        kind.key()
                    ))
                }
            }
        }

        Ok(Self {
            mime_types,
            prefixes,
        })
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    pub fn prefixes(&self, kind: SanitizerKind) -> &[String] {
        self.prefixes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Prefix match, not equality: `application/x-sharedlib` accepts
    /// `application/x-sharedlib; charset=binary`.
    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|t| mime.starts_with(t.as_str()))
    }

    /// Reads and validates the policy stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => PolicyError::NotFound {
                path: path.to_path_buf(),
            },
            _ => PolicyError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Self::from_yaml(&text, path)
    }

    /// Loads the policy, creating the default one first if `path` is missing.
    ///
    /// Only a missing file is recovered from; malformed content is an error.
    pub fn load_or_initialize<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(PolicyError::NotFound { .. }) => {
                log::info!("Policy file is not found. Creating {}...", path.display());
                Self::reset(path)
            }
            other => other,
        }
    }

    /// Overwrites `path` with the default policy and returns it as reloaded
    /// from disk.
    pub fn reset<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        log::debug!("Writing default policy to {}", path.display());
        Self::default().save(path)?;
        Self::load(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PolicyError> {
        let path = path.as_ref();
        let text = serde_yaml::to_string(&self.to_document()).map_err(|source| {
            PolicyError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, text).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_document(&self) -> PolicyDocument {
        let list = |kind| self.prefixes(kind).to_vec();
        PolicyDocument {
            sanitizer_prefixes: PrefixTable {
                asan: list(SanitizerKind::Address),
                tsan: list(SanitizerKind::Thread),
                msan: list(SanitizerKind::Memory),
            },
            mime_types: self.mime_types.clone(),
        }
    }

    fn from_yaml(text: &str, path: &Path) -> Result<Self, PolicyError> {
        // Syntax errors and shape errors are reported separately, so the
        // document goes through an untyped value first.
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|source| PolicyError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let shape = |reason: String| PolicyError::Shape {
            path: path.to_path_buf(),
            reason,
        };
        let doc: PolicyDocument = serde_yaml::from_value(value).map_err(|e| shape(e.to_string()))?;
        Self::try_from(doc).map_err(shape)
    }
}

impl TryFrom<PolicyDocument> for Policy {
    type Error = String;

    fn try_from(doc: PolicyDocument) -> Result<Self, Self::Error> {
        let PrefixTable { asan, tsan, msan } = doc.sanitizer_prefixes;
        Policy::new(
            doc.mime_types,
            [
                (SanitizerKind::Address, asan),
                (SanitizerKind::Thread, tsan),
                (SanitizerKind::Memory, msan),
            ],
        )
    }
}

impl Default for Policy {
    fn default() -> Self {
        let prefixes = |name: &str| vec![format!("__{name}_"), format!("___{name}_")];
        Self {
            mime_types: vec![
                "application/x-executable".to_string(),
                "application/x-sharedlib".to_string(),
            ],
            prefixes: SanitizerKind::ALL
                .into_iter()
                .map(|kind| (kind, prefixes(kind.key())))
                .collect(),
        }
    }
}
