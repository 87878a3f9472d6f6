use std::fmt;

use serde::Serialize;

/// Runtime sanitizer instrumentation a compiler can weave into a binary.
///
/// Variants are declared in classification priority order, so the derived
/// `Ord` sorts reports the same way a symbol line is tie-broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SanitizerKind {
    #[serde(rename = "AddressSanitizer")]
    Address,
    #[serde(rename = "ThreadSanitizer")]
    Thread,
    #[serde(rename = "MemorySanitizer")]
    Memory,
}

impl SanitizerKind {
    /// All kinds, highest classification priority first.
    pub const ALL: [SanitizerKind; 3] = [
        SanitizerKind::Address,
        SanitizerKind::Thread,
        SanitizerKind::Memory,
    ];

    /// Key used for this kind under `sanitizer_prefixes` in the policy file.
    pub fn key(&self) -> &'static str {
        match self {
            SanitizerKind::Address => "asan",
            SanitizerKind::Thread => "tsan",
            SanitizerKind::Memory => "msan",
        }
    }
}

impl std::str::FromStr for SanitizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asan" | "address" | "addresssanitizer" => Ok(SanitizerKind::Address),
            "tsan" | "thread" | "threadsanitizer" => Ok(SanitizerKind::Thread),
            "msan" | "memory" | "memorysanitizer" => Ok(SanitizerKind::Memory),
            _ => Err(format!("Unknown sanitizer: {}", s)),
        }
    }
}

impl fmt::Display for SanitizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SanitizerKind::Address => "AddressSanitizer",
            SanitizerKind::Thread => "ThreadSanitizer",
            SanitizerKind::Memory => "MemorySanitizer",
        };
        write!(f, "{}", name)
    }
}
