pub mod native;
pub mod tools;

pub use native::NativeInspector;
pub use tools::ToolInspector;

use std::fmt;
use std::path::Path;

use crate::InspectError;

/// Content-based mime type of a file, e.g. `application/x-sharedlib`.
pub trait MimeInspector {
    fn mime_type(&self, path: &Path) -> Result<String, InspectError>;
}

/// Free-form, `file(1)`-style description of a file.
pub trait FileDescriber {
    fn describe(&self, path: &Path) -> Result<String, InspectError>;
}

/// Text of the `.comment` section, one embedded string per line.
pub trait CommentExtractor {
    fn comment_section(&self, path: &Path) -> Result<String, InspectError>;
}

/// Text dump of the symbol tables, one symbol per line.
pub trait SymbolExtractor {
    fn symbol_table(&self, path: &Path) -> Result<String, InspectError>;
}

/// Everything a full analysis run needs from its introspection backend.
pub trait Inspector: MimeInspector + FileDescriber + CommentExtractor + SymbolExtractor {}

impl<T> Inspector for T where T: MimeInspector + FileDescriber + CommentExtractor + SymbolExtractor {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// In-process parsing with goblin and infer.
    #[default]
    Native,
    /// The system's `file` and `readelf` utilities.
    Tools,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            "tools" => Ok(Backend::Tools),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Native => "native",
            Backend::Tools => "tools",
        };
        write!(f, "{}", name)
    }
}
