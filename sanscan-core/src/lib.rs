pub mod classifier;
pub mod error;
pub mod inspect;
pub mod path;
pub mod policy;
pub mod sanitizer;
pub mod validator;

pub use classifier::*;
pub use error::*;
pub use inspect::*;
pub use path::resolve;
pub use policy::*;
pub use sanitizer::*;
pub use validator::*;
