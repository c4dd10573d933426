pub mod artifact;
pub mod container;
pub mod document;
pub mod encoding;
pub mod error;
pub mod namespace;

pub use artifact::*;
pub use container::*;
pub use document::*;
pub use encoding::*;
pub use error::*;
pub use namespace::*;
