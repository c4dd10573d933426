pub mod config;
pub mod outcome;
pub mod paths;
pub mod pipeline;
pub mod report;

pub use config::*;
pub use outcome::*;
pub use paths::*;
pub use pipeline::*;
pub use report::*;
