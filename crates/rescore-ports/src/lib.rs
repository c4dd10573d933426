pub mod midi;
pub mod notation;
pub mod storage;
pub mod types;

pub use midi::*;
pub use notation::*;
pub use storage::*;
pub use types::*;
