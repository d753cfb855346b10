pub mod board;
pub mod error;
pub mod ordering;
pub mod task;

pub use board::*;
pub use error::*;
pub use ordering::*;
pub use task::*;
