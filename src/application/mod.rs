pub mod coordinator;
pub mod error;
pub mod operation;
pub mod sync;
pub mod task_store;

pub use coordinator::*;
pub use error::*;
pub use operation::*;
pub use sync::*;
pub use task_store::*;
