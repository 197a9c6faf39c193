pub mod dispatcher;
pub mod error;
pub mod operations;
pub mod report;
pub mod transport;

pub use dispatcher::{OperationDispatcher, OperationReply};
pub use error::DispatchError;
pub use operations::Operation;
