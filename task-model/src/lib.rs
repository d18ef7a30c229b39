//! Wire types shared by the tasks service and its clients.

pub mod error;
pub mod task;

pub use error::{ApiError, ErrorKind, ErrorResponse, FieldErrors, ORIGIN};
pub use task::{CreatedAt, ParseTaskStatusError, TaskDetails, TaskResponse, TaskStatus};
