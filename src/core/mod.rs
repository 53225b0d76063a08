//! 核心层：错误分类、挂起操作表、并发槽位池

pub mod error;
pub mod pending;
pub mod slots;

pub use error::{AgentError, ErrorCode};
pub use pending::{is_error_value, PendingOperationTable, ERROR_PREFIX};
pub use slots::{ConcurrencySlotPool, SlotPermit};
