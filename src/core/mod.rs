//! 核心编排层：错误类型、进度事件、单请求执行器、多 Agent 编排、优雅关闭

pub mod error;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod shutdown;

pub use error::RelayError;
pub use events::{EventSink, ProgressEvent};
pub use executor::{ExecutionResult, Executor, SUMMARY_FALLBACK};
pub use orchestrator::{ExecuteRequest, Orchestrator};
pub use shutdown::{ShutdownManager, ShutdownReason};
