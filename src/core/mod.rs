// Public modules
pub mod catalog;
pub mod channel;
pub mod defaults;
pub mod deploy;
pub mod error;
pub mod json;
pub mod local;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod rollback;
pub mod shell;
pub mod ssh;

// Re-export common types for convenience
pub use catalog::{build_catalog, DeployParams, Step, StepStatus};
pub use channel::{
    CancelToken, CommandOutput, ExecOptions, ExecutionChannel, StreamingChannel, SubEvent,
};
pub use error::{Error, ErrorCode, Result};
pub use local::LocalChannel;
pub use progress::{
    EventSink, LogSink, MemorySink, NullSink, ProgressInfo, StreamEvent, StreamEventKind,
};
pub use report::{RunData, RunReport};
pub use rollback::{RollbackAction, RollbackOutcome, RollbackReport};
pub use ssh::SshChannel;
