//! 核心编排层：阶段标识、错误、运行状态、事件快照与主调度循环

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod stage;
pub mod state;

pub use dispatcher::{Orchestrator, DEFAULT_MAX_STEPS};
pub use error::OrchestratorError;
pub use events::{EventSink, StateEvent};
pub use stage::{EvalKind, Stage};
pub use state::{RunContext, RunState, StageOutcome};
