mod console;
mod loop_runner;
mod metrics;
mod session;
mod timers;

pub use console::{
    ConsoleCommandProcessor, ConsoleCommandRegistry, ConsoleState, ControlCommand,
};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use session::{NullLinePump, RemoteLinePump, Session, SessionCommand};
pub use timers::{TickTimers, TimerId};
