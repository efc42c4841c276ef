mod loop_agent;
mod sequential_agent;

pub use loop_agent::{DEFAULT_LOOP_MAX_ITERATIONS, LoopAgent};
pub use sequential_agent::SequentialAgent;
