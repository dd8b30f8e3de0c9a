mod machine;

pub use machine::{Dispatch, ToolStateMachine};
