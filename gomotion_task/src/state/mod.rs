mod machine;

pub use machine::{PackMlMachine, TransitionOutcome};
