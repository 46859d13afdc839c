//! Generic state machine infrastructure.

/// Output of a state machine after processing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMOutput<D> {
    /// The duties that need to be performed by external executors.
    pub duties: Vec<D>,
}

impl<D> Default for SMOutput<D> {
    fn default() -> Self {
        Self { duties: Vec::new() }
    }
}

impl<D> SMOutput<D> {
    /// Creates a new empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output with the given duties.
    pub const fn with_duties(duties: Vec<D>) -> Self {
        Self { duties }
    }

    /// Creates an output with a single duty.
    pub fn with_duty(duty: D) -> Self {
        Self { duties: vec![duty] }
    }
}

/// Uniform interface for processing events and emitting duties.
///
/// Implementations perform the transition for the incoming event from their current state and
/// return the duties to execute, or an error leaving the state untouched.
pub trait StateMachine {
    /// Static configuration consulted while processing events.
    type Config;

    /// The type of duties this state machine can emit.
    type Duty;

    /// The type of events this state machine can process.
    type Event;

    /// The error type returned when event processing fails.
    type Error;

    /// Processes an event and returns the resulting duties or an error.
    fn process_event(
        &mut self,
        cfg: &Self::Config,
        event: Self::Event,
    ) -> Result<SMOutput<Self::Duty>, Self::Error>;
}
