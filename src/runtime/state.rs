use std::fmt;

/// Lifecycle of a supervised backend process.
///
/// ```text
/// Unregistered ──register──▶ Registered ──start──▶ Running ──teardown──▶ Stopped
/// ```
///
/// There is no way back from `Stopped`; a crashed backend is not restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Not known to the runtime.
    Unregistered,
    /// Recorded with its command line, not launched yet.
    Registered,
    /// Child process launched.
    Running,
    /// Deleted from the runtime and the runtime stopped.
    Stopped,
}

impl ProcessState {
    pub fn is_alive(self) -> bool {
        self == ProcessState::Running
    }

    pub(crate) fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Unregistered, Registered) | (Registered, Running) | (Running, Stopped)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Unregistered => write!(f, "unregistered"),
            ProcessState::Registered => write!(f, "registered"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopped => write!(f, "stopped"),
        }
    }
}
