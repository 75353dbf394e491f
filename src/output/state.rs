use serde::{Deserialize, Serialize};

/// Device session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Closed,
    Open,
    Running,
    Paused,
    Suspended,
    Error,
}

impl SessionState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (*self, target),
            // From Closed
            (Closed, Open) |
            (Closed, Error) |

            // From Open
            (Open, Running) |
            (Open, Error) |
            (Open, Closed) |

            // From Running
            (Running, Paused) |
            (Running, Suspended) |
            (Running, Running) |
            (Running, Closed) |

            // From Paused
            (Paused, Running) |
            (Paused, Suspended) |
            (Paused, Closed) |

            // From Suspended
            (Suspended, Running) |
            (Suspended, Paused) |
            (Suspended, Closed) |

            // From Error
            (Error, Closed)
        )
    }

    /// A device handle is held in these states
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Running | SessionState::Paused | SessionState::Suspended
        )
    }

    /// Get human-readable state name
    pub fn name(&self) -> &str {
        match self {
            Self::Closed => "Closed",
            Self::Open => "Open",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Suspended => "Suspended",
            Self::Error => "Error",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Closed
    }
}

/// What an emulated pause needs to restore on resume
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PauseMemory {
    pub prepause_frames: usize,
    /// Seconds of audio queued when the pause began
    pub delay_before_pause: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sequence() {
        assert!(SessionState::Closed.can_transition_to(SessionState::Open));
        assert!(SessionState::Open.can_transition_to(SessionState::Running));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Running));
    }

    #[test]
    fn test_error_only_exits_via_close() {
        assert!(SessionState::Error.can_transition_to(SessionState::Closed));
        assert!(!SessionState::Error.can_transition_to(SessionState::Running));
        assert!(!SessionState::Error.can_transition_to(SessionState::Open));
    }

    #[test]
    fn test_pause_cycle() {
        assert!(SessionState::Running.can_transition_to(SessionState::Paused));
        assert!(SessionState::Paused.can_transition_to(SessionState::Running));
        assert!(SessionState::Paused.can_transition_to(SessionState::Suspended));
        assert!(SessionState::Suspended.can_transition_to(SessionState::Running));
        assert!(SessionState::Suspended.can_transition_to(SessionState::Paused));
    }
}
