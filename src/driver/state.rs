//! Device state management

/// Device state machine
///
/// A device starts `Closed`, is `Opened` before it can record and is
/// `Running` while a reader produced by its record routine is live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    /// Not acquired
    #[default]
    Closed,

    /// Acquired, not producing frames
    Opened,

    /// Producing frames through a reader
    Running,
}

impl DeviceState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &DeviceState) -> bool {
        use DeviceState::*;

        match (self, target) {
            (Closed, Opened) => true,
            (Opened, Running) => true,

            // Close is allowed from everywhere, including Closed
            (_, Closed) => true,

            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            DeviceState::Closed => "Closed",
            DeviceState::Opened => "Opened",
            DeviceState::Running => "Running",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, DeviceState::Running)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DeviceState::Closed)
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use DeviceState::*;

        assert!(Closed.can_transition_to(&Opened));
        assert!(Opened.can_transition_to(&Running));
        assert!(Running.can_transition_to(&Closed));
        assert!(Opened.can_transition_to(&Closed));
        assert!(Closed.can_transition_to(&Closed));
    }

    #[test]
    fn test_invalid_transitions() {
        use DeviceState::*;

        assert!(!Closed.can_transition_to(&Running)); // Must open first
        assert!(!Opened.can_transition_to(&Opened));
        assert!(!Running.can_transition_to(&Opened));
        assert!(!Running.can_transition_to(&Running));
    }

    #[test]
    fn test_state_checks() {
        assert_eq!(DeviceState::default(), DeviceState::Closed);
        assert!(DeviceState::Closed.is_closed());
        assert!(DeviceState::Running.is_running());
        assert_eq!(DeviceState::Opened.to_string(), "Opened");
    }
}
