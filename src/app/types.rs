use std::fmt;

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(signal) => write!(f, "signal {}", signal),
            ShutdownReason::Error(message) => write!(f, "error: {}", message),
            ShutdownReason::UserRequest => write!(f, "user request"),
        }
    }
}

/// Phase of the offer/withdraw heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Offer,
    Withdraw,
}

impl LifecyclePhase {
    pub fn next(self) -> Self {
        match self {
            LifecyclePhase::Offer => LifecyclePhase::Withdraw,
            LifecyclePhase::Withdraw => LifecyclePhase::Offer,
        }
    }
}
