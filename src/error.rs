use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Initialization failed: {message}")]
    Initialization { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors reported by a transport collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Transport not initialized")]
    NotInitialized,

    #[error("Transport initialization failed: {details}")]
    InitFailed { details: String },

    #[error("Service {service:#06x}.{instance:#06x} is not offered")]
    NotOffered { service: u16, instance: u16 },

    #[error("Event {event:#06x} was never advertised")]
    UnknownEvent { event: u16 },

    #[error("Transport has been shut down")]
    Closed,
}

impl ProducerError {
    pub fn initialization<S: Into<String>>(message: S) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProducerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_formats_ids_as_hex() {
        let err = TransportError::NotOffered {
            service: 0x1234,
            instance: 0x5678,
        };
        assert_eq!(err.to_string(), "Service 0x1234.0x5678 is not offered");
    }

    #[test]
    fn transport_error_converts_into_producer_error() {
        let err: ProducerError = TransportError::Closed.into();
        assert!(matches!(err, ProducerError::Transport(TransportError::Closed)));
        assert_eq!(err.to_string(), "Transport error: Transport has been shut down");
    }
}
