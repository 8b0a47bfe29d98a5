use std::fmt;

#[derive(Debug, Clone)]
pub enum MicrobaseError {
    ConfigValidation(String),
    SignalOperation(String),
    Startup(String),
}

impl MicrobaseError {
    /// Stable error code, usable in log queries and alerts
    pub fn code(&self) -> &'static str {
        match self {
            MicrobaseError::ConfigValidation(_) => "E001",
            MicrobaseError::SignalOperation(_) => "E002",
            MicrobaseError::Startup(_) => "E003",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            MicrobaseError::ConfigValidation(_) => "Configuration Validation Error",
            MicrobaseError::SignalOperation(_) => "Signal Operation Error",
            MicrobaseError::Startup(_) => "Startup Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            MicrobaseError::ConfigValidation(msg) => msg,
            MicrobaseError::SignalOperation(msg) => msg,
            MicrobaseError::Startup(msg) => msg,
        }
    }
}

impl fmt::Display for MicrobaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for MicrobaseError {}

// Convenience constructors
impl MicrobaseError {
    pub fn config_validation<T: Into<String>>(msg: T) -> Self {
        MicrobaseError::ConfigValidation(msg.into())
    }

    pub fn signal_operation<T: Into<String>>(msg: T) -> Self {
        MicrobaseError::SignalOperation(msg.into())
    }

    pub fn startup<T: Into<String>>(msg: T) -> Self {
        MicrobaseError::Startup(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MicrobaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_display_are_stable() {
        let err = MicrobaseError::config_validation("bad value");
        assert_eq!(err.code(), "E001");
        assert_eq!(err.to_string(), "Configuration Validation Error: bad value");

        assert_eq!(MicrobaseError::signal_operation("x").code(), "E002");
        assert_eq!(MicrobaseError::startup("x").code(), "E003");
    }
}
