use core::fmt::{self, Display};

/// Error produced by a compute-server operation.
///
/// Compile failures are always recoverable for the sweep: the candidate is
/// skipped and the run continues. Device errors carry the backend's error
/// code together with the backend's verdict on whether the device or
/// context itself became unusable; a fatal error aborts the whole sweep.
#[derive(Debug)]
pub enum ServerError {
    /// The device compiler rejected the kernel source.
    Compile {
        /// The build log or compiler message.
        log: String,
    },
    /// A device or runtime operation failed.
    Device {
        /// Backend-specific error code.
        code: i32,
        /// Human-readable description of the failing operation.
        message: String,
        /// Whether the device/context is unusable from here on.
        fatal: bool,
    },
}

impl ServerError {
    /// Whether this error ends the whole sweep rather than one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServerError::Device { fatal: true, .. })
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Compile { log } => write!(f, "kernel compilation failed: {log}"),
            ServerError::Device {
                code,
                message,
                fatal,
            } => {
                let severity = if *fatal { "fatal " } else { "" };
                write!(f, "{severity}device error {code}: {message}")
            }
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_flagged_device_errors_are_fatal() {
        let compile = ServerError::Compile {
            log: "syntax error".into(),
        };
        assert!(!compile.is_fatal());

        let recoverable = ServerError::Device {
            code: -5,
            message: "out of resources".into(),
            fatal: false,
        };
        assert!(!recoverable.is_fatal());

        let fatal = ServerError::Device {
            code: -34,
            message: "invalid context".into(),
            fatal: true,
        };
        assert!(fatal.is_fatal());
        assert!(fatal.to_string().contains("fatal device error -34"));
    }
}
