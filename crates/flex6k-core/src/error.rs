//! Error types for flex6k.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. The variants separate the four failure
//! families the protocol engine distinguishes: codec faults (discard the
//! unit, keep the stream), protocol anomalies (log and continue), connection
//! establishment failures (surfaced to the caller that initiated them), and
//! session faults (trigger teardown with a reason).

/// The error type for all flex6k operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed binary unit (truncated VITA header, bad payload length).
    /// The offending datagram is discarded; the stream continues.
    #[error("codec error: {0}")]
    Codec(String),

    /// A protocol-level anomaly (malformed line, unknown handle, bad field).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A transport-level failure (socket connect/bind/send).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a reply, the handshake, or the first status.
    #[error("timeout waiting for response")]
    Timeout,

    /// No connection to the radio has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the radio was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The radio answered a command with a non-zero error code.
    #[error("command failed with code 0x{code:08X}: {message}")]
    Command {
        /// Device-reported error code from the reply line.
        code: u32,
        /// Reply data accompanying the error, often empty.
        message: String,
    },

    /// Smartlink relay negotiation failed. Distinguishable from a local
    /// connection failure so callers can fall back or re-authenticate.
    #[error("smartlink error: {0}")]
    Smartlink(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_codec() {
        let e = Error::Codec("packet too short".into());
        assert_eq!(e.to_string(), "codec error: packet too short");
    }

    #[test]
    fn display_command() {
        let e = Error::Command {
            code: 0x5000_0015,
            message: "invalid slice".into(),
        };
        assert_eq!(
            e.to_string(),
            "command failed with code 0x50000015: invalid slice"
        );
    }

    #[test]
    fn display_smartlink_distinct_from_transport() {
        let relay = Error::Smartlink("no connect_ready".into());
        let local = Error::Transport("connection refused".into());
        assert_ne!(relay.to_string(), local.to_string());
        assert!(relay.to_string().starts_with("smartlink"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
