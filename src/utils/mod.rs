//! The `utils` module holds the pieces shared by every other module:
//! error types and logging setup.

pub mod error;
pub mod logging;

pub use error::{CodecError, Result, SinkError, WhisperError};

#[cfg(test)]
mod tests {
    use super::error::{CodecError, SinkError, WhisperError};
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warn");
    }

    #[test]
    fn parse_level_falls_back_to_info() {
        assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
        assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
        assert_eq!(logging::parse_level("loud"), tracing::Level::INFO);
    }

    #[test]
    fn codec_io_errors_convert_to_sink_and_broker_errors() {
        let err = CodecError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(SinkError::from(err), SinkError::Io(_)));

        let err = CodecError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(WhisperError::from(err), WhisperError::Io(_)));
    }

    #[test]
    fn bind_error_mentions_address() {
        let err = WhisperError::Bind {
            addr: "127.0.0.1:1".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("failed to bind 127.0.0.1:1"));
    }
}
