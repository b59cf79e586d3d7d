use serde::Deserialize;

use crate::protocol::codec::DEFAULT_MAX_LINE_LENGTH;

/// Top-level configuration settings for the application.
///
/// The listen/broker address is not part of this: it always comes from the
/// command line.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the broker.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Longest accepted inbound line, in bytes, excluding the newline.
    pub max_line_length: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_line_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                max_line_length: DEFAULT_MAX_LINE_LENGTH,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Merge with defaults
    pub fn merge(self, default: Settings) -> Settings {
        Settings {
            broker: BrokerSettings {
                max_line_length: self
                    .broker
                    .as_ref()
                    .and_then(|b| b.max_line_length)
                    .unwrap_or(default.broker.max_line_length),
            },
            logging: LoggingSettings {
                level: self
                    .logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }
}
