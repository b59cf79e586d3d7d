mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LoggingSettings, Settings};

/// Loads the configuration from `config/default` and `WHISPER__*`
/// environment variables, merged over `Settings::default()`.
///
/// e.g. `WHISPER__LOGGING__LEVEL=debug`, `WHISPER__BROKER__MAX_LINE_LENGTH=1024`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("WHISPER")
                .prefix_separator("__")
                .separator("__"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
