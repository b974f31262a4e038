use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use skyfollow_core::config::Settings;

/// Load settings from config files and `SKYFOLLOW__*` variables.
///
/// Later sources win: system config dir, then `<current_dir>/config.toml`,
/// then the environment. Keys absent everywhere take the `Default` values
/// of the settings structs.
pub fn get_configuration_with_paths(
    current_dir_path: Option<PathBuf>,
    system_config_dir_path: Option<PathBuf>,
) -> Result<Settings, config::ConfigError> {
    let config_directory = current_dir_path.unwrap_or_else(|| {
        std::env::current_dir()
            .map(|p| p.join("config"))
            .unwrap_or_else(|_| PathBuf::from("config"))
    });

    let system_config_dir = system_config_dir_path.unwrap_or_else(system_config_dir);

    let settings = Config::builder()
        .add_source(File::from(system_config_dir.join("config.toml")).required(false))
        .add_source(File::from(config_directory.join("config.toml")).required(false))
        .add_source(Environment::with_prefix("SKYFOLLOW").separator("__"))
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    get_configuration_with_paths(None, None)
}

/// Platform config directory, e.g. `~/.config/skyfollow` on Linux
pub fn system_config_dir() -> PathBuf {
    ProjectDirs::from("social", "skyfollow", "skyfollow")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("config"))
}
