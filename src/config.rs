use std::path::PathBuf;

use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use poise::serenity_prelude::{GuildId, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_option_number_from_string;
use thiserror::Error;

/// Environment variable holding the Discord bot token.
pub const TOKEN_ENV: &str = "BOT_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("no bot token configured, set the {TOKEN_ENV} environment variable")]
    MissingToken,
    #[error("owner id `{0}` is not a valid user id")]
    InvalidOwner(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    #[serde(default)]
    pub discord: Option<SecretString>,
    #[serde(default = "default_blacklist_path")]
    pub blacklist_path: PathBuf,
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
    #[serde(default)]
    pub unban_strategy: UnbanStrategy,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub register_guild_id: Option<u64>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            discord: None,
            blacklist_path: default_blacklist_path(),
            pretty_json: default_pretty_json(),
            unban_strategy: UnbanStrategy::default(),
            owners: vec![],
            register_guild_id: None,
        }
    }
}

/// How `/revive` talks to Discord after the user left the blacklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnbanStrategy {
    /// Unban by id and treat "unknown ban" as not banned.
    #[default]
    Direct,
    /// Look the user up in the guild's ban list first.
    SearchBanList,
}

fn default_blacklist_path() -> PathBuf {
    PathBuf::from("blacklist.json")
}

fn default_pretty_json() -> bool {
    true
}

impl Config {
    pub fn token(&self) -> Result<&SecretString, ConfigError> {
        match &self.application.discord {
            Some(token) if !token.expose_secret().trim().is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken),
        }
    }

    pub fn owners(&self) -> Result<Vec<UserId>, ConfigError> {
        self.application
            .owners
            .iter()
            .map(|owner| match owner.parse::<u64>() {
                Ok(id) if id != 0 => Ok(UserId::new(id)),
                _ => Err(ConfigError::InvalidOwner(owner.clone())),
            })
            .collect()
    }

    pub fn register_guild(&self) -> Option<GuildId> {
        self.application
            .register_guild_id
            .filter(|id| *id != 0)
            .map(GuildId::new)
    }
}

/// Reads `config/base.toml` (optional), then `APP_*` variables, then `BOT_TOKEN`.
pub fn get_configuration() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(File::with_name("config/base").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("application.discord", std::env::var(TOKEN_ENV).ok())?;

    build(builder)
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    let config = builder.build()?.try_deserialize::<Config>()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(s: &str) -> Config {
        build(config::Config::builder().add_source(File::from_str(s, FileFormat::Toml))).unwrap()
    }

    #[test]
    fn defaults_apply_to_empty_file() {
        let config = from_toml("");

        assert_eq!(config.application.blacklist_path, PathBuf::from("blacklist.json"));
        assert!(config.application.pretty_json);
        assert_eq!(config.application.unban_strategy, UnbanStrategy::Direct);
        assert!(config.register_guild().is_none());
        assert!(matches!(config.token(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn reads_application_table() {
        let config = from_toml(
            r#"
            [application]
            discord = "abc.def"
            blacklist_path = "/var/lib/smitebot/blacklist.json"
            pretty_json = false
            unban_strategy = "search_ban_list"
            owners = ["42"]
            register_guild_id = "1234"
            "#,
        );

        assert_eq!(config.token().unwrap().expose_secret(), "abc.def");
        assert!(!config.application.pretty_json);
        assert_eq!(
            config.application.unban_strategy,
            UnbanStrategy::SearchBanList
        );
        assert_eq!(config.owners().unwrap(), vec![UserId::new(42)]);
        assert_eq!(config.register_guild(), Some(GuildId::new(1234)));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let config = from_toml(
            r#"
            [application]
            discord = "   "
            "#,
        );

        assert!(matches!(config.token(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn missing_token_names_the_variable() {
        let error: Box<dyn std::error::Error + Send + Sync> =
            from_toml("").token().unwrap_err().into();

        assert!(error.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn rejects_non_numeric_owner() {
        let config = from_toml(
            r#"
            [application]
            owners = ["not-a-number"]
            "#,
        );

        assert!(matches!(
            config.owners(),
            Err(ConfigError::InvalidOwner(owner)) if owner == "not-a-number"
        ));
    }
}
