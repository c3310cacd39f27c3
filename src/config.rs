//! Configuration file structures for the rollcall bot.
//!
//! The configuration is a YAML file with a required `matrix` section holding
//! the bot account and an optional `calls` section tuning call behavior.
//!
//! # Configuration File Format
//!
//! ```yaml
//! matrix:
//!   # Fully qualified Matrix user ID for the bot account
//!   user_id: "@rollcall:matrix.org"
//!   # Matrix account password
//!   password: "secret-password"
//!   # E2EE recovery passphrase
//!   passphrase: "recovery-passphrase"
//!
//! calls:
//!   # Character starting every command
//!   prefix: "!"
//!   # Delay before a processed command message is redacted, in milliseconds
//!   cleanup_delay_ms: 500
//!   # Number of closed calls kept on disk
//!   history_size: 50
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be overridden with a `ROLLCALL_` variable, sections being
//! separated by a double underscore, for example `ROLLCALL_MATRIX__PASSWORD`
//! or `ROLLCALL_CALLS__PREFIX`.

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration structure for the rollcall bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Matrix account configuration
    pub matrix: Matrix,
    /// Call behavior, defaults apply when the section is missing
    #[serde(default)]
    pub calls: Calls,
}

/// Matrix account configuration.
///
/// # YAML Section
///
/// ```yaml
/// matrix:
///   user_id: "@rollcall:matrix.org"
///   password: "your-password"
///   passphrase: "your-recovery-passphrase"
/// ```
#[derive(Debug, Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user ID, `@username:homeserver.com`.
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Used for initial login. After successful authentication, the session
    /// is persisted and the bot can restore without re-authenticating.
    pub password: String,

    /// E2EE recovery passphrase.
    ///
    /// Used to decrypt cross-signing keys and restore end-to-end encryption
    /// functionality. Required for participating in encrypted rooms.
    pub passphrase: String,
}

/// Call behavior settings.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Calls {
    /// Character starting every command
    pub prefix: char,
    /// Delay before a processed command message is redacted, in milliseconds
    pub cleanup_delay_ms: u64,
    /// Number of closed calls kept on disk
    pub history_size: usize,
}

impl Default for Calls {
    fn default() -> Self {
        Calls {
            prefix: '!',
            cleanup_delay_ms: 500,
            history_size: 50,
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML file, then applies the `ROLLCALL_`
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a required value is
    /// missing from both the file and the environment.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("ROLLCALL_").split("__"))
            .extract()
    }
}
