//! Configuration module
//!
//! Holds the Woodpecker connection settings and logging options collected
//! from command-line flags and environment variables.

use clap::ValueEnum;

/// Output format for log events written to stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// Woodpecker server URL (e.g., "https://ci.example.com")
    pub url: String,

    /// Personal access token
    pub token: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("woodpecker URL is required");
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            anyhow::bail!("woodpecker URL must start with http:// or https://");
        }

        if self.token.trim().is_empty() {
            anyhow::bail!("woodpecker token is required");
        }

        Ok(())
    }

    /// The token with everything but its first and last four characters hidden
    ///
    /// Short tokens are hidden entirely.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }

        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("token", &self.masked_token())
            .field("log_format", &self.log_format)
            .finish()
    }
}
