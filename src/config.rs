//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "backdrop-timer")]
#[command(about = "A state-managed countdown timer service with customizable background resources")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "4820")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Default countdown duration in minutes (clamped to 1-60)
    #[arg(short, long, default_value = "5")]
    pub duration: u64,

    /// Base URL of the image generation service
    #[arg(long, default_value = "https://generativelanguage.googleapis.com")]
    pub generation_endpoint: String,

    /// Image generation model name
    #[arg(long, default_value = "imagen-4.0-generate-001")]
    pub generation_model: String,

    /// Environment variable holding the generation API key
    #[arg(long, default_value = "API_KEY")]
    pub api_key_env: String,

    /// Path of the display preferences file
    #[arg(long, default_value = "backdrop-timer-preferences.json")]
    pub preferences_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Read the generation API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}
