use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Live-poll aggregation server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "POLL_PORT", help = "Port to serve poll snapshots on.")]
    pub port: Option<u16>,

    #[clap(long, env = "POLL_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "POLL_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "POLL_LOG_LEVEL", help = "Logging level (debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "POLL_REDIS_URL", help = "Redis connection URL for the pub/sub transport.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "POLL_QUESTION_TOPIC", help = "Channel carrying question announcements.")]
    pub question_topic: Option<String>,

    #[clap(long, env = "POLL_VOTE_TOPIC", help = "Channel carrying vote events.")]
    pub vote_topic: Option<String>,

    #[clap(long, env = "POLL_RECONNECT_BASE_DELAY_MS", help = "Base delay in milliseconds for transport reconnect attempts.")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[clap(long, env = "POLL_RECONNECT_MAX_DELAY_MS", help = "Maximum delay in milliseconds for transport reconnect attempts.")]
    pub reconnect_max_delay_ms: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            redis_url: other.redis_url.or(self.redis_url),
            question_topic: other.question_topic.or(self.question_topic),
            vote_topic: other.vote_topic.or(self.vote_topic),
            reconnect_base_delay_ms: other.reconnect_base_delay_ms.or(self.reconnect_base_delay_ms),
            reconnect_max_delay_ms: other.reconnect_max_delay_ms.or(self.reconnect_max_delay_ms),
        }
    }
}

/// Fully resolved settings: the merged configuration with every field
/// populated, so downstream code never re-applies defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub redis_url: String,
    pub question_topic: String,
    pub vote_topic: String,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

pub fn load_config() -> Settings {
    // 1. Load defaults
    let default_config = Config {
        port: Some(9003),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        redis_url: Some("redis://127.0.0.1:6379".to_string()),
        question_topic: Some("votinglivepoll/question".to_string()),
        vote_topic: Some("votinglivepoll/vote".to_string()),
        reconnect_base_delay_ms: Some(1000),
        reconnect_max_delay_ms: Some(60000),
        ..Default::default()
    };

    // 2. Load from config file (server_poll.conf) if present.
    //    Allow overriding default config file path with CLI arg.
    let cli_args_for_path = Config::parse(); // Parse CLI to get potential config_path override early

    let config_file_path = cli_args_for_path
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_poll.conf"));

    let mut current_config = default_config;

    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<Config>(&config_str) {
                current_config = current_config.merge(file_config);
            } else {
                log::warn!("Failed to parse config file: {}. Falling back to other sources.", config_file_path.display());
            }
        } else {
            log::warn!("Failed to read config file: {}. Falling back to other sources.", config_file_path.display());
        }
    } else {
        log::info!("Config file not found at {}. Using defaults and environment/CLI variables.", config_file_path.display());
    }

    // 3. Override with environment variables and CLI arguments
    //    clap::Parser automatically handles env vars and CLI args.
    let cli_args_final = Config::parse();
    current_config = current_config.merge(cli_args_final);

    resolve(current_config)
}

// Every field was seeded with a default above, so the fallbacks here
// only fire if a merge source explicitly nulled one out.
fn resolve(config: Config) -> Settings {
    Settings {
        port: config.port.unwrap_or(9003),
        log_dir: config.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
        log_level: config.log_level.unwrap_or_else(|| "info".to_string()),
        redis_url: config
            .redis_url
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
        question_topic: config
            .question_topic
            .unwrap_or_else(|| "votinglivepoll/question".to_string()),
        vote_topic: config
            .vote_topic
            .unwrap_or_else(|| "votinglivepoll/vote".to_string()),
        reconnect_base_delay_ms: config.reconnect_base_delay_ms.unwrap_or(1000),
        reconnect_max_delay_ms: config.reconnect_max_delay_ms.unwrap_or(60000),
    }
}
