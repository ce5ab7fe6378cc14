use crate::api::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use clap::{value_parser, Arg, ArgMatches, Command};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "tasktracker";

/// Optional settings read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_url: Option<String>,
    session_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
    /// Path the client opens on start.
    pub start_route: String,
}

impl Config {
    pub fn command() -> Command {
        Command::new("tasktracker")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Terminal client for the task tracker service")
            .arg(
                Arg::new("api-url")
                    .long("api-url")
                    .env("TASKTRACKER_API_URL")
                    .help("Base URL of the task API"),
            )
            .arg(
                Arg::new("session-file")
                    .long("session-file")
                    .env("TASKTRACKER_SESSION_FILE")
                    .value_parser(value_parser!(PathBuf))
                    .help("Where the login token is kept"),
            )
            .arg(
                Arg::new("log-file")
                    .long("log-file")
                    .env("TASKTRACKER_LOG_FILE")
                    .value_parser(value_parser!(PathBuf))
                    .help("Log output file"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(value_parser!(PathBuf))
                    .help("Config file (TOML)"),
            )
            .arg(
                Arg::new("route")
                    .long("route")
                    .default_value("/")
                    .help("Path to open, e.g. / or /tasks/42"),
            )
    }

    /// Reads `.env`, the command line and the config file.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_matches(&Self::command().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let file = match matches.get_one::<PathBuf>("config") {
            Some(path) => read_file_config(path)?,
            None => match Self::config_dir() {
                Ok(dir) if dir.join("config.toml").exists() => {
                    read_file_config(&dir.join("config.toml"))?
                }
                _ => FileConfig::default(),
            },
        };

        let api_url = matches
            .get_one::<String>("api-url")
            .cloned()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let session_file = match matches.get_one::<PathBuf>("session-file").cloned() {
            Some(path) => path,
            None => match file.session_file {
                Some(path) => path,
                None => Self::config_dir()?.join("session.json"),
            },
        };

        let log_file = match matches.get_one::<PathBuf>("log-file").cloned() {
            Some(path) => path,
            None => match file.log_file {
                Some(path) => path,
                None => Self::config_dir()?.join("tasktracker.log"),
            },
        };

        let start_route = matches
            .get_one::<String>("route")
            .cloned()
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            api_url,
            session_file,
            log_file,
            start_route,
        })
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::NoConfigDir)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}
