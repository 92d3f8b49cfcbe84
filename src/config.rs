use anyhow::{Result, anyhow};
use dotenvy::dotenv;
use formdata_upload::{DEFAULT_TIMEOUT_MS, client::DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    timeout_ms: Option<u64>,
    user_agent: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    formdata_timeout_ms: Option<u64>,
    formdata_user_agent: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Sent with every upload unless the command line sets the same header.
    pub headers: BTreeMap<String, String>,
}

fn merge_config(base: ConfigFile, override_config: ConfigEnv) -> Result<Config> {
    let timeout_ms = override_config
        .formdata_timeout_ms
        .or(base.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(anyhow!("Configured timeout must be greater than zero"));
    }

    let user_agent = override_config
        .formdata_user_agent
        .or(base.user_agent)
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Ok(Config {
        timeout_ms,
        user_agent,
        headers: base.headers,
    })
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(_) => Ok(ConfigFile::default()),
    }
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::from_env::<ConfigEnv>().unwrap_or_default();

    let project_dirs = directories::ProjectDirs::from("com", "formdata", "fdup")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    let file_config = read_config_file(&project_dirs.config_dir().join("config.toml"))?;

    merge_config(file_config, env_config)
}
