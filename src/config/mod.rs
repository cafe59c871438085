use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::render::{CurrencyFormat, Labels};

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub page_size: Option<u32>,
    pub keyword_size: Option<u32>,
    pub timeout: Option<u64>,
    pub reopen_delay_ms: Option<u64>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub currency: Option<CurrencyFormat>,
    pub labels: Option<Labels>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".storefront").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
}

pub fn default_config_yaml() -> String {
    r#"# Storefront config
#
# Location (default):
#   ~/.storefront/config.yml

# Backend
api_url: http://localhost:8000
timeout: 10

# Paging
page_size: 20
keyword_size: 20

# Delay between closing the detail overlay and reopening it for a
# recommendation, in milliseconds.
reopen_delay_ms: 150

# Output (optional)
# output: ./storefront.html
# output_format: html

# Prices
currency:
  symbol: "₫"
  code: VND
  thousands_separator: "."
  decimal_separator: ","
  decimals: 0
  symbol_after: true

# Fixed texts (any key may be omitted)
# labels:
#   no_results: "No results found."
#   price_fallback: "Contact for price"
#   loading: "Loading..."

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
