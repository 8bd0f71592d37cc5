use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Candidate base URLs probed at startup, in configuration order.
    pub endpoints: Vec<String>,
    pub api_token: String,
    /// Language the model is asked to reply in.
    pub reply_lang: String,
    pub max_probe_workers: usize,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "http://raspberrypi.local:1234".to_string(),
                "http://ubuntu:1234".to_string(),
                "http://localhost:1234".to_string(),
            ],
            api_token: String::new(),
            reply_lang: "zh_TW".to_string(),
            max_probe_workers: 10,
            max_retries: 3,
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
        let dir = exe.parent().unwrap_or(Path::new("."));
        dir.join("config.json")
    }

    pub fn load() -> Self {
        let path = Self::path();
        match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<Config>(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = Config::default();
        assert_eq!(cfg.endpoints.len(), 3);
        assert_eq!(cfg.max_probe_workers, 10);
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.api_token.is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = Config {
            endpoints: vec!["http://box:1234".into()],
            api_token: "secret".into(),
            reply_lang: "English".into(),
            max_probe_workers: 4,
            max_retries: 2,
        };
        let s = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&s).unwrap();
        assert_eq!(back.endpoints, cfg.endpoints);
        assert_eq!(back.api_token, "secret");
        assert_eq!(back.max_retries, 2);
    }
}
