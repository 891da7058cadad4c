use std::time::Duration;

use url::Url;
use uuid::Uuid;

use parlor_core::{CoreConfig, RollbackPolicy};
use parlor_types::api::RegisterQuery;
use parlor_types::models::Status;

use crate::error::ClientError;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_CHANNEL_URL: &str = "ws://127.0.0.1:3000/channel";
const DEFAULT_ROOM_ID: &str = "53c38a2c-9640-4957-92d7-0d4400b2b9ac";

/// Session configuration, read from `PARLOR_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub channel_url: Url,
    pub room_id: Uuid,
    pub username: String,
    pub avatar: String,
    pub color: String,
    pub core: CoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let api_url = Url::parse(&var("PARLOR_API_URL", DEFAULT_API_URL))?;
        let channel_url = Url::parse(&var("PARLOR_CHANNEL_URL", DEFAULT_CHANNEL_URL))?;
        let room_id = var("PARLOR_ROOM_ID", DEFAULT_ROOM_ID)
            .parse::<Uuid>()
            .map_err(|e| ClientError::Config(format!("PARLOR_ROOM_ID: {}", e)))?;

        let username = get("PARLOR_USERNAME")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ClientError::Config("PARLOR_USERNAME is not set".into()))?;

        let color = match get("PARLOR_COLOR") {
            Some(c) => parse_color(&c)?,
            None => random_color(),
        };
        let avatar = match get("PARLOR_AVATAR") {
            Some(a) => a,
            None => default_avatar(&username, &color)?,
        };

        let defaults = CoreConfig::default();
        let hidden_status = match get("PARLOR_HIDDEN_STATUS").as_deref() {
            None => defaults.hidden_status,
            Some("idle") => Status::Idle,
            Some("offline") => Status::Offline,
            Some(other) => {
                return Err(ClientError::Config(format!(
                    "PARLOR_HIDDEN_STATUS must be idle or offline, got '{}'",
                    other
                )));
            }
        };
        let rollback = match get("PARLOR_ROLLBACK") {
            Some(raw) => raw.parse::<RollbackPolicy>().map_err(ClientError::Config)?,
            None => defaults.rollback,
        };

        let core = CoreConfig {
            typing_quiet: millis(&get, "PARLOR_TYPING_QUIET_MS")?.unwrap_or(defaults.typing_quiet),
            cursor_debounce: millis(&get, "PARLOR_CURSOR_DEBOUNCE_MS")?
                .unwrap_or(defaults.cursor_debounce),
            cursor_ttl: millis(&get, "PARLOR_CURSOR_TTL_MS")?,
            hidden_status,
            rollback,
        };

        Ok(Self {
            api_url,
            channel_url,
            room_id,
            username,
            avatar,
            color,
            core,
        })
    }

    /// Query sent with the registration request.
    pub fn registration(&self) -> RegisterQuery {
        RegisterQuery {
            avatar: self.avatar.clone(),
            color: self.color.clone(),
            room: self.room_id,
            status: Status::Online,
        }
    }
}

fn millis<F>(get: &F, key: &str) -> Result<Option<Duration>, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ClientError::Config(format!("{}: {}", key, e)))
        })
        .transpose()
}

fn parse_color(raw: &str) -> Result<String, ClientError> {
    let hex = raw.trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(format!("#{}", hex.to_ascii_lowercase()))
    } else {
        Err(ClientError::Config(format!("PARLOR_COLOR '{}' is not #RRGGBB", raw)))
    }
}

fn random_color() -> String {
    format!("#{:06x}", rand::random::<u32>() & 0x00ff_ffff)
}

fn default_avatar(username: &str, color: &str) -> Result<String, ClientError> {
    let url = Url::parse_with_params(
        "https://ui-avatars.com/api/",
        &[
            ("background", color.trim_start_matches('#')),
            ("name", username),
            ("length", "1"),
        ],
    )?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_username() {
        let config = Config::from_lookup(lookup(&[("PARLOR_USERNAME", "ana")])).unwrap();

        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.room_id.to_string(), DEFAULT_ROOM_ID);
        assert_eq!(config.core, CoreConfig::default());
        assert_eq!(config.color.len(), 7);
        assert!(config.avatar.starts_with("https://ui-avatars.com/api/?background="));
        assert!(config.avatar.contains("name=ana"));
    }

    #[test]
    fn username_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("PARLOR_USERNAME", "bo"),
            ("PARLOR_COLOR", "#A1B2C3"),
            ("PARLOR_HIDDEN_STATUS", "offline"),
            ("PARLOR_ROLLBACK", "revert"),
            ("PARLOR_TYPING_QUIET_MS", "750"),
            ("PARLOR_CURSOR_TTL_MS", "30000"),
        ]))
        .unwrap();

        assert_eq!(config.color, "#a1b2c3");
        assert_eq!(config.core.hidden_status, Status::Offline);
        assert_eq!(config.core.rollback, RollbackPolicy::Revert);
        assert_eq!(config.core.typing_quiet, Duration::from_millis(750));
        assert_eq!(config.core.cursor_debounce, Duration::from_millis(125));
        assert_eq!(config.core.cursor_ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn bad_values_are_rejected() {
        for (key, value) in [
            ("PARLOR_COLOR", "red"),
            ("PARLOR_HIDDEN_STATUS", "typing"),
            ("PARLOR_ROLLBACK", "maybe"),
            ("PARLOR_CURSOR_DEBOUNCE_MS", "-5"),
            ("PARLOR_ROOM_ID", "lobby"),
        ] {
            let result = Config::from_lookup(lookup(&[("PARLOR_USERNAME", "ana"), (key, value)]));
            assert!(result.is_err(), "{}={} should be rejected", key, value);
        }
    }
}
