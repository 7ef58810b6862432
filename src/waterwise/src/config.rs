use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use chrono::FixedOffset;
use reqwest::Url;
use rumqttc::{MqttOptions, Transport};
use waterwise_codec::Topics;

/// Shortest keep-alive the MQTT client accepts.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub client_id: String,
    pub topics: Topics,
    pub keep_alive: Duration,
    pub reconnect_delay: Duration,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            use_tls: true,
            client_id: Self::generated_client_id(),
            topics: Topics::default(),
            keep_alive: Duration::from_secs(25),
            reconnect_delay: Duration::from_secs(1),
        }
    }

    pub fn generated_client_id() -> String {
        format!("waterwise-{}", uuid::Uuid::new_v4().simple())
    }

    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive.max(MIN_KEEP_ALIVE));

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }

        if self.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        options
    }
}

/// Location of the readings in the realtime database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub path: String,
    pub auth: Option<String>,
}

impl StoreConfig {
    pub const DEFAULT_PATH: &'static str = "moistureData";

    /// REST endpoint for `path`, e.g. `https://db.example/moistureData.json`.
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let base = self.database_url.trim_end_matches('/');
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            bail!("readings path must not be empty");
        }

        let mut url = Url::parse(&format!("{base}/{path}.json"))
            .with_context(|| format!("invalid database url: {}", self.database_url))?;

        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }

        Ok(url)
    }
}

/// Parses `+07:00`, `+0700`, `-05:30`, `+7`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("offset must start with + or -: {raw:?}"),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 => rest
            .split_at_checked(2)
            .ok_or_else(|| anyhow!("invalid offset: {raw:?}"))?,
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().with_context(|| format!("invalid offset hours: {raw:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid offset minutes: {raw:?}"))?;
    if !(0..24).contains(&hours) {
        bail!("invalid offset hours: {raw:?}");
    }
    if !(0..60).contains(&minutes) {
        bail!("invalid offset minutes: {raw:?}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset out of range: {raw:?}"))
}
