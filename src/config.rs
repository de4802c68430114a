use std::{fmt, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_SPEECH_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
pub const DEFAULT_SPEECH_RECOGNIZE_URL: &str = "https://vop.baidu.com/pro_api";
pub const DEFAULT_SPEECH_CUID: &str = "speaking-coach";
pub const DEFAULT_SPEECH_DEV_PID: u32 = 80001;

/// Credentials and endpoints of the speech recognition provider.
#[derive(Clone)]
pub struct SpeechConfig {
    pub api_key: String,
    pub secret_key: String,
    pub token_url: String,
    pub recognize_url: String,
    pub cuid: String,
    pub dev_pid: u32,
}

impl SpeechConfig {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            token_url: DEFAULT_SPEECH_TOKEN_URL.to_string(),
            recognize_url: DEFAULT_SPEECH_RECOGNIZE_URL.to_string(),
            cuid: DEFAULT_SPEECH_CUID.to_string(),
            dev_pid: DEFAULT_SPEECH_DEV_PID,
        }
    }
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub upstream_url: String,
    pub host: String,
    pub port: u16,
    /// `None` leaves the HTTP client's default (no timeout).
    pub upstream_timeout: Option<Duration>,
    /// Present only when both speech credentials are set.
    pub speech: Option<SpeechConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upstream_timeout: None,
            speech: None,
        }
    }
}

impl RelayConfig {
    /// Reads the process environment (a `.env` file counts, via dotenvy).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_key = non_blank(&lookup, "OPENAI_API_KEY");

        let upstream_url = lookup("DEEPSEEK_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.upstream_url);

        let host = lookup("HOST")
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid PORT value: {raw}"))?,
            None => defaults.port,
        };

        let upstream_timeout = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid UPSTREAM_TIMEOUT_SECS value: {raw}"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let speech = speech_from_lookup(&lookup)?;

        Ok(Self {
            api_key,
            upstream_url,
            host,
            port,
            upstream_timeout,
            speech,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn speech_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<SpeechConfig>> {
    let (Some(api_key), Some(secret_key)) = (
        non_blank(lookup, "BAIDU_API_KEY"),
        non_blank(lookup, "BAIDU_SECRET_KEY"),
    ) else {
        return Ok(None);
    };

    let mut speech = SpeechConfig::new(api_key, secret_key);
    if let Some(url) = non_blank(lookup, "BAIDU_TOKEN_URL") {
        speech.token_url = url;
    }
    if let Some(url) = non_blank(lookup, "BAIDU_ASR_URL") {
        speech.recognize_url = url;
    }
    if let Some(cuid) = non_blank(lookup, "BAIDU_CUID") {
        speech.cuid = cuid;
    }
    if let Some(raw) = non_blank(lookup, "BAIDU_DEV_PID") {
        speech.dev_pid = raw
            .parse::<u32>()
            .with_context(|| format!("invalid BAIDU_DEV_PID value: {raw}"))?;
    }
    Ok(Some(speech))
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("recognize_url", &self.recognize_url)
            .field("cuid", &self.cuid)
            .field("dev_pid", &self.dev_pid)
            .finish()
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_url", &self.upstream_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("speech", &self.speech)
            .finish()
    }
}
