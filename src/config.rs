use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::session::{SessionConfig, TranscriptPolicy};
use crate::sink::SinkKind;
use crate::transcription::TranscriberConfig;

/// Environment variable prefix for overrides, e.g. `CALL_TRANSCRIBER__SERVICE__HTTP__PORT`
pub const ENV_PREFIX: &str = "CALL_TRANSCRIBER";

/// Conventional variable holding the transcription credential
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcription: TranscriberConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// 0 disables the handshake timeout
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_pending_frames")]
    pub max_pending_frames: usize,
    #[serde(default = "default_true")]
    pub suppress_empty_partials: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

/// How the call-setup document attaches the media stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// `<Connect><Stream>`: the call is held on the stream
    #[default]
    Connect,
    /// `<Start><Stream>`: the stream is forked and the call continues
    Start,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub mode: StreamMode,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    /// Only used in `start` mode, keeps the call open while streaming
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u32,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_pending_frames() -> usize {
    500 // ~10 seconds of 20ms carrier frames
}

fn default_true() -> bool {
    true
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_subject_prefix() -> String {
    "stt.text".to_string()
}

fn default_greeting() -> String {
    "Speak to see your audio transcribed in the console.".to_string()
}

fn default_stream_path() -> String {
    "/media".to_string()
}

fn default_pause_secs() -> u32 {
    60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            max_pending_frames: default_max_pending_frames(),
            suppress_empty_partials: true,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            mode: StreamMode::default(),
            greeting: default_greeting(),
            stream_path: default_stream_path(),
            pause_secs: default_pause_secs(),
        }
    }
}

impl Config {
    /// Load `path` (extension optional), then apply `CALL_TRANSCRIBER__*`
    /// overrides and `ASSEMBLYAI_API_KEY`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("transcription.api_key", std::env::var(API_KEY_ENV).ok())?
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.transcription
            .validate()
            .context("Invalid [transcription] section")?;

        if !self.webhook.stream_path.starts_with('/') {
            bail!(
                "webhook.stream_path must start with '/': {}",
                self.webhook.stream_path
            );
        }

        if matches!(self.webhook.stream_path.as_str(), "/" | "/health") {
            bail!(
                "webhook.stream_path collides with a built-in route: {}",
                self.webhook.stream_path
            );
        }

        if self.session.max_pending_frames == 0 {
            bail!("session.max_pending_frames must be at least 1");
        }

        Ok(())
    }

    /// Per-session settings derived from this config
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: match self.session.connect_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_pending_frames: self.session.max_pending_frames,
            policy: TranscriptPolicy {
                suppress_empty_partials: self.session.suppress_empty_partials,
            },
            encoding: self.transcription.encoding,
            sample_rate: self.transcription.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[service]
name = "call-transcriber"

[service.http]
bind = "127.0.0.1"
port = 3000

[transcription]
api_key = "file-key"
"#;

    #[test]
    fn test_load_minimal_applies_defaults() {
        let file = write_config(MINIMAL);
        let cfg = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(cfg.service.http.port, 3000);
        assert_eq!(cfg.transcription.sample_rate, 8000);
        assert_eq!(cfg.session.max_pending_frames, 500);
        assert!(cfg.session.suppress_empty_partials);
        assert_eq!(cfg.sink.kind, SinkKind::Console);
        assert_eq!(cfg.webhook.mode, StreamMode::Connect);
        assert_eq!(cfg.webhook.stream_path, "/media");
    }

    #[test]
    fn test_session_config_zero_timeout_disables() {
        let file = write_config(&format!(
            "{}\n[session]\nconnect_timeout_secs = 0\nsuppress_empty_partials = false\n",
            MINIMAL
        ));
        let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
        let session = cfg.session_config();

        assert_eq!(session.connect_timeout, None);
        assert!(!session.policy.suppress_empty_partials);
    }

    #[test]
    fn test_validate_rejects_relative_stream_path() {
        let file = write_config(&format!("{}\n[webhook]\nstream_path = \"media\"\n", MINIMAL));
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }
}
