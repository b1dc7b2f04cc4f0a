//! Runtime configuration, loaded from environment variables at startup.

use crate::storage::signer::ProviderConfig;
use std::collections::HashMap;

/// Default option template applied to video sources.
const DEFAULT_VIDEO_OPTS: &str = "-i %{input_path} -c:v libx264 -preset medium -c:a aac %{output_path}";

/// Default option template applied to audio sources.
const DEFAULT_AUDIO_OPTS: &str = "-i %{input_path} -c:a aac %{output_path}";

/// Template defaults for new convert orders.
#[derive(Debug, Clone)]
pub struct ConvertDefaults {
    /// Output container for video sources.
    pub video_muxer: String,
    /// Option template applied to video sources.
    pub video_opts: String,
    /// Output container for audio sources.
    pub audio_muxer: String,
    /// Option template applied to audio sources.
    pub audio_opts: String,
    /// Remote directory order outputs land under.
    pub output_location: String,
}

/// Runtime configuration for the dealer server.
///
/// Every field has a default so the server works out-of-the-box without
/// any environment variables set (the session secret excepted only in the
/// sense that the default is for development).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default `0.0.0.0:8080`).
    pub bind_address: String,

    /// Shared HS256 secret performer session tokens are verified with.
    pub session_secret: String,

    /// `tracing` filter string, e.g. `info` or `debug,tower=warn`.
    pub log_level: String,

    /// Provider fresh output claims are allocated against.
    pub default_storage_provider: String,

    /// Storage credentials keyed by provider name.
    pub storage_providers: HashMap<String, ProviderConfig>,

    /// Defaults for new convert orders.
    pub convert_defaults: ConvertDefaults,
}

impl Config {
    /// Builds a [`Config`] from environment variables, falling back to
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let default_provider = env_or("DEALER_STORAGE_PROVIDER", "local");
        let provider = ProviderConfig {
            endpoint: env_or("DEALER_STORAGE_ENDPOINT", "https://storage.localhost"),
            region: env_or("DEALER_STORAGE_REGION", "us-east-1"),
            bucket: env_or("DEALER_STORAGE_BUCKET", "dealer"),
            access_key_id: env_or("DEALER_STORAGE_ACCESS_KEY_ID", "dealer"),
            secret_access_key: env_or("DEALER_STORAGE_SECRET_ACCESS_KEY", "dealer-secret"),
        };

        Self {
            bind_address: env_or("DEALER_BIND", "0.0.0.0:8080"),
            session_secret: env_or("DEALER_SESSION_SECRET", "development-secret"),
            log_level: env_or("DEALER_LOG", "info"),
            storage_providers: HashMap::from([(default_provider.clone(), provider)]),
            default_storage_provider: default_provider,
            convert_defaults: ConvertDefaults {
                video_muxer: env_or("DEALER_VIDEO_MUXER", "mp4"),
                video_opts: env_or("DEALER_VIDEO_OPTS", DEFAULT_VIDEO_OPTS),
                audio_muxer: env_or("DEALER_AUDIO_MUXER", "m4a"),
                audio_opts: env_or("DEALER_AUDIO_OPTS", DEFAULT_AUDIO_OPTS),
                output_location: env_or("DEALER_OUTPUT_LOCATION", "storage:/orders"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
