//! Resolution of effective settings from CLI flags, environment and profile.
//!
//! Precedence, highest first: flags, environment, profile, built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{ProfileConfig, load_profile};
use crate::llm::provider::{ModelOptions, Provider};
use crate::ocl::servers::resolve_ocl_url;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Environment lookup; blank values count as unset.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub ocl_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
}

/// Effective model and terminology server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub ocl_url: String,
    pub ocl_token: Option<String>,
    pub options: ModelOptions,
}

impl Settings {
    /// Resolves settings against the process environment.
    pub fn load(overrides: &Overrides) -> Result<Self, String> {
        dotenvy::dotenv().ok();
        let profile = match overrides.profile.as_deref() {
            Some(name) => load_profile(name)?,
            None => ProfileConfig::default(),
        };
        Self::resolve(overrides, &process_env, &profile)
    }

    pub fn resolve(
        overrides: &Overrides,
        env: EnvLookup<'_>,
        profile: &ProfileConfig,
    ) -> Result<Self, String> {
        let provider = match (&overrides.provider, env("LM_PROVIDER"), &profile.provider) {
            (Some(value), _, _) => parse_named("--provider", value)?,
            (None, Some(value), _) => parse_named("LM_PROVIDER", &value)?,
            (None, None, Some(value)) => parse_named("provider in profile", value)?,
            (None, None, None) => Provider::default(),
        };

        let model = overrides
            .model
            .clone()
            .or_else(|| env("LM_MODEL"))
            .or_else(|| profile.model.clone())
            .filter(|model| !model.trim().is_empty());

        let api_key = env("LM_TOKEN").or_else(|| env(provider.api_key_env()));

        let ocl_url = overrides
            .ocl_url
            .clone()
            .or_else(|| env("OCL_URL"))
            .or_else(|| profile.ocl_url.clone())
            .unwrap_or_default();

        let defaults = ModelOptions::default();
        let options = ModelOptions {
            temperature: layered(
                overrides.temperature,
                env,
                "LM_TEMPERATURE",
                profile.temperature,
            )?,
            max_tokens: layered(overrides.max_tokens, env, "LM_MAX_TOKENS", profile.max_tokens)?,
            timeout_secs: layered(overrides.timeout, env, "LM_TIMEOUT", profile.timeout)?
                .or(defaults.timeout_secs),
            retries: layered(overrides.retries, env, "LM_RETRIES", profile.retries)?
                .unwrap_or(defaults.retries),
            retry_delay_ms: layered(
                overrides.retry_delay,
                env,
                "LM_RETRY_DELAY",
                profile.retry_delay,
            )?
            .unwrap_or(defaults.retry_delay_ms),
            base_url: env("LM_BASE_URL").or_else(|| profile.base_url.clone()),
        };

        Ok(Self {
            provider,
            model,
            api_key,
            ocl_url: resolve_ocl_url(&ocl_url),
            ocl_token: env("OCL_TOKEN"),
            options,
        })
    }

    pub fn require_model(&self) -> Result<&str, String> {
        self.model
            .as_deref()
            .ok_or_else(|| "No model provided. Use --model or set LM_MODEL.".to_string())
    }

    pub fn api_key_present(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_named(source: &str, value: &str) -> Result<Provider, String> {
    value.parse().map_err(|_| {
        format!(
            "Invalid {source} '{value}'. Supported values: {}.",
            Provider::supported_values()
        )
    })
}

fn layered<T: FromStr>(
    flag: Option<T>,
    env: EnvLookup<'_>,
    key: &str,
    profile: Option<T>,
) -> Result<Option<T>, String> {
    if flag.is_some() {
        return Ok(flag);
    }
    if let Some(raw) = env(key) {
        return raw
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid {key} '{raw}'."));
    }
    Ok(profile)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn resolve(
        listen: Option<&str>,
        static_dir: Option<PathBuf>,
        env: EnvLookup<'_>,
    ) -> Result<Self, String> {
        let listen = listen
            .map(str::to_string)
            .or_else(|| env("OCLCHAT_LISTEN_ADDR"))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen
            .parse()
            .map_err(|_| format!("Invalid listen address '{listen}'."))?;
        let static_dir = static_dir
            .or_else(|| env("OCLCHAT_STATIC_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let log_format = match env("OCLCHAT_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(format!(
                    "Invalid OCLCHAT_LOG_FORMAT '{other}'. Supported values: text, json."
                ));
            }
        };
        Ok(Self {
            listen_addr,
            static_dir,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_select_anthropic_and_production() {
        let settings =
            Settings::resolve(&Overrides::default(), &env_of(&[]), &ProfileConfig::default())
                .unwrap();
        assert_eq!(settings.provider, Provider::Anthropic);
        assert_eq!(settings.ocl_url, "http://api.openconceptlab.org/");
        assert!(settings.model.is_none());
        assert!(settings.require_model().is_err());
        assert_eq!(settings.options, ModelOptions::default());
    }

    #[test]
    fn flags_beat_env_and_env_beats_profile() {
        let profile = ProfileConfig {
            provider: Some("fireworks".to_string()),
            model: Some("profile-model".to_string()),
            timeout: Some(7),
            temperature: Some(0.1),
            ..ProfileConfig::default()
        };
        let env = env_of(&[("LM_PROVIDER", "openai"), ("LM_TIMEOUT", "21")]);
        let overrides = Overrides {
            temperature: Some(1.2),
            ..Overrides::default()
        };

        let settings = Settings::resolve(&overrides, &env, &profile).unwrap();
        assert_eq!(settings.provider, Provider::Openai);
        assert_eq!(settings.model.as_deref(), Some("profile-model"));
        assert_eq!(settings.options.timeout_secs, Some(21));
        assert_eq!(settings.options.temperature, Some(1.2));
    }

    #[test]
    fn api_key_falls_back_to_provider_variable() {
        let env = env_of(&[("LM_PROVIDER", "openai"), ("OPENAI_API_KEY", "sk-test")]);
        let settings =
            Settings::resolve(&Overrides::default(), &env, &ProfileConfig::default()).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));

        let env = env_of(&[("LM_TOKEN", "generic"), ("ANTHROPIC_API_KEY", "specific")]);
        let settings =
            Settings::resolve(&Overrides::default(), &env, &ProfileConfig::default()).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn invalid_values_name_their_source() {
        let env = env_of(&[("LM_PROVIDER", "bad")]);
        let err = Settings::resolve(&Overrides::default(), &env, &ProfileConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            "Invalid LM_PROVIDER 'bad'. Supported values: anthropic, openai, fireworks."
        );

        let env = env_of(&[("LM_MAX_TOKENS", "lots")]);
        let err = Settings::resolve(&Overrides::default(), &env, &ProfileConfig::default())
            .unwrap_err();
        assert_eq!(err, "Invalid LM_MAX_TOKENS 'lots'.");
    }

    #[test]
    fn ocl_url_aliases_resolve() {
        let env = env_of(&[("OCL_URL", "staging"), ("OCL_TOKEN", "tok")]);
        let settings =
            Settings::resolve(&Overrides::default(), &env, &ProfileConfig::default()).unwrap();
        assert_eq!(settings.ocl_url, "https://api.staging.openconceptlab.org/");
        assert_eq!(settings.ocl_token.as_deref(), Some("tok"));
    }

    #[test]
    fn server_config_defaults_and_validation() {
        let config = ServerConfig::resolve(None, None, &env_of(&[])).unwrap();
        assert_eq!(config.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.log_format, LogFormat::Text);

        let env = env_of(&[("OCLCHAT_LOG_FORMAT", "json")]);
        let config = ServerConfig::resolve(Some("0.0.0.0:9000"), None, &env).unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(ServerConfig::resolve(Some("nope"), None, &env_of(&[])).is_err());
    }
}
