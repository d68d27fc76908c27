use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyProfile {
    Permissive,
    Standard,
}

impl SafetyProfile {
    pub fn threshold(self) -> &'static str {
        match self {
            SafetyProfile::Permissive => "OFF",
            SafetyProfile::Standard => "BLOCK_MEDIUM_AND_ABOVE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub image_model: String,
    pub timeout: Duration,
    pub safety: SafetyProfile,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub gemini: GeminiConfig,
    /// Problems found while loading, logged once logging is up.
    pub warnings: Vec<String>,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn non_blank_or(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_safety_profile(value: &str) -> (SafetyProfile, Option<String>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return (SafetyProfile::Permissive, None);
    }

    match trimmed.to_lowercase().as_str() {
        "permissive" | "off" | "none" => (SafetyProfile::Permissive, None),
        "standard" => (SafetyProfile::Standard, None),
        _ => (
            SafetyProfile::Permissive,
            Some(format!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{value}'; defaulting to permissive."
            )),
        ),
    }
}

impl Config {
    /// Reads the environment. A missing API key is not an error here; the
    /// first generation call reports it.
    pub fn load() -> Self {
        let api_base = non_blank_or(env_string("GEMINI_API_BASE", ""), DEFAULT_GEMINI_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let (safety, safety_warning) =
            normalize_safety_profile(&env_string("GEMINI_SAFETY_SETTINGS", "permissive"));

        Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(non_blank_or(env_string("LOG_DIR", ""), "logs")),
            gemini: GeminiConfig {
                api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
                api_base,
                image_model: non_blank_or(
                    env_string("GEMINI_IMAGE_MODEL", ""),
                    DEFAULT_GEMINI_IMAGE_MODEL,
                ),
                timeout: Duration::from_secs(env_u64("GEMINI_TIMEOUT_SECONDS", 90).max(1)),
                safety,
            },
            warnings: safety_warning.into_iter().collect(),
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            image_model: DEFAULT_GEMINI_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(90),
            safety: SafetyProfile::Permissive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_profile_accepts_known_aliases() {
        assert_eq!(
            normalize_safety_profile("standard"),
            (SafetyProfile::Standard, None)
        );
        assert_eq!(
            normalize_safety_profile(" OFF "),
            (SafetyProfile::Permissive, None)
        );
        assert_eq!(normalize_safety_profile(""), (SafetyProfile::Permissive, None));
        assert_eq!(SafetyProfile::Standard.threshold(), "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn unknown_safety_profile_is_reported_not_logged() {
        let (profile, warning) = normalize_safety_profile("strict");
        assert_eq!(profile, SafetyProfile::Permissive);
        let warning = warning.unwrap();
        assert!(warning.contains("'strict'"));
        assert!(warning.contains("GEMINI_SAFETY_SETTINGS"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        assert_eq!(non_blank_or("  ".to_string(), "logs"), "logs");
        assert_eq!(non_blank_or(" out ".to_string(), "logs"), "out");
    }

    #[test]
    fn gemini_config_defaults_to_flash_image_model() {
        let config = GeminiConfig::new("key");
        assert_eq!(config.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.safety, SafetyProfile::Permissive);
    }
}
