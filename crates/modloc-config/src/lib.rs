use serde::Deserialize;

pub const DEFAULT_SOURCE_LANG: &str = "en_us";
pub const DEFAULT_TARGET_LANG: &str = "zh_cn";
pub const DEFAULT_BATCH_SIZE: usize = 40;
pub const DEFAULT_WAIT_SECS: f64 = 3.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModLocConfig {
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub work_dir: Option<String>,
    pub translator: Option<TranslatorCfg>,
    pub batch: Option<BatchCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslatorCfg {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub wait_secs: Option<f64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchCfg {
    pub size: Option<usize>,
}

/// Translator options after validation: everything present and sane.
/// The driver refuses to run without one of these.
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    pub api_url: String,
    pub api_key: String,
    pub model_id: String,
    pub wait_secs: f64,
    pub timeout_secs: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting `{0}` (add it to modloc.toml)")]
    Missing(&'static str),
    #[error("invalid value for `{0}`: {1}")]
    Invalid(&'static str, String),
    #[error("{0}")]
    Other(String),
}

impl ModLocConfig {
    pub fn source_lang(&self) -> &str {
        self.source_lang.as_deref().unwrap_or(DEFAULT_SOURCE_LANG)
    }

    pub fn target_lang(&self) -> &str {
        self.target_lang.as_deref().unwrap_or(DEFAULT_TARGET_LANG)
    }

    pub fn batch_size(&self) -> usize {
        self.batch
            .as_ref()
            .and_then(|b| b.size)
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Validate the translator section into a complete settings struct.
    /// Absence of any required field is a reported precondition failure.
    pub fn translator_settings(&self) -> Result<TranslatorSettings, ConfigError> {
        let t = self
            .translator
            .as_ref()
            .ok_or(ConfigError::Missing("translator"))?;
        let api_url = t
            .api_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("translator.api_url"))?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "translator.api_url",
                format!("`{api_url}` is not an http(s) URL"),
            ));
        }
        let api_key = t
            .api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("translator.api_key"))?;
        let model_id = t
            .model_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("translator.model_id"))?;
        let wait_secs = t.wait_secs.unwrap_or(DEFAULT_WAIT_SECS);
        if wait_secs <= 0.0 {
            return Err(ConfigError::Invalid(
                "translator.wait_secs",
                "must be greater than zero".into(),
            ));
        }
        let timeout_secs = t.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "translator.timeout_secs",
                "must be greater than zero".into(),
            ));
        }
        Ok(TranslatorSettings {
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            wait_secs,
            timeout_secs,
        })
    }
}

pub fn load_config() -> Result<ModLocConfig, ConfigError> {
    // Search order: CWD/modloc.toml, $HOME/.config/modloc/modloc.toml
    let mut merged = ModLocConfig::default();
    if let Ok(p) = std::env::current_dir() {
        let path = p.join("modloc.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<ModLocConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    if let Some(base) = dirs::config_dir() {
        let path = base.join("modloc").join("modloc.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<ModLocConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    Ok(merged)
}

fn merge(mut a: ModLocConfig, b: ModLocConfig) -> ModLocConfig {
    if a.source_lang.is_none() {
        a.source_lang = b.source_lang;
    }
    if a.target_lang.is_none() {
        a.target_lang = b.target_lang;
    }
    if a.work_dir.is_none() {
        a.work_dir = b.work_dir;
    }
    a.translator = merge_opt(a.translator, b.translator, merge_translator);
    a.batch = merge_opt(a.batch, b.batch, merge_batch);
    a
}

fn merge_opt<T: Default>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_translator(mut a: TranslatorCfg, b: TranslatorCfg) -> TranslatorCfg {
    if a.api_url.is_none() {
        a.api_url = b.api_url;
    }
    if a.api_key.is_none() {
        a.api_key = b.api_key;
    }
    if a.model_id.is_none() {
        a.model_id = b.model_id;
    }
    if a.wait_secs.is_none() {
        a.wait_secs = b.wait_secs;
    }
    if a.timeout_secs.is_none() {
        a.timeout_secs = b.timeout_secs;
    }
    a
}

fn merge_batch(mut a: BatchCfg, b: BatchCfg) -> BatchCfg {
    if a.size.is_none() {
        a.size = b.size;
    }
    a
}
