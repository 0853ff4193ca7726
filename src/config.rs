use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/psydoshy/foddaci/refs/heads/main/fodacci.txt";
pub const DEFAULT_PATH_PROXY: &str = "https://cors-anywhere.herokuapp.com/";
pub const DEFAULT_ENVELOPE_PROXY: &str = "https://api.allorigins.win/get?url=";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_ACKNOWLEDGE_MS: u64 = 800;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOTE: &str = "Clique em um nome para copiá-lo.";

/// Which retrieval chain the resolver runs.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPolicy {
    /// One direct request; its error is reported as-is.
    Single,
    /// Direct request, then each proxy in order, until one yields text.
    #[default]
    Fallback,
}

impl fmt::Display for RetrievalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalPolicy::Single => write!(f, "single"),
            RetrievalPolicy::Fallback => write!(f, "fallback"),
        }
    }
}

impl FromStr for RetrievalPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" | "single-source" => Ok(RetrievalPolicy::Single),
            "fallback" | "fallback-chain" => Ok(RetrievalPolicy::Fallback),
            other => Err(format!("unknown retrieval policy {other:?}")),
        }
    }
}

/// Fixed display strings. Defaults are the Portuguese labels of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub page_title: String,
    pub search_placeholder: String,
    pub notes_button: String,
    pub subtitle_all: String,
    pub subtitle_search: String,
    pub empty: String,
    pub counter_total: String,
    pub counter_found: String,
    pub noun_singular: String,
    pub noun_plural: String,
    pub load_error: String,
    pub retry: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            page_title: "Diretório de nomes".to_string(),
            search_placeholder: "Buscar nome...".to_string(),
            notes_button: "Notas".to_string(),
            subtitle_all: "Lista completa de nomes".to_string(),
            subtitle_search: "Resultados da busca".to_string(),
            empty: "Nenhum nome encontrado".to_string(),
            counter_total: "Total de".to_string(),
            counter_found: "Encontrados".to_string(),
            noun_singular: "nome".to_string(),
            noun_plural: "nomes".to_string(),
            load_error: "Nao foi possivel carregar os nomes. Verifique sua conexao.".to_string(),
            retry: "Tentar novamente".to_string(),
        }
    }
}

/// Runtime settings for a viewer: where the list lives and how the UI behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub source_url: String,
    pub policy: RetrievalPolicy,
    pub path_proxy: String,
    pub envelope_proxy: String,
    pub debounce_ms: u64,
    pub acknowledge_ms: u64,
    pub request_timeout_secs: u64,
    pub labels: Labels,
    /// Items of the notes dropdown. An empty list hides the dropdown.
    pub notes: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            policy: RetrievalPolicy::default(),
            path_proxy: DEFAULT_PATH_PROXY.to_string(),
            envelope_proxy: DEFAULT_ENVELOPE_PROXY.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            acknowledge_ms: DEFAULT_ACKNOWLEDGE_MS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            labels: Labels::default(),
            notes: vec![DEFAULT_NOTE.to_string()],
        }
    }
}

impl ViewerConfig {
    /// Loads a JSON config file; missing keys keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn acknowledge_window(&self) -> Duration {
        Duration::from_millis(self.acknowledge_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{"policy":"single","labels":{"retry":"Retry"}}"#)
            .expect("valid config");
        assert_eq!(config.policy, RetrievalPolicy::Single);
        assert_eq!(config.labels.retry, "Retry");
        assert_eq!(config.labels.empty, "Nenhum nome encontrado");
        assert_eq!(config.debounce_window(), Duration::from_millis(300));
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
    }

    #[test]
    fn policy_parses_both_spellings() {
        assert_eq!(
            "fallback-chain".parse::<RetrievalPolicy>(),
            Ok(RetrievalPolicy::Fallback)
        );
        assert_eq!(
            "Single".parse::<RetrievalPolicy>(),
            Ok(RetrievalPolicy::Single)
        );
        assert!("sometimes".parse::<RetrievalPolicy>().is_err());
    }

    #[test]
    fn notes_default_to_one_item_and_can_be_cleared() {
        assert_eq!(ViewerConfig::default().notes.len(), 1);
        let config = ViewerConfig::from_json(r#"{"notes":[]}"#).expect("valid config");
        assert!(config.notes.is_empty());
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            ViewerConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
