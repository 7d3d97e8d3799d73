use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use qualcel_core::config::{AppConfig, DEFAULT_CONFIG_FILE};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One reported setting: dotted key, rendered value, and the env vars that
/// can supply it, in lookup order.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    Field { key, value, env_keys }
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let lines = render(&config, config_file_doc.as_ref(), config_file_path.as_deref());

    CommandResult::success("config", lines.join("\n"))
}

fn render(config: &AppConfig, doc: Option<&Value>, doc_path: Option<&Path>) -> Vec<String> {
    let header = "effective config (source precedence: override > env > file > default):";
    std::iter::once(header.to_string())
        .chain(fields(config).into_iter().map(|field| {
            let source = field_source(field.key, field.env_keys, doc, doc_path);
            format!("- {} = {} (source: {source})", field.key, field.value)
        }))
        .collect()
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        field("database.url", config.database.url.clone(), &["QUALCEL_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["QUALCEL_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["QUALCEL_DATABASE_TIMEOUT_SECS"],
        ),
        field("llm.provider", config.llm.provider.as_str().to_string(), &["QUALCEL_LLM_PROVIDER"]),
        field(
            "llm.api_key",
            redact_secret(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
            &["QUALCEL_LLM_API_KEY", "GEMINI_API_KEY"],
        ),
        field("llm.base_url", config.llm.base_url.clone(), &["QUALCEL_LLM_BASE_URL"]),
        field("llm.model", config.llm.model.clone(), &["QUALCEL_LLM_MODEL"]),
        field(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["QUALCEL_LLM_TIMEOUT_SECS"],
        ),
        field(
            "llm.temperature",
            config.llm.temperature.to_string(),
            &["QUALCEL_LLM_TEMPERATURE"],
        ),
        field(
            "ranking.url",
            config.ranking.url.clone(),
            &["QUALCEL_RANKING_URL", "RECOMMENDATION_SERVICE_URL"],
        ),
        field(
            "ranking.timeout_ms",
            config.ranking.timeout_ms.to_string(),
            &["QUALCEL_RANKING_TIMEOUT_MS", "RECOMMENDATION_SERVICE_TIMEOUT"],
        ),
        field("ranking.top_n", config.ranking.top_n.to_string(), &["QUALCEL_RANKING_TOP_N"]),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["QUALCEL_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["QUALCEL_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["QUALCEL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["QUALCEL_LOGGING_LEVEL", "QUALCEL_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["QUALCEL_LOGGING_FORMAT", "QUALCEL_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config/qualcel.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_secret(secret: Option<&str>) -> String {
    match secret.map(str::trim) {
        None => "<unset>".to_string(),
        Some("") => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use qualcel_core::config::AppConfig;
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, field_source, redact_secret, render};

    #[test]
    fn secrets_never_render_in_clear_text() {
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some("  ")), "<empty>");
        assert_eq!(redact_secret(Some("AIza-live-key")), "<redacted>");

        let mut config = AppConfig::default();
        config.llm.api_key = Some(SecretString::from("AIza-live-key".to_string()));
        let rendered = render(&config, None, None).join("\n");

        assert!(!rendered.contains("AIza-live-key"));
        assert!(rendered.contains("- llm.api_key = <redacted>"));
    }

    #[test]
    fn file_values_are_attributed_to_the_file() {
        let doc: Value = "[ranking]\ntop_n = 2\n".parse().expect("toml");
        let path = Path::new("config/qualcel.toml");

        assert!(contains_path(&doc, "ranking.top_n"));
        assert!(!contains_path(&doc, "ranking.url"));
        assert_eq!(
            field_source("ranking.top_n", &["QUALCEL_TEST_UNSET_VAR"], Some(&doc), Some(path)),
            "file (config/qualcel.toml)"
        );
        assert_eq!(
            field_source("ranking.url", &["QUALCEL_TEST_UNSET_VAR"], Some(&doc), Some(path)),
            "default"
        );
    }

    #[test]
    fn render_lists_every_section() {
        let rendered = render(&AppConfig::default(), None, None);

        for key in ["database.url", "llm.provider", "ranking.timeout_ms", "server.port"] {
            assert!(
                rendered.iter().any(|line| line.starts_with(&format!("- {key} = "))),
                "missing {key}"
            );
        }
        assert!(rendered.iter().any(|line| line == "- ranking.top_n = 3 (source: default)"));
    }
}
