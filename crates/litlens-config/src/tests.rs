#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9100

            [llm]
            model = "gpt-4o"
            api_key = "sk-from-file"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "sk-from-file");
        assert_eq!(config.analytics.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let config = Config::from_toml_str("[llm]\napi_key = \"  \"\n").unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LITLENS_DATABASE_URL", "sqlite::memory:"),
            ("LITLENS_PORT", "9999"),
            ("OPENAI_API_KEY", "sk-env"),
            ("LITLENS_CONTACT_EMAIL", "lab@example.org"),
        ]);
        let mut config = Config::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "sk-env");
        assert_eq!(config.sources.contact_email.as_deref(), Some("lab@example.org"));
    }

    #[test]
    fn test_prefixed_key_wins_over_generic() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LITLENS_OPENAI_API_KEY", "sk-litlens"),
            ("OPENAI_API_KEY", "sk-generic"),
        ]);
        let mut config = Config::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "sk-litlens");
    }

    #[test]
    fn test_bad_port_is_ignored() {
        let mut config = Config::default();
        config.apply_env_from(|k| (k == "LITLENS_PORT").then(|| "eighty".to_string()));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = Config::default();
        config.analytics.text_weight = 0.9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.triage.alert_threshold = 120.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compatible_provider_needs_base_url() {
        let config = Config::from_toml_str("[llm]\nprovider = \"openai_compatible\"\n").unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_toml_str(
            "[llm]\nprovider = \"openai_compatible\"\nbase_url = \"http://localhost:1234\"\n",
        )
        .unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_load_reads_file_from_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[triage]\nalert_threshold = 65.0\n").unwrap();

        std::env::set_var("LITLENS_CONFIG", &path);
        let config = Config::load().unwrap();
        std::env::remove_var("LITLENS_CONFIG");

        assert_eq!(config.triage.alert_threshold, 65.0);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        assert!(matches!(Config::from_toml_str("[server\nport = 1"), Err(ConfigError::Parse(_))));
    }
}
