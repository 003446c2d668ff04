// 配置系统测试

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::plugins::{InlinePlugin, PluginConfigEntry};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert!(config.plugins.is_empty());
        assert!(config.config_dir.is_none());
        assert!(config.report.color);
        assert!(config.report.print);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "full");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[report]
color = false
print = true

[logging]
level = "debug"
format = "compact"
file_enabled = false

[environment]
name = "test"
debug = false
version = "0.0.0"

[[plugins]]
path = "plugins/*.js"

[[plugins]]
name = "console"
package = "console-plugin"

[plugins.parameters]
verbose = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();

        assert_eq!(config.plugins.len(), 2);
        assert_eq!(config.plugins[0].path.as_deref(), Some("plugins/*.js"));
        assert_eq!(config.plugins[1].name.as_deref(), Some("console"));
        assert_eq!(config.plugins[1].package.as_deref(), Some("console-plugin"));
        assert_eq!(
            config.plugins[1].parameters.get("verbose"),
            Some(&serde_json::Value::Bool(true))
        );
        assert!(!config.report.color);
        assert_eq!(config.logging.level, "debug");
        assert!(config.is_test());
        assert_eq!(config.base_dir(), dir.path());
        assert_eq!(config.environment.version, env!("CARGO_PKG_VERSION"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(&path, "plugins = \"not a list\"").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AppConfig::default();

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "info".to_string();
        config.logging.file_enabled = true;
        assert!(config.validate().is_err());

        config.logging.file_directory = Some("./logs".to_string());
        assert!(config.validate().is_ok());

        config.environment.name = "staging".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("environment.name"));
    }

    #[test]
    fn test_environment_methods() {
        let mut config = AppConfig::default();

        config.environment.name = "development".to_string();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.is_test());

        config.environment.name = "production".to_string();
        assert!(!config.is_development());
        assert!(config.is_production());
        assert!(!config.is_test());

        config.environment.name = "test".to_string();
        assert!(!config.is_development());
        assert!(!config.is_production());
        assert!(config.is_test());
    }

    #[test]
    fn test_config_validator_plugins() {
        assert!(ConfigValidator::validate_plugin(0, &PluginConfigEntry::path("a.js")).is_ok());
        assert!(ConfigValidator::validate_plugin(0, &PluginConfigEntry::package("pkg")).is_ok());
        assert!(
            ConfigValidator::validate_plugin(0, &PluginConfigEntry::inline(InlinePlugin::new().into_arc()))
                .is_ok()
        );

        let err = ConfigValidator::validate_plugin(2, &PluginConfigEntry::default()).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("plugins[2]"));

        let mut both = PluginConfigEntry::path("a.js");
        both.package = Some("pkg".to_string());
        assert!(ConfigValidator::validate_plugin(0, &both).is_err());

        let unnamed = PluginConfigEntry::path("a.js").with_name("");
        assert!(ConfigValidator::validate_plugin(0, &unnamed).is_err());
    }

    #[test]
    fn test_validate_all_collects_every_error() {
        let mut config = AppConfig::default();
        config.plugins = vec![PluginConfigEntry::default(), PluginConfigEntry::default()];
        config.logging.format = "xml".to_string();

        let errors = ConfigValidator::validate_all(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_config_validator_logging() {
        let mut logging = crate::logging::LoggingSetup::production_config();
        assert!(ConfigValidator::validate_logging(&logging).is_ok());

        logging.format = "yaml".to_string();
        assert!(ConfigValidator::validate_logging(&logging).is_err());

        logging.format = "json".to_string();
        logging.level = "WARN".to_string();
        assert!(ConfigValidator::validate_logging(&logging).is_ok());
    }
}
