use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Имя свойства окна, под которым хранится группа раскладки
pub const DEFAULT_GROUP_PROPERTY: &str = "WTFKB_GROUP";
/// Свойство корневого окна с активным окном (EWMH)
pub const DEFAULT_ACTIVE_WINDOW_PROPERTY: &str = "_NET_ACTIVE_WINDOW";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Дисплей X11; `None` означает переменную DISPLAY
    #[serde(default)]
    pub display: Option<String>,
    pub group_property: String,
    pub active_window_property: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DryRunConfig {
    pub switch_interval_ms: u64,
    pub windows: usize,
    pub groups: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
            session: SessionConfig {
                display: None,
                group_property: DEFAULT_GROUP_PROPERTY.to_string(),
                active_window_property: DEFAULT_ACTIVE_WINDOW_PROPERTY.to_string(),
            },
            dry_run: DryRunConfig {
                switch_interval_ms: 5000,
                windows: 3,
                groups: 2,
            },
        }
    }
}

impl Config {
    /// Загрузка: значения по умолчанию, затем TOML-файл (если есть),
    /// затем переменные окружения `XKB_KEEPER_*`.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(config_path))
                .merge(Env::prefixed("XKB_KEEPER_").split("__")),
        )
        .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "full" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Имена свойств уходят в InternAtom как есть
        for (key, name) in [
            ("group_property", &self.session.group_property),
            ("active_window_property", &self.session.active_window_property),
        ] {
            if name.is_empty() {
                anyhow::bail!("Пустое имя свойства в session.{}", key);
            }
            if !name.is_ascii() {
                anyhow::bail!("Имя свойства session.{} должно быть ASCII: {}", key, name);
            }
        }

        if self.dry_run.switch_interval_ms < 100 {
            anyhow::bail!("dry_run.switch_interval_ms должно быть минимум 100");
        }

        if self.dry_run.windows < 2 {
            anyhow::bail!("dry_run.windows должно быть минимум 2");
        }

        // XKB поддерживает не более четырёх групп
        if !(1..=4).contains(&self.dry_run.groups) {
            anyhow::bail!("dry_run.groups должно быть от 1 до 4: {}", self.dry_run.groups);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.group_property, "WTFKB_GROUP");
        assert_eq!(config.session.active_window_property, "_NET_ACTIVE_WINDOW");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.group_property = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.active_window_property = "АКТИВНОЕ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dry_run.groups = 5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dry_run.windows = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(
            r#"
            [logging]
            level = "debug"

            [session]
            group_property = "MY_GROUP"
            "#,
        ));

        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.session.group_property, "MY_GROUP");
        assert_eq!(config.dry_run.windows, 3);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/xkb-keeper.toml").unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
