use crate::config::SessionConfig;
use crate::debug_if_enabled;
use crate::error::{KeeperError, Result};
use tracing::{info, warn};

/// Проверить, что процессу есть к какому X-серверу подключаться
pub fn check_display_environment(config: &SessionConfig) -> Result<()> {
    info!("Проверка окружения X11...");

    let display_name = resolve_display(
        config.display.as_deref(),
        std::env::var("DISPLAY").ok(),
    )?;
    info!("Используется дисплей {}", display_name);

    check_session_type(std::env::var("XDG_SESSION_TYPE").ok().as_deref());

    Ok(())
}

fn resolve_display(configured: Option<&str>, env_display: Option<String>) -> Result<String> {
    if let Some(configured_name) = configured {
        debug_if_enabled!("Дисплей задан в конфигурации: {}", configured_name);
        return Ok(configured_name.to_string());
    }

    match env_display {
        Some(env_name) if !env_name.is_empty() => Ok(env_name),
        _ => Err(KeeperError::ServiceUnavailable(
            "Переменная DISPLAY не задана и session.display не указан. Запустите внутри X-сессии".to_string(),
        )),
    }
}

fn check_session_type(session_type: Option<&str>) {
    match session_type {
        Some("wayland") => {
            warn!("⚠️  Сессия Wayland: через XWayland видны только X11-клиенты");
            warn!("   Раскладка для нативных Wayland-окон отслеживаться не будет");
        }
        Some(kind) => {
            debug_if_enabled!("Тип сессии: {}", kind);
        }
        None => {
            debug_if_enabled!("XDG_SESSION_TYPE не задан");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_display_wins() {
        let display_name = resolve_display(Some(":1"), Some(":0".to_string())).unwrap();
        assert_eq!(display_name, ":1");
    }

    #[test]
    fn test_env_display_used() {
        assert_eq!(resolve_display(None, Some(":0".to_string())).unwrap(), ":0");
    }

    #[test]
    fn test_check_with_configured_display() {
        let config = SessionConfig {
            display: Some(":7".to_string()),
            ..crate::config::Config::default().session
        };
        assert!(check_display_environment(&config).is_ok());
    }

    #[test]
    fn test_missing_display_is_fatal() {
        assert!(resolve_display(None, None).is_err());
        let err = resolve_display(None, Some(String::new())).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
