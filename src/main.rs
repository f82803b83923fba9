use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::{Config, LoggingConfig};
use services::create_focus_tracker;

#[derive(Parser, Debug)]
#[command(name = "xkb-keeper")]
#[command(about = "Запоминает раскладку клавиатуры для каждого окна X11 и восстанавливает её при смене фокуса")]
struct Args {
    /// Путь к файлу конфигурации (необязательный)
    #[arg(short, long, default_value = "xkb-keeper.toml")]
    config: String,

    /// Режим сухого запуска (эмуляция окон вместо X-сервера)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает конфигурацию)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let mut config = Config::load(&args.config)?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
        config.validate()?;
    }

    // Инициализация системы логирования
    init_tracing(&config.logging)?;

    info!("Запуск xkb-keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена (файл: {})", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - X-сервер не используется, окна эмулируются");
    } else {
        utils::display::check_display_environment(&config.session)?;
    }

    let tracker = create_focus_tracker(&config, args.dry_run)?;
    let shutdown = tracker.shutdown_handle();
    info!("Все компоненты инициализированы");

    // Трекер блокируется на ожидании событий X11, поэтому живёт в отдельном потоке
    let (done_tx, mut done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("focus-tracker".to_string())
        .spawn(move || {
            let _ = done_tx.send(tracker.run());
        })?;

    tokio::select! {
        result = &mut done_rx => match result {
            Ok(Ok(())) => {
                info!("FocusTracker завершил работу");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("FocusTracker остановлен: {}", e);
                Err(e.into())
            }
            Err(_) => {
                error!("Поток FocusTracker завершился аварийно");
                anyhow::bail!("Поток FocusTracker завершился без результата")
            }
        },
        res = signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }

            // Будим трекер, чтобы он вышел из цикла и закрыл соединение с X-сервером
            if let Err(e) = shutdown.request() {
                warn!("Не удалось остановить FocusTracker: {}", e);
            }

            let shutdown_timeout = Duration::from_secs(5);
            match tokio::time::timeout(shutdown_timeout, done_rx).await {
                Ok(Ok(Ok(()))) => info!("FocusTracker завершил работу корректно"),
                Ok(Ok(Err(e))) => warn!("FocusTracker завершился с ошибкой: {}", e),
                Ok(Err(_)) => warn!("Поток FocusTracker завершился аварийно"),
                Err(_) => warn!("Таймаут при завершении FocusTracker"),
            }

            info!("xkb-keeper завершил работу");
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format.as_str() {
        "full" => registry.with(tracing_subscriber::fmt::layer()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
    }

    Ok(())
}
