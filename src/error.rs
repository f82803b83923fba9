use crate::events::{LayoutGroup, WindowId};
use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connect(#[from] ConnectError),

    #[error("Соединение с X-сервером потеряно: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Ошибка протокола X11: {0:?}")]
    Protocol(X11Error),

    #[error("Окно {0} не существует")]
    WindowNotFound(WindowId),

    #[error("Недопустимая группа раскладки: {0}")]
    InvalidGroup(LayoutGroup),

    #[error("Расширение недоступно: {0}")]
    ExtensionUnavailable(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl From<ReplyError> for KeeperError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::ConnectionError(e) => KeeperError::Connection(e),
            ReplyError::X11Error(e) => KeeperError::Protocol(e),
        }
    }
}

impl From<ReplyOrIdError> for KeeperError {
    fn from(err: ReplyOrIdError) -> Self {
        match err {
            ReplyOrIdError::IdsExhausted => {
                KeeperError::Internal("X-сервер не выдал идентификатор окна".to_string())
            }
            ReplyOrIdError::ConnectionError(e) => KeeperError::Connection(e),
            ReplyOrIdError::X11Error(e) => KeeperError::Protocol(e),
        }
    }
}

impl KeeperError {
    /// Ошибка относится к конкретному окну/атому, которое могло исчезнуть
    /// между уведомлением и его обработкой. Такие ошибки логируются,
    /// вызывающий код подставляет значение по умолчанию и продолжает работу.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeeperError::Protocol(_) | KeeperError::WindowNotFound(_) | KeeperError::InvalidGroup(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KeeperError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! keeper_error {
    (extension, $($arg:tt)*) => {
        $crate::error::KeeperError::ExtensionUnavailable(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::KeeperError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::KeeperError::Internal(format!($($arg)*))
    };
}
