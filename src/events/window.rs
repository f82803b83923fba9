use super::keyboard::LayoutGroup;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна, выданный X-сервером.
///
/// Слабая ссылка: окно может быть уничтожено в любой момент, любые операции
/// с ним должны переживать ошибку "окно не существует".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    /// `None` в терминах X11
    pub const NONE: WindowId = WindowId(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Атом X11 (интернированное имя свойства)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom(pub u32);

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Уведомление от оконной сессии
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Изменилось свойство `atom` у окна `window`
    PropertyChanged { window: WindowId, atom: Atom },
    /// Асинхронная ошибка протокола, пришедшая в потоке событий
    ProtocolError(String),
    /// Любое другое событие
    Other(String),
    /// Запрошена остановка (см. `WindowSession::interrupt`)
    Interrupted,
}

impl Notification {
    pub fn property_changed(window: WindowId, atom: Atom) -> Self {
        Self::PropertyChanged { window, atom }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertyChanged { window, atom } => write!(f, "PropertyChanged({}, {})", window, atom),
            Self::ProtocolError(desc) => write!(f, "ProtocolError({})", desc),
            Self::Other(desc) => write!(f, "Other({})", desc),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Результат одного перехода фокуса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: WindowId,
    pub to: WindowId,
    /// Группа, сохранённая за окном, которое потеряло фокус
    pub saved_group: LayoutGroup,
    /// Группа, установленная для окна, получившего фокус
    pub restored_group: LayoutGroup,
    /// `false`, если у нового окна не было сохранённой группы
    pub restored_from_window: bool,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {} ({}{})",
            self.from,
            self.saved_group,
            self.to,
            self.restored_group,
            if self.restored_from_window { "" } else { ", текущая" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_id_display() {
        assert_eq!(WindowId(0x1a00007).to_string(), "0x01a00007");
        assert!(WindowId::NONE.is_none());
        assert!(!WindowId(1).is_none());
    }

    #[test]
    fn test_transition_display_marks_fallback() {
        let transition = Transition {
            from: WindowId(1),
            to: WindowId(2),
            saved_group: LayoutGroup(0),
            restored_group: LayoutGroup(0),
            restored_from_window: false,
        };

        assert!(transition.to_string().contains("текущая"));
    }
}
