use crate::config::SessionConfig;
use crate::error::Result;
use crate::events::{Atom, LayoutGroup, Notification, Transition, WindowId};
use crate::services::session::WindowSession;
use crate::services::PropertyStore;
use crate::trace_if_enabled;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::r#trait::{FocusTrackerTrait, ShutdownHandle};

/// Отслеживает смену активного окна и переносит группу раскладки.
///
/// Единственное состояние: последнее известное активное окно. Оно может
/// указывать на уже уничтоженное окно, это нормально.
pub struct FocusTracker {
    session: Arc<dyn WindowSession>,
    store: PropertyStore,
    root: WindowId,
    active_window_atom: Atom,
    last_active: WindowId,
}

impl FocusTracker {
    pub fn new(session: Arc<dyn WindowSession>, config: &SessionConfig) -> Result<Self> {
        info!("Инициализация FocusTracker");

        let root = session.root_window();
        let active_window_atom = session.intern_atom(&config.active_window_property)?;
        let store = PropertyStore::new(session.clone(), &config.group_property)?;

        // Без подписки трекер бесполезен, ошибка здесь фатальна
        session.subscribe_property_changes(root)?;

        let mut tracker = Self {
            session,
            store,
            root,
            active_window_atom,
            last_active: root,
        };
        tracker.last_active = tracker.query_active_window()?;

        info!("Начальное активное окно: {}", tracker.last_active);
        Ok(tracker)
    }

    pub fn last_active(&self) -> WindowId {
        self.last_active
    }

    /// Обработать одно уведомление. `Some` только если произошёл переход.
    pub fn handle_notification(&mut self, notification: Notification) -> Result<Option<Transition>> {
        match notification {
            Notification::PropertyChanged { window, atom }
                if window == self.root && atom == self.active_window_atom =>
            {
                self.on_active_window_changed()
            }
            Notification::ProtocolError(desc) => {
                warn!("Ошибка X11 (вероятно, окно или атом уже не существует), игнорируем: {}", desc);
                Ok(None)
            }
            other => {
                trace_if_enabled!("Другое событие: {}", other);
                Ok(None)
            }
        }
    }

    fn on_active_window_changed(&mut self) -> Result<Option<Transition>> {
        let new_active = self.query_active_window()?;
        if new_active == self.last_active {
            debug!("Активное окно {} не изменилось", new_active);
            return Ok(None);
        }

        // Порядок важен: текущая группа читается до того, как её перезапишет новое окно
        let current_group = self.session.current_group()?;
        let stored = self.store.load(new_active)?;
        let restored_group = stored.unwrap_or(current_group);

        self.store.store(self.last_active, current_group)?;
        self.apply_group(restored_group)?;

        let transition = Transition {
            from: self.last_active,
            to: new_active,
            saved_group: current_group,
            restored_group,
            restored_from_window: stored.is_some(),
        };
        info!("Смена окна: {}", transition);

        self.last_active = new_active;
        Ok(Some(transition))
    }

    fn query_active_window(&self) -> Result<WindowId> {
        match self.session.query_active_window() {
            Ok(window) => Ok(window),
            Err(e) if e.is_recoverable() => {
                warn!("Не удалось определить активное окно ({}), используем корневое", e);
                Ok(self.root)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_group(&self, group: LayoutGroup) -> Result<()> {
        match self.session.set_current_group(group) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!("Не удалось установить {}: {}", group, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn run_impl(mut self) -> Result<()> {
        info!("FocusTracker запущен");

        loop {
            match self.session.next_notification()? {
                Notification::Interrupted => {
                    info!("FocusTracker остановлен, последнее активное окно {}", self.last_active);
                    return Ok(());
                }
                notification => {
                    self.handle_notification(notification)?;
                }
            }
        }
    }
}

impl FocusTrackerTrait for FocusTracker {
    fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl()
    }

    fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.session.clone())
    }
}
