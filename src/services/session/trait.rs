use crate::config::Config;
use crate::error::Result;
use crate::events::{Atom, LayoutGroup, Notification, WindowId};
use std::sync::Arc;

/// Примитивы оконной сессии, которыми пользуется трекер.
///
/// Все вызовы синхронные и идут к серверу напрямую, без кэша.
/// Ошибки, относящиеся к конкретному окну или атому, должны приходить как
/// восстановимые (`KeeperError::is_recoverable`), а не обрывать соединение.
pub trait WindowSession: Send + Sync {
    /// Корневое окно экрана
    fn root_window(&self) -> WindowId;

    /// Получить атом по имени (создаётся, если его ещё нет)
    fn intern_atom(&self, name: &str) -> Result<Atom>;

    /// Подписаться на изменения свойств окна
    fn subscribe_property_changes(&self, window: WindowId) -> Result<()>;

    /// Блокирующее ожидание следующего уведомления
    fn next_notification(&self) -> Result<Notification>;

    /// Разбудить поток, ждущий в `next_notification`: он получит
    /// `Notification::Interrupted`. Можно вызывать из любого потока.
    fn interrupt(&self) -> Result<()>;

    /// Активное окно, либо корневое, если фокуса нет
    fn query_active_window(&self) -> Result<WindowId>;

    fn current_group(&self) -> Result<LayoutGroup>;

    fn set_current_group(&self, group: LayoutGroup) -> Result<()>;

    /// 32-битные элементы свойства с типом, равным самому свойству.
    /// `None`, если свойства нет, тип не совпадает или формат не 32.
    fn window_property(&self, window: WindowId, property: Atom) -> Result<Option<Vec<u32>>>;

    /// Записать свойство (тип = само свойство, формат 32), заменив прежнее значение
    fn set_window_property(&self, window: WindowId, property: Atom, data: &[u32]) -> Result<()>;
}

/// Factory function to create an appropriate session based on the dry_run flag
pub fn create_session(config: &Config, dry_run: bool) -> Result<Arc<dyn WindowSession>> {
    if dry_run {
        Ok(Arc::new(super::memory::MemorySession::emulated(config)))
    } else {
        Ok(Arc::new(super::x11::X11Session::connect(&config.session)?))
    }
}
