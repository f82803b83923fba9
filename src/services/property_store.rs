use crate::error::Result;
use crate::events::{Atom, LayoutGroup, WindowId};
use crate::services::session::WindowSession;
use std::sync::Arc;
use tracing::{debug, warn};

/// Хранилище группы раскладки в свойстве самого окна.
///
/// Значение живёт на стороне X-сервера и умирает вместе с окном,
/// поэтому никакой локальной таблицы окон здесь нет и быть не должно.
pub struct PropertyStore {
    session: Arc<dyn WindowSession>,
    property: Atom,
    property_name: String,
}

impl PropertyStore {
    pub fn new(session: Arc<dyn WindowSession>, property_name: &str) -> Result<Self> {
        let property = session.intern_atom(property_name)?;
        debug!("Свойство {} -> {}", property_name, property);

        Ok(Self {
            session,
            property,
            property_name: property_name.to_string(),
        })
    }

    /// Сохранённая за окном группа.
    ///
    /// `None` (промах), если свойства нет, окно уже закрыто или значение
    /// не является ровно одним числом. Наружу уходят только фатальные ошибки.
    pub fn load(&self, window: WindowId) -> Result<Option<LayoutGroup>> {
        let data = match self.session.window_property(window, self.property) {
            Ok(data) => data,
            Err(e) if e.is_recoverable() => {
                warn!("Не удалось прочитать {} у окна {}: {}", self.property_name, window, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(data) = data else {
            warn!(
                "{} не задано для окна {} (или окно уже закрыто)",
                self.property_name, window
            );
            return Ok(None);
        };

        match LayoutGroup::from_property_values(&data) {
            Some(group) => Ok(Some(group)),
            None => {
                warn!(
                    "{} у окна {} имеет неверный формат ({} значений), игнорируем",
                    self.property_name,
                    window,
                    data.len()
                );
                Ok(None)
            }
        }
    }

    /// Записать группу в свойство окна, заменив прежнее значение.
    ///
    /// Окно могло закрыться между уведомлением и этим вызовом: такая ошибка
    /// только логируется.
    pub fn store(&self, window: WindowId, group: LayoutGroup) -> Result<()> {
        match self
            .session
            .set_window_property(window, self.property, &[group.to_property_value()])
        {
            Ok(()) => {
                debug!("Окну {} сохранена {}", window, group);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!("Не удалось сохранить {} для окна {}: {}", group, window, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::MemorySession;
    use parking_lot::Mutex;
    use std::io;

    const PROPERTY: &str = "WTFKB_GROUP";

    /// Writer для fmt-подписчика, складывающий вывод в общий буфер
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Выполнить `f`, собрав все сообщения уровня WARN и выше
    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let writer = CaptureWriter::default();
        let buffer = writer.0.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8_lossy(&buffer.lock()).into_owned();
        (result, output)
    }

    fn store_with_session() -> (Arc<MemorySession>, PropertyStore) {
        let session = Arc::new(MemorySession::new(4));
        let store = PropertyStore::new(session.clone(), PROPERTY).unwrap();
        (session, store)
    }

    #[test]
    fn test_store_then_load() {
        let (session, store) = store_with_session();
        let window = session.create_window();

        store.store(window, LayoutGroup(2)).unwrap();
        assert_eq!(store.load(window).unwrap(), Some(LayoutGroup(2)));

        // запись заменяет прежнее значение
        store.store(window, LayoutGroup(1)).unwrap();
        assert_eq!(store.load(window).unwrap(), Some(LayoutGroup(1)));
        assert_eq!(session.stored_group(window, PROPERTY), Some(LayoutGroup(1)));
    }

    #[test]
    fn test_load_missing_property_is_miss() {
        let (session, store) = store_with_session();
        let window = session.create_window();
        assert_eq!(store.load(window).unwrap(), None);
    }

    #[test]
    fn test_load_malformed_property_is_miss() {
        let (session, store) = store_with_session();
        let window = session.create_window();

        session.put_raw_property(window, PROPERTY, vec![0, 0]);
        assert_eq!(store.load(window).unwrap(), None);
    }

    #[test]
    fn test_vanished_window_is_absorbed() {
        let (session, store) = store_with_session();
        let window = session.create_window();
        store.store(window, LayoutGroup(1)).unwrap();

        session.destroy_window(window);

        assert_eq!(store.load(window).unwrap(), None);
        assert!(store.store(window, LayoutGroup(3)).is_ok());
    }

    #[test]
    fn test_miss_is_reported_as_warning() {
        let (session, store) = store_with_session();
        let window = session.create_window();

        let (loaded, output) = capture_warnings(|| store.load(window).unwrap());

        assert_eq!(loaded, None);
        assert!(output.contains("WARN"), "нет предупреждения: {output:?}");
        assert!(output.contains(PROPERTY));
        assert!(output.contains(&window.to_string()));
    }

    #[test]
    fn test_absorbed_store_error_is_reported_as_warning() {
        let (session, store) = store_with_session();
        let window = session.create_window();
        session.destroy_window(window);

        let (result, output) = capture_warnings(|| store.store(window, LayoutGroup(1)));

        assert!(result.is_ok());
        assert!(output.contains("WARN"), "нет предупреждения: {output:?}");
        assert!(output.contains(&window.to_string()));
        assert!(output.contains(&LayoutGroup(1).to_string()));
    }

    #[test]
    fn test_successful_load_is_silent() {
        let (session, store) = store_with_session();
        let window = session.create_window();
        store.store(window, LayoutGroup(1)).unwrap();

        let (loaded, output) = capture_warnings(|| store.load(window).unwrap());

        assert_eq!(loaded, Some(LayoutGroup(1)));
        assert!(output.is_empty(), "лишний вывод: {output:?}");
    }
}
