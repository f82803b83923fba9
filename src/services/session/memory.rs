use crate::config::{Config, DEFAULT_ACTIVE_WINDOW_PROPERTY};
use crate::error::{KeeperError, Result};
use crate::events::{Atom, LayoutGroup, Notification, WindowId};
use crate::keeper_error;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::info;

use super::r#trait::WindowSession;

const ROOT: WindowId = WindowId(1);

/// Вызов, изменяющий состояние сессии (для проверок в тестах)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    SetGroup(LayoutGroup),
    SetProperty(WindowId, Atom),
}

/// Эмуляция переключения окон для dry-run
struct Emulation {
    interval: Duration,
    windows: Vec<WindowId>,
    next: usize,
}

struct State {
    active_window_property: String,
    atoms: HashMap<String, Atom>,
    windows: HashSet<WindowId>,
    properties: HashMap<(WindowId, Atom), Vec<u32>>,
    active: WindowId,
    group: LayoutGroup,
    groups: u8,
    subscribed: HashSet<WindowId>,
    pending: VecDeque<Notification>,
    calls: Vec<SessionCall>,
    next_window: u32,
}

impl State {
    fn atom(&mut self, name: &str) -> Atom {
        let next = Atom(self.atoms.len() as u32 + 1);
        *self.atoms.entry(name.to_string()).or_insert(next)
    }

    fn notify_active_changed(&mut self) {
        if self.subscribed.contains(&ROOT) {
            let name = self.active_window_property.clone();
            let atom = self.atom(&name);
            self.pending.push_back(Notification::property_changed(ROOT, atom));
        }
    }

    fn ensure_alive(&self, window: WindowId) -> Result<()> {
        if self.windows.contains(&window) {
            Ok(())
        } else {
            Err(KeeperError::WindowNotFound(window))
        }
    }
}

/// Оконная сессия в памяти: окна, атомы, свойства и группа XKB.
///
/// Используется в режиме сухого запуска и в тестах. Свойства хранятся
/// "на стороне сервера" и умирают вместе с окном, как в X11.
pub struct MemorySession {
    state: Mutex<State>,
    emulation: Option<Mutex<Emulation>>,
}

impl MemorySession {
    pub fn new(groups: u8) -> Self {
        let mut windows = HashSet::new();
        windows.insert(ROOT);

        Self {
            state: Mutex::new(State {
                active_window_property: DEFAULT_ACTIVE_WINDOW_PROPERTY.to_string(),
                atoms: HashMap::new(),
                windows,
                properties: HashMap::new(),
                active: WindowId::NONE,
                group: LayoutGroup::default(),
                groups,
                subscribed: HashSet::new(),
                pending: VecDeque::new(),
                calls: Vec::new(),
                next_window: 0x0040_0001,
            }),
            emulation: None,
        }
    }

    /// Сессия, которая сама переключает фокус между фейковыми окнами
    pub fn emulated(config: &Config) -> Self {
        let dry_run = &config.dry_run;
        let mut session = Self::new(dry_run.groups);
        session.state.get_mut().active_window_property = config.session.active_window_property.clone();
        let windows: Vec<WindowId> = (0..dry_run.windows).map(|_| session.create_window()).collect();
        if let Some(first) = windows.first() {
            session.state.get_mut().active = *first;
        }

        info!(
            "Dry-run: эмулируем {} окон и {} групп раскладки",
            windows.len(),
            dry_run.groups
        );

        session.emulation = Some(Mutex::new(Emulation {
            interval: Duration::from_millis(dry_run.switch_interval_ms),
            windows,
            next: 1,
        }));
        session
    }

    pub fn create_window(&self) -> WindowId {
        let mut state = self.state.lock();
        let window = WindowId(state.next_window);
        state.next_window += 1;
        state.windows.insert(window);
        window
    }

    /// Уничтожить окно вместе со всеми его свойствами
    #[allow(dead_code)]
    pub fn destroy_window(&self, window: WindowId) {
        let mut state = self.state.lock();
        state.windows.remove(&window);
        state.properties.retain(|(owner, _), _| *owner != window);
    }

    /// Оконный менеджер передал фокус окну
    #[allow(dead_code)]
    pub fn focus(&self, window: WindowId) {
        let mut state = self.state.lock();
        state.active = window;
        state.notify_active_changed();
    }

    /// Пользователь сам переключил раскладку (без уведомления)
    #[allow(dead_code)]
    pub fn select_group(&self, group: LayoutGroup) {
        self.state.lock().group = group;
    }

    #[allow(dead_code)]
    pub fn push_notification(&self, notification: Notification) {
        self.state.lock().pending.push_back(notification);
    }

    /// Записать сырое значение свойства в обход трекера
    #[allow(dead_code)]
    pub fn put_raw_property(&self, window: WindowId, name: &str, data: Vec<u32>) {
        let mut state = self.state.lock();
        let atom = state.atom(name);
        state.properties.insert((window, atom), data);
    }

    #[allow(dead_code)]
    pub fn group(&self) -> LayoutGroup {
        self.state.lock().group
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.state.lock().calls.clone()
    }

    /// Сохранённая за окном группа, как её увидел бы сервер
    #[allow(dead_code)]
    pub fn stored_group(&self, window: WindowId, name: &str) -> Option<LayoutGroup> {
        let mut state = self.state.lock();
        let atom = state.atom(name);
        state
            .properties
            .get(&(window, atom))
            .and_then(|data| LayoutGroup::from_property_values(data))
    }

    fn emulate_next_switch(&self, emulation: &Mutex<Emulation>) {
        let (interval, window) = {
            let mut emulation = emulation.lock();
            let window = emulation.windows[emulation.next % emulation.windows.len()];
            emulation.next += 1;
            (emulation.interval, window)
        };

        std::thread::sleep(interval);

        let mut state = self.state.lock();
        // Как будто пользователь что-то набирал и сменил раскладку
        state.group = LayoutGroup((state.group.value() + 1) % state.groups.max(1));
        info!("Dry-run: эмулируем смену окна на {} ({})", window, state.group);
        state.active = window;
        state.notify_active_changed();
    }
}

impl WindowSession for MemorySession {
    fn root_window(&self) -> WindowId {
        ROOT
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        Ok(self.state.lock().atom(name))
    }

    fn subscribe_property_changes(&self, window: WindowId) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_alive(window)?;
        state.subscribed.insert(window);
        Ok(())
    }

    fn next_notification(&self) -> Result<Notification> {
        loop {
            if let Some(notification) = self.state.lock().pending.pop_front() {
                return Ok(notification);
            }

            match &self.emulation {
                Some(emulation) => self.emulate_next_switch(emulation),
                None => {
                    return Err(keeper_error!(service_unavailable, "Поток уведомлений исчерпан"));
                }
            }
        }
    }

    fn interrupt(&self) -> Result<()> {
        self.state.lock().pending.push_back(Notification::Interrupted);
        Ok(())
    }

    fn query_active_window(&self) -> Result<WindowId> {
        let state = self.state.lock();
        if state.active.is_none() {
            Ok(ROOT)
        } else {
            Ok(state.active)
        }
    }

    fn current_group(&self) -> Result<LayoutGroup> {
        Ok(self.state.lock().group)
    }

    fn set_current_group(&self, group: LayoutGroup) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SessionCall::SetGroup(group));
        if group.value() >= state.groups {
            return Err(KeeperError::InvalidGroup(group));
        }
        state.group = group;
        Ok(())
    }

    fn window_property(&self, window: WindowId, property: Atom) -> Result<Option<Vec<u32>>> {
        let state = self.state.lock();
        state.ensure_alive(window)?;
        Ok(state.properties.get(&(window, property)).cloned())
    }

    fn set_window_property(&self, window: WindowId, property: Atom, data: &[u32]) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SessionCall::SetProperty(window, property));
        state.ensure_alive(window)?;
        state.properties.insert((window, property), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_properties_die_with_window() {
        let session = MemorySession::new(2);
        let window = session.create_window();
        let atom = session.intern_atom("WTFKB_GROUP").unwrap();

        session.set_window_property(window, atom, &[1]).unwrap();
        assert!(session.window_property(window, atom).unwrap().is_some());

        session.destroy_window(window);
        let err = session.window_property(window, atom).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_focus_notifies_only_when_subscribed() {
        let session = MemorySession::new(2);
        let window = session.create_window();

        session.focus(window);
        assert!(session.next_notification().is_err());

        session.subscribe_property_changes(session.root_window()).unwrap();
        session.focus(window);
        let atom = session.intern_atom(DEFAULT_ACTIVE_WINDOW_PROPERTY).unwrap();
        assert_eq!(
            session.next_notification().unwrap(),
            Notification::property_changed(ROOT, atom)
        );
    }

    #[test]
    fn test_interrupt_wakes_waiting_reader() {
        let mut config = Config::default();
        config.dry_run.switch_interval_ms = 100;
        let session = Arc::new(MemorySession::emulated(&config));
        let reader = {
            let session = session.clone();
            std::thread::spawn(move || session.next_notification())
        };

        session.interrupt().unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), Notification::Interrupted);
    }

    #[test]
    fn test_no_focus_falls_back_to_root() {
        let session = MemorySession::new(2);
        assert_eq!(session.query_active_window().unwrap(), ROOT);
    }

    #[test]
    fn test_invalid_group_rejected() {
        let session = MemorySession::new(2);
        let err = session.set_current_group(LayoutGroup(3)).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidGroup(LayoutGroup(3))));
        assert_eq!(session.group(), LayoutGroup(0));
    }

    #[test]
    fn test_emulation_switches_focus() {
        let mut config = Config::default();
        config.dry_run.switch_interval_ms = 100;
        config.dry_run.windows = 2;

        let session = MemorySession::emulated(&config);
        session.subscribe_property_changes(session.root_window()).unwrap();
        let first = session.query_active_window().unwrap();

        let notification = session.next_notification().unwrap();
        assert!(matches!(notification, Notification::PropertyChanged { window, .. } if window == ROOT));
        assert_ne!(session.query_active_window().unwrap(), first);
        assert_eq!(session.group(), LayoutGroup(1));
    }
}
