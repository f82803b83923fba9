use crate::config::SessionConfig;
use crate::error::{KeeperError, Result};
use crate::events::{Atom, LayoutGroup, Notification, WindowId};
use crate::keeper_error;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConnectionExt as _,
    CreateWindowAux, EventMask, PropMode, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::r#trait::WindowSession;

// Минимальная версия XKB, в которой есть GetState/LatchLockState
const XKB_MAJOR_VERSION: u16 = 1;
const XKB_MINOR_VERSION: u16 = 0;

// Тип ClientMessage, которым поток событий будят при остановке
const WAKE_ATOM_NAME: &str = "_XKB_KEEPER_WAKE";

pub struct X11Session {
    conn: RustConnection,
    root: xproto::Window,
    active_window_atom: xproto::Atom,
    // Невидимое окно, на которое сессия шлёт ClientMessage самой себе
    wake_window: xproto::Window,
    wake_atom: xproto::Atom,
}

impl X11Session {
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        info!(
            "Подключение к X-серверу {}",
            config.display.as_deref().unwrap_or("(DISPLAY)")
        );

        let (conn, screen_num) = RustConnection::connect(config.display.as_deref())?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| keeper_error!(internal, "Экран {} отсутствует в setup", screen_num))?;

        let xkb = match conn.xkb_use_extension(XKB_MAJOR_VERSION, XKB_MINOR_VERSION) {
            Ok(cookie) => cookie.reply()?,
            Err(ConnectionError::UnsupportedExtension) => {
                return Err(keeper_error!(extension, "X-сервер не поддерживает XKB"));
            }
            Err(e) => return Err(e.into()),
        };
        if !xkb.supported {
            return Err(keeper_error!(
                extension,
                "XKB {}.{} не поддерживается (версия сервера {}.{})",
                XKB_MAJOR_VERSION,
                XKB_MINOR_VERSION,
                xkb.server_major,
                xkb.server_minor
            ));
        }
        debug!("XKB {}.{} доступен", xkb.server_major, xkb.server_minor);

        let active_window_atom = conn
            .intern_atom(false, config.active_window_property.as_bytes())?
            .reply()?
            .atom;

        let wake_window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            wake_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?
        .check()?;
        let wake_atom = conn.intern_atom(false, WAKE_ATOM_NAME.as_bytes())?.reply()?.atom;
        debug!("Окно для остановки: {}", WindowId(wake_window));

        info!("Подключено к X-серверу, корневое окно {}", WindowId(root));

        Ok(Self {
            conn,
            root,
            active_window_atom,
            wake_window,
            wake_atom,
        })
    }
}

impl WindowSession for X11Session {
    fn root_window(&self) -> WindowId {
        WindowId(self.root)
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        let reply = self.conn.intern_atom(false, name.as_bytes())?.reply()?;
        Ok(Atom(reply.atom))
    }

    fn subscribe_property_changes(&self, window: WindowId) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE);
        self.conn.change_window_attributes(window.0, &aux)?.check()?;
        Ok(())
    }

    fn next_notification(&self) -> Result<Notification> {
        let notification = match self.conn.wait_for_event()? {
            Event::PropertyNotify(event) => {
                Notification::property_changed(WindowId(event.window), Atom(event.atom))
            }
            Event::ClientMessage(event)
                if event.window == self.wake_window && event.type_ == self.wake_atom =>
            {
                Notification::Interrupted
            }
            Event::Error(err) => Notification::ProtocolError(format!(
                "{:?} (major {}, minor {}, value {})",
                err.error_kind, err.major_opcode, err.minor_opcode, err.bad_value
            )),
            other => Notification::Other(format!("{:?}", other)),
        };
        Ok(notification)
    }

    fn interrupt(&self) -> Result<()> {
        // Пустая маска: событие получает клиент, создавший окно, то есть мы сами
        let event = ClientMessageEvent::new(32, self.wake_window, self.wake_atom, [0u32; 5]);
        self.conn
            .send_event(false, self.wake_window, EventMask::NO_EVENT, event)?;
        self.conn.flush()?;
        Ok(())
    }

    fn query_active_window(&self) -> Result<WindowId> {
        let reply = self
            .conn
            .get_property(false, self.root, self.active_window_atom, AtomEnum::WINDOW, 0, 1)?
            .reply()?;

        let active = reply
            .value32()
            .and_then(|mut values| values.next())
            .map(WindowId)
            .filter(|window| !window.is_none());

        Ok(active.unwrap_or(WindowId(self.root)))
    }

    fn current_group(&self) -> Result<LayoutGroup> {
        let state = self.conn.xkb_get_state(xkb::ID::USE_CORE_KBD.into())?.reply()?;
        Ok(LayoutGroup(u8::from(state.group)))
    }

    fn set_current_group(&self, group: LayoutGroup) -> Result<()> {
        let no_mods = xproto::ModMask::from(0u8);
        self.conn
            .xkb_latch_lock_state(
                xkb::ID::USE_CORE_KBD.into(),
                no_mods,
                no_mods,
                true,
                xkb::Group::from(group.value()),
                no_mods,
                false,
                0,
            )?
            .check()
            .map_err(|e| match KeeperError::from(e) {
                KeeperError::Protocol(_) => KeeperError::InvalidGroup(group),
                other => other,
            })?;
        Ok(())
    }

    fn window_property(&self, window: WindowId, property: Atom) -> Result<Option<Vec<u32>>> {
        let reply = self
            .conn
            .get_property(false, window.0, property.0, property.0, 0, 32)?
            .reply()?;

        if reply.type_ != property.0 {
            return Ok(None);
        }
        Ok(reply.value32().map(|values| values.collect()))
    }

    fn set_window_property(&self, window: WindowId, property: Atom, data: &[u32]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window.0, property.0, property.0, data)?
            .check()?;
        Ok(())
    }
}

impl Drop for X11Session {
    fn drop(&mut self) {
        // Окно умрёт вместе с соединением, но удалим его явно
        if let Ok(cookie) = self.conn.destroy_window(self.wake_window) {
            let _ = cookie.check();
        }
        info!("Соединение с X-сервером закрывается");
    }
}
