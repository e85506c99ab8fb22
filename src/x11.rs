//! [`Display`] implementation on top of an X11 connection.

use log::{trace, warn};
use x11rb::connection::Connection as _;
use x11rb::protocol::xproto::{
    self, AtomEnum, ConnectionExt as _, CreateWindowAux, EventMask, PropMode,
    SelectionNotifyEvent, WindowClass,
};
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;
use x11rb::COPY_DEPTH_FROM_PARENT;

use crate::display::{
    Atom, ConversionRequest, Display, Error, Event, Property, SelectionNotify, Timestamp, Window,
    NONE,
};

/// A connection to an X server with a hidden window of our own.
///
/// The window is never mapped. It is destroyed when this value is dropped, which also releases
/// any selections it owns.
pub struct X11Display {
    conn: RustConnection,
    window: Window,
}

/// Connects to the X server.
///
/// If `display_name` is `None`, the `DISPLAY` environment variable is used.
pub fn connect(display_name: Option<&str>) -> Result<X11Display, Error> {
    let (conn, screen_num) = x11rb::connect(display_name).map_err(Error::Connect)?;

    let (root, visual) = {
        let screen = &conn.setup().roots[screen_num];
        (screen.root, screen.root_visual)
    };

    let window = conn.generate_id()?;
    conn.create_window(
        COPY_DEPTH_FROM_PARENT,
        window,
        root,
        0,
        0,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        visual,
        &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
    )?;
    conn.flush()?;

    trace!("Created window {:#x} on screen {}", window, screen_num);

    Ok(X11Display { conn, window })
}

pub(crate) fn optional(value: u32) -> Option<u32> {
    if value == NONE {
        None
    } else {
        Some(value)
    }
}

pub(crate) fn translate(event: XEvent) -> Option<Event> {
    let event = match event {
        XEvent::SelectionRequest(e) => Event::SelectionRequest(ConversionRequest {
            owner: e.owner,
            requestor: e.requestor,
            selection: e.selection,
            target: e.target,
            property: optional(e.property),
            time: e.time,
        }),
        XEvent::SelectionNotify(e) => Event::SelectionNotify(SelectionNotify {
            requestor: e.requestor,
            selection: e.selection,
            target: e.target,
            property: optional(e.property),
            time: e.time,
        }),
        XEvent::SelectionClear(e) => Event::SelectionClear {
            owner: e.owner,
            selection: e.selection,
            time: e.time,
        },
        XEvent::Error(err) => Event::Error(format!(
            "{:?} in {}",
            err.error_kind,
            err.request_name.unwrap_or("unknown request")
        )),
        _ => return None,
    };

    Some(event)
}

impl Display for X11Display {
    fn window(&self) -> Window {
        self.window
    }

    fn intern_atom(&self, name: &str) -> Result<Atom, Error> {
        let atom = self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom;
        trace!("Interned {} as {}", name, atom);
        Ok(atom)
    }

    fn convert_selection(
        &self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.conn.convert_selection(
            requestor,
            selection,
            target,
            property.unwrap_or(NONE),
            time,
        )?;
        Ok(())
    }

    fn set_selection_owner(
        &self,
        selection: Atom,
        owner: Option<Window>,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.conn
            .set_selection_owner(owner.unwrap_or(NONE), selection, time)?;
        Ok(())
    }

    fn get_selection_owner(&self, selection: Atom) -> Result<Option<Window>, Error> {
        let owner = self.conn.get_selection_owner(selection)?.reply()?.owner;
        Ok(optional(owner))
    }

    fn get_property(
        &self,
        window: Window,
        property: Atom,
        type_: Option<Atom>,
    ) -> Result<Option<Property>, Error> {
        let requested = type_.unwrap_or_else(|| AtomEnum::ANY.into());
        let reply = self
            .conn
            .get_property(false, window, property, requested, 0, u32::MAX)?
            .reply()?;

        if reply.type_ == NONE {
            return Ok(None);
        }

        if type_.is_some_and(|type_| type_ != reply.type_) {
            trace!(
                "Property {} has type {}, wanted {}",
                property,
                reply.type_,
                requested
            );
            return Ok(None);
        }

        Ok(Some(Property {
            type_: reply.type_,
            format: reply.format,
            data: reply.value,
        }))
    }

    fn change_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        let data_len = data.len() / usize::from(format / 8);
        let data_len = u32::try_from(data_len)
            .map_err(|_| Error::Rejected("property data too long".to_string()))?;

        self.conn.change_property(
            PropMode::REPLACE,
            window,
            property,
            type_,
            format,
            data_len,
            data,
        )?;
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), Error> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn send_selection_notify(&self, notify: &SelectionNotify) -> Result<(), Error> {
        let event = SelectionNotifyEvent {
            response_type: xproto::SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: notify.time,
            requestor: notify.requestor,
            selection: notify.selection,
            target: notify.target,
            property: notify.property.unwrap_or(NONE),
        };

        self.conn
            .send_event(false, notify.requestor, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.conn.flush()?;
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<Event>, Error> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(event) = translate(event) {
                return Ok(Some(event));
            }
        }

        Ok(None)
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        let result = self
            .conn
            .destroy_window(self.window)
            .map(drop)
            .and_then(|()| self.conn.flush());

        if let Err(err) = result {
            warn!("Couldn't destroy window {:#x}: {}", self.window, err);
        }
    }
}
