//! The display server requests and events used by the selection protocol.
//!
//! [`Display`] is the seam between the session state machine and the transport. The production
//! implementation lives in [`crate::x11`].

/// An interned identifier for a name, valid for the lifetime of one connection.
pub type Atom = u32;

/// A window handle.
pub type Window = u32;

/// A server timestamp.
pub type Timestamp = u32;

/// The `None` atom and window.
pub const NONE: u32 = 0;

/// The `CurrentTime` timestamp.
pub const CURRENT_TIME: Timestamp = 0;

/// The predefined `ATOM` atom.
pub const ATOM: Atom = 4;

/// The predefined `STRING` atom.
pub const STRING: Atom = 31;

/// Errors that can occur while talking to the display server.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Couldn't connect to the X server")]
    Connect(#[source] x11rb::errors::ConnectError),

    #[error("X server communication error")]
    Communication(#[source] x11rb::errors::ConnectionError),

    #[error("The X server rejected a request: {0}")]
    Rejected(String),

    #[error("The X server ran out of resource IDs")]
    IdsExhausted,
}

impl Error {
    /// Returns `false` for errors which only affect the request that caused them.
    ///
    /// A rejected request (e.g. a write to a window that has been destroyed in the meantime)
    /// leaves the connection usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Rejected(_))
    }
}

impl From<x11rb::errors::ConnectionError> for Error {
    fn from(x: x11rb::errors::ConnectionError) -> Self {
        Error::Communication(x)
    }
}

impl From<x11rb::errors::ReplyError> for Error {
    fn from(x: x11rb::errors::ReplyError) -> Self {
        use x11rb::errors::ReplyError::*;

        match x {
            ConnectionError(err) => Error::Communication(err),
            X11Error(err) => Error::Rejected(format!("{:?}", err.error_kind)),
        }
    }
}

impl From<x11rb::errors::ReplyOrIdError> for Error {
    fn from(x: x11rb::errors::ReplyOrIdError) -> Self {
        use x11rb::errors::ReplyOrIdError::*;

        match x {
            IdsExhausted => Error::IdsExhausted,
            ConnectionError(err) => Error::Communication(err),
            X11Error(err) => Error::Rejected(format!("{:?}", err.error_kind)),
        }
    }
}

/// A typed buffer attached to a window.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Property {
    /// The type atom of the property.
    pub type_: Atom,
    /// The unit size of the data in bits: 8, 16 or 32.
    pub format: u8,
    /// The raw data, in the client's byte order.
    pub data: Vec<u8>,
}

impl Property {
    /// Returns the data as 32-bit values.
    ///
    /// Returns `None` if the property doesn't have format 32.
    pub fn value32(&self) -> Option<Vec<u32>> {
        if self.format != 32 {
            return None;
        }

        let values = self
            .data
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(values)
    }
}

/// Encodes 32-bit values for a format 32 property.
pub fn encode32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_ne_bytes()).collect()
}

/// A request from a peer to convert a selection we own.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ConversionRequest {
    pub owner: Window,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    /// `None` if the requestor left it to us to pick a property.
    pub property: Option<Atom>,
    pub time: Timestamp,
}

impl ConversionRequest {
    /// Builds the reply to this request. `None` means the conversion was refused.
    pub fn reply(&self, property: Option<Atom>) -> SelectionNotify {
        SelectionNotify {
            requestor: self.requestor,
            selection: self.selection,
            target: self.target,
            property,
            time: self.time,
        }
    }
}

/// The outcome of a selection conversion.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SelectionNotify {
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    /// `None` if the conversion was refused.
    pub property: Option<Atom>,
    pub time: Timestamp,
}

/// Events relevant to the selection protocol.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Event {
    /// A peer wants us to convert a selection we own.
    SelectionRequest(ConversionRequest),
    /// A conversion we requested has completed or was refused.
    SelectionNotify(SelectionNotify),
    /// We lost ownership of a selection.
    SelectionClear {
        owner: Window,
        selection: Atom,
        time: Timestamp,
    },
    /// A request we sent earlier failed on the server.
    Error(String),
}

/// A connection to a display server, holding one window of our own.
///
/// All requests refer to atoms and windows of this connection. Requests may be buffered until
/// [`flush`](Display::flush) is called.
pub trait Display {
    /// Returns the window owned by this connection.
    fn window(&self) -> Window;

    /// Interns the atom with the given name, creating it if it doesn't exist yet.
    fn intern_atom(&self, name: &str) -> Result<Atom, Error>;

    /// Asks the owner of `selection` to convert it to `target` and store the result in
    /// `property` on `requestor`.
    fn convert_selection(
        &self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
        time: Timestamp,
    ) -> Result<(), Error>;

    /// Sets (or with `None`, relinquishes) the owner of `selection`.
    fn set_selection_owner(
        &self,
        selection: Atom,
        owner: Option<Window>,
        time: Timestamp,
    ) -> Result<(), Error>;

    /// Retrieves the current owner of `selection`.
    fn get_selection_owner(&self, selection: Atom) -> Result<Option<Window>, Error>;

    /// Reads a property without deleting it.
    ///
    /// If `type_` is given, a property of a different type is treated as missing.
    fn get_property(
        &self,
        window: Window,
        property: Atom,
        type_: Option<Atom>,
    ) -> Result<Option<Property>, Error>;

    /// Replaces the contents of a property.
    fn change_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: &[u8],
    ) -> Result<(), Error>;

    /// Deletes a property.
    fn delete_property(&self, window: Window, property: Atom) -> Result<(), Error>;

    /// Sends a `SelectionNotify` event to `notify.requestor`.
    fn send_selection_notify(&self, notify: &SelectionNotify) -> Result<(), Error>;

    /// Flushes buffered requests to the server.
    fn flush(&self) -> Result<(), Error>;

    /// Returns the next pending event without blocking.
    fn poll_for_event(&self) -> Result<Option<Event>, Error>;
}
