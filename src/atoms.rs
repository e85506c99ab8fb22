use crate::display::{self, Atom, Display};

/// The property on our own window that receives the clipboard contents we read.
const TRANSFER_PROPERTY: &str = "X11_CLIPBOARD_RS_TRANSFER";

/// Atoms used by the selection protocol, interned once per connection.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Atoms {
    pub clipboard: Atom,
    pub clipboard_manager: Atom,
    pub targets: Atom,
    pub multiple: Atom,
    pub save_targets: Atom,
    pub atom_pair: Atom,
    pub utf8_string: Atom,
    pub string: Atom,
    pub atom: Atom,
    pub transfer: Atom,
}

impl Atoms {
    pub fn intern<D: Display>(display: &D) -> Result<Self, display::Error> {
        Ok(Atoms {
            clipboard: display.intern_atom("CLIPBOARD")?,
            clipboard_manager: display.intern_atom("CLIPBOARD_MANAGER")?,
            targets: display.intern_atom("TARGETS")?,
            multiple: display.intern_atom("MULTIPLE")?,
            save_targets: display.intern_atom("SAVE_TARGETS")?,
            atom_pair: display.intern_atom("ATOM_PAIR")?,
            utf8_string: display.intern_atom("UTF8_STRING")?,
            string: display::STRING,
            atom: display::ATOM,
            transfer: display.intern_atom(TRANSFER_PROPERTY)?,
        })
    }

    /// Returns `true` for the plain text targets we can convert the payload to.
    pub fn is_text(&self, target: Atom) -> bool {
        target == self.utf8_string || target == self.string
    }

    /// The targets we offer, in the order they are advertised in `TARGETS`.
    pub fn supported_targets(&self) -> [Atom; 4] {
        [self.targets, self.multiple, self.utf8_string, self.string]
    }
}
