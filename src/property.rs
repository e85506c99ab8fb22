//! Reading properties that were handed to us.
//!
//! Whoever receives a property through a selection conversion is responsible for deleting it.

use log::{trace, warn};

use crate::display::{Atom, Display, Error, Property, Window};

/// Deletes the property when dropped.
struct DeleteOnDrop<'a, D: Display> {
    display: &'a D,
    window: Window,
    property: Atom,
}

impl<D: Display> Drop for DeleteOnDrop<'_, D> {
    fn drop(&mut self) {
        trace!("Deleting property {} on {:#x}", self.property, self.window);

        let result = self
            .display
            .delete_property(self.window, self.property)
            .and_then(|()| self.display.flush());

        if let Err(err) = result {
            warn!(
                "Couldn't delete property {} on {:#x}: {}",
                self.property, self.window, err
            );
        }
    }
}

/// Reads a property and deletes it afterwards.
///
/// The property is deleted even if reading it fails.
pub fn take_property<D: Display>(
    display: &D,
    window: Window,
    property: Atom,
) -> Result<Option<Property>, Error> {
    let _guard = DeleteOnDrop {
        display,
        window,
        property,
    };

    display.get_property(window, property, None)
}
