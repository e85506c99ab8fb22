//! Answering conversion requests for a selection we own.

use log::{debug, trace};

use crate::atoms::Atoms;
use crate::display::{self, encode32, Atom, ConversionRequest, Display, Window, NONE};

/// Reasons for refusing a conversion request.
#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("The requestor didn't name a property to store the result in")]
    MissingProperty,

    #[error("Target {0} is not supported")]
    UnsupportedTarget(Atom),

    #[error("The MULTIPLE request has no usable atom pairs")]
    InvalidMultiple,

    #[error("Couldn't read the atom pairs of a MULTIPLE request")]
    PropertyRead(#[source] display::Error),

    #[error("Couldn't store the conversion result")]
    Display(#[source] display::Error),
}

impl RequestError {
    /// Returns `true` if the error is a transport failure rather than a refusal.
    pub fn is_fatal(&self) -> bool {
        match self {
            RequestError::PropertyRead(err) | RequestError::Display(err) => err.is_fatal(),
            _ => false,
        }
    }

    /// Splits fatal transport errors off from refusals.
    pub fn into_refusal(self) -> Result<Self, display::Error> {
        match self {
            RequestError::PropertyRead(err) | RequestError::Display(err) if err.is_fatal() => {
                Err(err)
            }
            refusal => Ok(refusal),
        }
    }
}

/// Converts the payload to the targets requested by peers.
pub struct Responder<'a, D: Display> {
    display: &'a D,
    atoms: &'a Atoms,
    payload: &'a [u8],
}

impl<'a, D: Display> Responder<'a, D> {
    pub fn new(display: &'a D, atoms: &'a Atoms, payload: &'a [u8]) -> Self {
        Self {
            display,
            atoms,
            payload,
        }
    }

    /// Serves one request, storing the result on the requestor.
    ///
    /// Returns the property to report in the reply. Errors other than fatal ones should be
    /// answered with a refusal.
    pub fn respond(&self, request: &ConversionRequest) -> Result<Atom, RequestError> {
        let property = request.property.ok_or(RequestError::MissingProperty)?;

        if request.target == self.atoms.multiple {
            self.convert_multiple(request.requestor, property)?;
        } else {
            self.convert(request.requestor, request.target, property)?;
        }

        Ok(property)
    }

    fn convert(&self, requestor: Window, target: Atom, property: Atom) -> Result<(), RequestError> {
        let atoms = self.atoms;

        if target == atoms.targets {
            trace!("Sending TARGETS to {:#x}", requestor);
            let targets = encode32(&atoms.supported_targets());
            self.display
                .change_property(requestor, property, atoms.atom, 32, &targets)
                .map_err(RequestError::Display)
        } else if atoms.is_text(target) {
            trace!(
                "Sending {} bytes as {} to {:#x}",
                self.payload.len(),
                target,
                requestor
            );
            self.display
                .change_property(requestor, property, target, 8, self.payload)
                .map_err(RequestError::Display)
        } else {
            Err(RequestError::UnsupportedTarget(target))
        }
    }

    fn convert_multiple(&self, requestor: Window, property: Atom) -> Result<(), RequestError> {
        let atoms = self.atoms;

        let mut pairs = self
            .display
            .get_property(requestor, property, Some(atoms.atom_pair))
            .map_err(RequestError::PropertyRead)?
            .and_then(|property| property.value32())
            .ok_or(RequestError::InvalidMultiple)?;

        // A trailing unpaired atom is ignored.
        pairs.truncate(pairs.len() - pairs.len() % 2);
        if pairs.is_empty() {
            return Err(RequestError::InvalidMultiple);
        }

        for pair in pairs.chunks_exact_mut(2) {
            let (target, pair_property) = (pair[0], pair[1]);
            if pair_property == NONE {
                continue;
            }

            let result = if target == atoms.multiple {
                Err(RequestError::UnsupportedTarget(target))
            } else {
                self.convert(requestor, target, pair_property)
            };

            match result {
                Ok(()) => (),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    debug!("Refusing MULTIPLE entry ({}, {}): {}", target, pair_property, err);
                    pair[1] = NONE;
                }
            }
        }

        self.display
            .change_property(requestor, property, atoms.atom_pair, 32, &encode32(&pairs))
            .map_err(RequestError::Display)
    }
}
