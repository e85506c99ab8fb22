//! Test X server implementation.
//!
//! This module contains the test server ([`State`]), which boils down to the part of the X11 core
//! protocol used for selections: atoms, windows, properties and selection ownership. Every
//! connected client has its own event queue, and requests are executed synchronously.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::display::{
    Atom, ConversionRequest, Error, Event, Property, SelectionNotify, Timestamp, Window,
};

pub type ClientId = u32;

#[derive(Debug)]
pub struct State {
    atoms: HashMap<String, Atom>,
    next_atom: Atom,
    next_window: Window,
    next_client: ClientId,
    windows: HashMap<Window, ClientId>,
    properties: HashMap<(Window, Atom), Property>,
    owners: HashMap<Atom, Window>,
    queues: HashMap<ClientId, VecDeque<Event>>,
    // Selections for which SetSelectionOwner silently has no effect, like it does for a stale
    // timestamp.
    pub frozen_selections: HashSet<Atom>,
}

impl Default for State {
    fn default() -> Self {
        let atoms = [("PRIMARY", 1), ("ATOM", 4), ("STRING", 31)]
            .into_iter()
            .map(|(name, atom)| (name.to_string(), atom))
            .collect();

        Self {
            atoms,
            next_atom: 100,
            next_window: 0x0020_0001,
            next_client: 1,
            windows: HashMap::new(),
            properties: HashMap::new(),
            owners: HashMap::new(),
            queues: HashMap::new(),
            frozen_selections: HashSet::new(),
        }
    }
}

fn bad_window(window: Window) -> Error {
    Error::Rejected(format!("BadWindow {:#x}", window))
}

impl State {
    /// Registers a new client with a window of its own.
    pub fn add_client(&mut self) -> (ClientId, Window) {
        let client = self.next_client;
        self.next_client += 1;
        let window = self.next_window;
        self.next_window += 0x0020_0000;

        self.windows.insert(window, client);
        self.queues.insert(client, VecDeque::new());
        (client, window)
    }

    /// Destroys the client's windows, which also releases its selections.
    pub fn remove_client(&mut self, client: ClientId) {
        self.windows.retain(|_, owner| *owner != client);
        let windows = &self.windows;
        self.properties
            .retain(|(window, _), _| windows.contains_key(window));
        self.owners.retain(|_, window| windows.contains_key(window));
        self.queues.remove(&client);
    }

    pub fn window_exists(&self, window: Window) -> bool {
        self.windows.contains_key(&window)
    }

    pub fn owner(&self, selection: Atom) -> Option<Window> {
        self.owners.get(&selection).copied()
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<&Property> {
        self.properties.get(&(window, property))
    }

    fn client_of(&self, window: Window) -> Result<ClientId, Error> {
        self.windows
            .get(&window)
            .copied()
            .ok_or_else(|| bad_window(window))
    }

    pub fn push_event(&mut self, window: Window, event: Event) -> Result<(), Error> {
        let client = self.client_of(window)?;
        self.queues.get_mut(&client).unwrap().push_back(event);
        Ok(())
    }

    /// Returns the number of events waiting for the client owning `window`.
    pub fn queue_len(&self, window: Window) -> usize {
        self.windows
            .get(&window)
            .and_then(|client| self.queues.get(client))
            .map_or(0, VecDeque::len)
    }

    pub fn pop_event(&mut self, client: ClientId) -> Option<Event> {
        self.queues.get_mut(&client)?.pop_front()
    }

    pub fn intern_atom(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }

        let atom = self.next_atom;
        self.next_atom += 1;
        self.atoms.insert(name.to_string(), atom);
        atom
    }

    pub fn convert_selection(
        &mut self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.client_of(requestor)?;

        match self.owner(selection) {
            Some(owner) => self.push_event(
                owner,
                Event::SelectionRequest(ConversionRequest {
                    owner,
                    requestor,
                    selection,
                    target,
                    property,
                    time,
                }),
            ),
            None => self.push_event(
                requestor,
                Event::SelectionNotify(SelectionNotify {
                    requestor,
                    selection,
                    target,
                    property: None,
                    time,
                }),
            ),
        }
    }

    pub fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Option<Window>,
        time: Timestamp,
    ) -> Result<(), Error> {
        if let Some(owner) = owner {
            self.client_of(owner)?;
        }

        if self.frozen_selections.contains(&selection) {
            return Ok(());
        }

        let previous = match owner {
            Some(owner) => self.owners.insert(selection, owner),
            None => self.owners.remove(&selection),
        };

        if let Some(previous) = previous.filter(|&previous| Some(previous) != owner) {
            let _ = self.push_event(
                previous,
                Event::SelectionClear {
                    owner: previous,
                    selection,
                    time,
                },
            );
        }

        Ok(())
    }

    pub fn get_property(
        &self,
        window: Window,
        property: Atom,
        type_: Option<Atom>,
    ) -> Result<Option<Property>, Error> {
        self.client_of(window)?;

        let value = self
            .property(window, property)
            .filter(|value| type_.map_or(true, |type_| type_ == value.type_))
            .cloned();
        Ok(value)
    }

    pub fn change_property(
        &mut self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.client_of(window)?;
        assert!(matches!(format, 8 | 16 | 32));
        assert_eq!(data.len() % usize::from(format / 8), 0);

        self.properties.insert(
            (window, property),
            Property {
                type_,
                format,
                data: data.to_vec(),
            },
        );
        Ok(())
    }

    pub fn delete_property(&mut self, window: Window, property: Atom) -> Result<(), Error> {
        self.client_of(window)?;
        self.properties.remove(&(window, property));
        Ok(())
    }
}
