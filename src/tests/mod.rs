use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::display::{
    Atom, ConversionRequest, Display, Error, Event, Property, SelectionNotify, Timestamp, Window,
};

mod state;

use state::{ClientId, State};

/// An in-process X server shared by any number of [`TestClient`]s.
#[derive(Clone, Default)]
pub struct TestServer {
    state: Arc<Mutex<State>>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn connect(&self) -> TestClient {
        let (client, window) = self.state().add_client();
        TestClient {
            state: self.state.clone(),
            client,
            window,
        }
    }

    /// Makes every SetSelectionOwner for `selection` a no-op.
    pub fn freeze_selection(&self, selection: Atom) {
        self.state().frozen_selections.insert(selection);
    }

    pub fn owner(&self, selection: Atom) -> Option<Window> {
        self.state().owner(selection)
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<Property> {
        self.state().property(window, property).cloned()
    }

    pub fn window_exists(&self, window: Window) -> bool {
        self.state().window_exists(window)
    }
}

/// A client connection to a [`TestServer`]. Disconnects when dropped.
pub struct TestClient {
    state: Arc<Mutex<State>>,
    client: ClientId,
    window: Window,
}

impl TestClient {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl Drop for TestClient {
    fn drop(&mut self) {
        // Don't double panic if a test assertion failed while the lock was held.
        if let Ok(mut state) = self.state.lock() {
            state.remove_client(self.client);
        }
    }
}

impl Display for TestClient {
    fn window(&self) -> Window {
        self.window
    }

    fn intern_atom(&self, name: &str) -> Result<Atom, Error> {
        Ok(self.state().intern_atom(name))
    }

    fn convert_selection(
        &self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.state()
            .convert_selection(requestor, selection, target, property, time)
    }

    fn set_selection_owner(
        &self,
        selection: Atom,
        owner: Option<Window>,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.state().set_selection_owner(selection, owner, time)
    }

    fn get_selection_owner(&self, selection: Atom) -> Result<Option<Window>, Error> {
        Ok(self.state().owner(selection))
    }

    fn get_property(
        &self,
        window: Window,
        property: Atom,
        type_: Option<Atom>,
    ) -> Result<Option<Property>, Error> {
        self.state().get_property(window, property, type_)
    }

    fn change_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.state()
            .change_property(window, property, type_, format, data)
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), Error> {
        self.state().delete_property(window, property)
    }

    fn send_selection_notify(&self, notify: &SelectionNotify) -> Result<(), Error> {
        self.state()
            .push_event(notify.requestor, Event::SelectionNotify(*notify))
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<Event>, Error> {
        Ok(self.state().pop_event(self.client))
    }
}

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Waits for an event matching `filter`, dropping everything else.
pub fn wait_for<T>(
    client: &TestClient,
    timeout: Duration,
    mut filter: impl FnMut(Event) -> Option<T>,
) -> Option<T> {
    let started = Instant::now();
    while started.elapsed() < timeout {
        match client.poll_for_event().unwrap() {
            Some(event) => {
                if let Some(value) = filter(event) {
                    return Some(value);
                }
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }

    None
}

pub fn wait_for_request(client: &TestClient, timeout: Duration) -> Option<ConversionRequest> {
    wait_for(client, timeout, |event| match event {
        Event::SelectionRequest(request) => Some(request),
        _ => None,
    })
}

pub fn wait_for_notify(client: &TestClient, timeout: Duration) -> Option<SelectionNotify> {
    wait_for(client, timeout, |event| match event {
        Event::SelectionNotify(notify) => Some(notify),
        _ => None,
    })
}

pub fn wait_for_clear(client: &TestClient, timeout: Duration) -> Option<Atom> {
    wait_for(client, timeout, |event| match event {
        Event::SelectionClear { selection, .. } => Some(selection),
        _ => None,
    })
}

/// Converts `selection` into `property` on the client's window and waits for the reply.
pub fn convert(
    client: &TestClient,
    selection: Atom,
    target: Atom,
    property: Option<Atom>,
) -> SelectionNotify {
    client
        .convert_selection(client.window(), selection, target, property, 0)
        .unwrap();
    wait_for_notify(client, TIMEOUT).expect("no SelectionNotify")
}
