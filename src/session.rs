//! Reading the clipboard, publishing new contents and handing them to the clipboard manager.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::atoms::Atoms;
use crate::cancel::CancellationToken;
use crate::display::{self, ConversionRequest, Display, Event, SelectionNotify, CURRENT_TIME};
use crate::property::take_property;
use crate::serve::Responder;
use crate::x11::{self, X11Display};

/// Plain text representation of clipboard contents.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum TextTarget {
    /// `UTF8_STRING`.
    #[default]
    Utf8String,
    /// `STRING` (ISO Latin-1).
    String,
}

/// Clipboard contents read at the start of a session.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Contents {
    /// The type the owner stored the contents as.
    pub target: TextTarget,
    pub data: Vec<u8>,
}

/// Why a session ended.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum TerminationReason {
    /// Another client took the clipboard over.
    Preempted,
    /// The clipboard manager saved the contents.
    Saved,
    /// There is no clipboard manager to hand the contents to.
    NoManager,
    /// The clipboard manager declined to save the contents.
    ManagerRefused,
    /// The clipboard manager didn't answer in time.
    ManagerTimeout,
    /// Another client took the clipboard over while the manager was saving it.
    PreemptedDuringHandoff,
}

impl TerminationReason {
    /// Returns `true` if the contents were meant to be handed off but weren't saved.
    pub fn is_handoff_failure(self) -> bool {
        matches!(
            self,
            TerminationReason::NoManager
                | TerminationReason::ManagerRefused
                | TerminationReason::ManagerTimeout
                | TerminationReason::PreemptedDuringHandoff
        )
    }
}

/// The result of a whole session.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SessionReport {
    /// The clipboard contents before we took it over, if they could be read as text.
    pub previous: Option<Contents>,
    pub reason: TerminationReason,
}

/// Errors that end a session abnormally.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Couldn't connect to the X server")]
    ConnectionFailed(#[source] display::Error),

    #[error("Couldn't take ownership of the clipboard")]
    OwnershipDenied,

    #[error("X server communication error")]
    Communication(#[source] display::Error),
}

impl From<display::Error> for Error {
    fn from(x: display::Error) -> Self {
        Error::Communication(x)
    }
}

/// Options and flags that are used to customize the session.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Options {
    /// The display to connect to, `None` for `$DISPLAY`.
    display: Option<String>,

    /// How long to wait for the current owner to hand over the clipboard contents.
    read_timeout: Duration,

    /// How long to wait for the clipboard manager to save the contents.
    handoff_timeout: Duration,

    /// How long to sleep when there are no events.
    poll_interval: Duration,

    /// Read the current clipboard contents before taking it over.
    read_previous: bool,

    /// Trim the trailing newline character before publishing.
    trim_newline: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            display: None,
            read_timeout: Duration::from_secs(1),
            handoff_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            read_previous: true,
            trim_newline: false,
        }
    }
}

impl Options {
    /// Creates a blank new set of options ready for configuration.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display to connect to instead of `$DISPLAY`.
    #[inline]
    pub fn display(&mut self, display: Option<String>) -> &mut Self {
        self.display = display;
        self
    }

    /// Sets how long to wait for the current clipboard contents.
    #[inline]
    pub fn read_timeout(&mut self, read_timeout: Duration) -> &mut Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets how long to wait for the clipboard manager when exiting.
    #[inline]
    pub fn handoff_timeout(&mut self, handoff_timeout: Duration) -> &mut Self {
        self.handoff_timeout = handoff_timeout;
        self
    }

    /// Sets how long to sleep between polls when there are no events.
    #[inline]
    pub fn poll_interval(&mut self, poll_interval: Duration) -> &mut Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets whether to read the current clipboard contents first.
    #[inline]
    pub fn read_previous(&mut self, read_previous: bool) -> &mut Self {
        self.read_previous = read_previous;
        self
    }

    /// Sets the flag for trimming the trailing newline.
    #[inline]
    pub fn trim_newline(&mut self, trim_newline: bool) -> &mut Self {
        self.trim_newline = trim_newline;
        self
    }

    /// Invokes the prepare_session operation. See `prepare_session()`.
    #[inline]
    pub fn prepare(self, payload: Vec<u8>) -> Result<PreparedSession<X11Display>, Error> {
        prepare_session(self, payload)
    }

    /// Invokes the run_session operation. See `run_session()`.
    #[inline]
    pub fn run(self, payload: Vec<u8>, cancel: &CancellationToken) -> Result<SessionReport, Error> {
        run_session(self, payload, cancel)
    }
}

/// Where the session is in the selection protocol.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Phase {
    Reading,
    Owning,
    HandingOff { requested_at: Instant },
    Terminal(TerminationReason),
}

/// A session which owns the clipboard and is ready to serve requests.
pub struct PreparedSession<D: Display> {
    display: D,
    atoms: Atoms,
    payload: Vec<u8>,
    previous: Option<Contents>,
    phase: Phase,
    handoff_timeout: Duration,
    poll_interval: Duration,
}

/// Connects to the X server, reads the current clipboard and publishes `payload`.
///
/// The returned session owns the clipboard but doesn't answer requests until
/// [`serve`](PreparedSession::serve) is called, so call it promptly.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipboard_rs;
/// # use x11_clipboard_rs::session::Error;
/// # fn foo() -> Result<(), Error> {
/// use x11_clipboard_rs::cancel::CancellationToken;
/// use x11_clipboard_rs::session::{prepare_session, Options};
///
/// let session = prepare_session(Options::new(), b"world".to_vec())?;
/// if let Some(previous) = session.previous() {
///     println!("Was: {}", String::from_utf8_lossy(&previous.data));
/// }
///
/// let reason = session.serve(&CancellationToken::new())?;
/// println!("Done: {:?}", reason);
/// # Ok(())
/// # }
/// ```
#[inline]
pub fn prepare_session(
    options: Options,
    payload: Vec<u8>,
) -> Result<PreparedSession<X11Display>, Error> {
    let display = x11::connect(options.display.as_deref()).map_err(Error::ConnectionFailed)?;
    prepare_session_internal(display, options, payload)
}

/// Runs a whole session: reads the clipboard, publishes `payload`, serves requests until `cancel`
/// fires or someone else takes the clipboard, then hands the contents to the clipboard manager.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipboard_rs;
/// # use x11_clipboard_rs::session::Error;
/// # fn foo() -> Result<(), Error> {
/// use x11_clipboard_rs::cancel::CancellationToken;
/// use x11_clipboard_rs::session::{run_session, Options};
///
/// let report = run_session(Options::new(), b"world".to_vec(), &CancellationToken::new())?;
/// println!("{:?}", report.reason);
/// # Ok(())
/// # }
/// ```
#[inline]
pub fn run_session(
    options: Options,
    payload: Vec<u8>,
    cancel: &CancellationToken,
) -> Result<SessionReport, Error> {
    let mut session = prepare_session(options, payload)?;
    let previous = session.previous.take();
    let reason = session.serve(cancel)?;
    Ok(SessionReport { previous, reason })
}

// The internal function accepts the display, used for tests.
pub(crate) fn prepare_session_internal<D: Display>(
    display: D,
    options: Options,
    mut payload: Vec<u8>,
) -> Result<PreparedSession<D>, Error> {
    let atoms = Atoms::intern(&display)?;

    if options.trim_newline && payload.last() == Some(&b'\n') {
        payload.pop();
    }

    let mut session = PreparedSession {
        display,
        atoms,
        payload,
        previous: None,
        phase: Phase::Reading,
        handoff_timeout: options.handoff_timeout,
        poll_interval: options.poll_interval,
    };

    if options.read_previous {
        session.previous = session.read_clipboard(options.read_timeout)?;
    }

    session.take_ownership()?;

    Ok(session)
}

impl<D: Display> PreparedSession<D> {
    /// Returns the clipboard contents read before taking the clipboard over.
    pub fn previous(&self) -> Option<&Contents> {
        self.previous.as_ref()
    }

    /// Returns the window that owns the clipboard.
    pub fn window(&self) -> display::Window {
        self.display.window()
    }

    fn read_clipboard(&self, timeout: Duration) -> Result<Option<Contents>, Error> {
        let atoms = &self.atoms;
        let window = self.display.window();

        self.display.convert_selection(
            window,
            atoms.clipboard,
            atoms.utf8_string,
            Some(atoms.transfer),
            CURRENT_TIME,
        )?;
        self.display.flush()?;

        let started = Instant::now();
        let notify = loop {
            if started.elapsed() > timeout {
                debug!("Timed out waiting for the clipboard contents");
                return Ok(None);
            }

            match self.display.poll_for_event()? {
                Some(Event::SelectionNotify(notify))
                    if notify.selection == atoms.clipboard && notify.requestor == window =>
                {
                    break notify;
                }
                Some(Event::SelectionRequest(request)) => {
                    // We don't own anything yet.
                    self.reply(&request, None)?;
                }
                Some(event) => trace!("Ignoring {:?} while reading", event),
                None => thread::sleep(self.poll_interval),
            }
        };

        let Some(property) = notify.property else {
            debug!("The clipboard is empty or can't be converted to text");
            return Ok(None);
        };

        let contents = take_property(&self.display, window, property)?.and_then(|property| {
            let target = if property.type_ == atoms.utf8_string {
                TextTarget::Utf8String
            } else if property.type_ == atoms.string {
                TextTarget::String
            } else {
                debug!("The clipboard contents have non-text type {}", property.type_);
                return None;
            };

            Some(Contents {
                target,
                data: property.data,
            })
        });

        Ok(contents)
    }

    fn take_ownership(&mut self) -> Result<(), Error> {
        let atoms = &self.atoms;
        let window = self.display.window();

        self.display
            .set_selection_owner(atoms.clipboard, Some(window), CURRENT_TIME)?;

        if self.display.get_selection_owner(atoms.clipboard)? != Some(window) {
            return Err(Error::OwnershipDenied);
        }

        info!("Took ownership of the clipboard with {} bytes", self.payload.len());
        self.phase = Phase::Owning;
        Ok(())
    }

    /// Serves requests until `cancel` fires or another client takes the clipboard over.
    ///
    /// Cancellation is checked before every request, so a busy requestor can't hold it off. After
    /// cancellation the contents are offered to the clipboard manager, which is given the hand-off
    /// timeout to save them. Requests keep being served in the meantime. This function **blocks**
    /// until the session is over.
    pub fn serve(mut self, cancel: &CancellationToken) -> Result<TerminationReason, Error> {
        loop {
            match self.phase {
                Phase::Terminal(reason) => {
                    info!("Session over: {:?}", reason);
                    return Ok(reason);
                }
                Phase::HandingOff { requested_at }
                    if requested_at.elapsed() > self.handoff_timeout =>
                {
                    self.phase = Phase::Terminal(TerminationReason::ManagerTimeout);
                    continue;
                }
                Phase::Owning if cancel.is_cancelled() => {
                    self.begin_handoff()?;
                    continue;
                }
                _ => (),
            }

            match self.display.poll_for_event()? {
                Some(event) => self.handle_event(event)?,
                None => thread::sleep(self.poll_interval),
            }
        }
    }

    fn begin_handoff(&mut self) -> Result<(), Error> {
        let atoms = &self.atoms;

        if self.display.get_selection_owner(atoms.clipboard_manager)?.is_none() {
            self.phase = Phase::Terminal(TerminationReason::NoManager);
            return Ok(());
        }

        debug!("Asking the clipboard manager to save the contents");
        self.display.convert_selection(
            self.display.window(),
            atoms.clipboard_manager,
            atoms.save_targets,
            None,
            CURRENT_TIME,
        )?;
        self.display.flush()?;

        self.phase = Phase::HandingOff {
            requested_at: Instant::now(),
        };
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<(), Error> {
        let atoms = self.atoms;

        match event {
            Event::SelectionClear { selection, .. } if selection == atoms.clipboard => {
                let reason = match self.phase {
                    Phase::HandingOff { .. } => TerminationReason::PreemptedDuringHandoff,
                    _ => TerminationReason::Preempted,
                };
                self.phase = Phase::Terminal(reason);
            }
            Event::SelectionRequest(request) if request.selection == atoms.clipboard => {
                self.serve_request(&request)?;
            }
            Event::SelectionRequest(request) => {
                debug!("Refusing request for selection {}", request.selection);
                self.reply(&request, None)?;
            }
            Event::SelectionNotify(SelectionNotify {
                selection,
                property,
                ..
            }) if selection == atoms.clipboard_manager => {
                if let Phase::HandingOff { .. } = self.phase {
                    let reason = if property.is_some() {
                        TerminationReason::Saved
                    } else {
                        TerminationReason::ManagerRefused
                    };
                    self.phase = Phase::Terminal(reason);
                } else {
                    debug!("Ignoring a clipboard manager reply we didn't ask for");
                }
            }
            Event::SelectionNotify(SelectionNotify {
                requestor,
                selection,
                property: Some(property),
                ..
            }) if selection == atoms.clipboard && requestor == self.display.window() => {
                // The previous owner answered after we stopped waiting.
                debug!("Discarding late clipboard contents");
                take_property(&self.display, requestor, property)?;
            }
            Event::Error(err) => warn!("Request failed: {}", err),
            event => trace!("Ignoring {:?}", event),
        }

        Ok(())
    }

    fn serve_request(&self, request: &ConversionRequest) -> Result<(), Error> {
        trace!(
            "Request from {:#x} for target {}",
            request.requestor,
            request.target
        );

        let responder = Responder::new(&self.display, &self.atoms, &self.payload);
        let property = match responder.respond(request) {
            Ok(property) => Some(property),
            Err(err) => {
                let refusal = err.into_refusal()?;
                debug!("Refusing request from {:#x}: {}", request.requestor, refusal);
                None
            }
        };

        self.reply(request, property)
    }

    fn reply(
        &self,
        request: &ConversionRequest,
        property: Option<display::Atom>,
    ) -> Result<(), Error> {
        match self.display.send_selection_notify(&request.reply(property)) {
            // The requestor went away in the meantime.
            Err(err) if !err.is_fatal() => {
                warn!("Couldn't reply to {:#x}: {}", request.requestor, err)
            }
            result => result?,
        }

        self.display.flush()?;
        Ok(())
    }
}
