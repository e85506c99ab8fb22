use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag asking a running session to hand the clipboard off and exit.
///
/// Clones share the same flag. The session only ever reads it, so it can be set from another
/// thread, a test or a signal handler.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipboard_rs;
/// use x11_clipboard_rs::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// std::thread::spawn(move || {
///     std::thread::sleep(std::time::Duration::from_secs(10));
///     handle.cancel();
/// });
///
/// // Hand `token` to `PreparedSession::serve()`; it returns within the hand-off timeout after
/// // the thread above fires.
/// # drop(token);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns the underlying flag, e.g. for registering it with a signal handler.
    #[inline]
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }
}
