//! A safe Rust crate for working with the X11 clipboard.
//!
//! This crate is intended to be used by terminal applications and other utilities which don't
//! show any windows. It keeps a hidden window of its own for the selection protocol: it reads the
//! current `CLIPBOARD` selection as text, takes the selection over with new contents, answers
//! conversion requests from other clients (`TARGETS`, `MULTIPLE`, `UTF8_STRING` and `STRING`),
//! and finally offers the contents to the clipboard manager through `SAVE_TARGETS` so that they
//! survive the process.
//!
//! The X11 protocol is spoken through the pure Rust [x11rb](https://docs.rs/x11rb) connection.
//! The state machine itself only depends on the [`display::Display`] trait.
//!
//! The crate also contains [`search`], a Knuth-Morris-Pratt substring search over bytes.
//!
//! # Examples
//!
//! Publishing text until someone else copies something, then handing it to the clipboard
//! manager:
//! ```no_run
//! # extern crate x11_clipboard_rs;
//! # use x11_clipboard_rs::session::Error;
//! # fn foo() -> Result<(), Error> {
//! use x11_clipboard_rs::cancel::CancellationToken;
//! use x11_clipboard_rs::session::{Options, TerminationReason};
//!
//! let report = Options::new().run(b"Hello world!".to_vec(), &CancellationToken::new())?;
//! if let Some(previous) = report.previous {
//!     println!("Replaced: {}", String::from_utf8_lossy(&previous.data));
//! }
//! if report.reason == TerminationReason::Preempted {
//!     println!("Someone else copied something");
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/x11-clipboard-rs/0.1.0")]
#![deny(unsafe_code)]

mod atoms;
mod property;
mod serve;

#[cfg(test)]
mod tests;

pub mod cancel;
pub mod display;
pub mod search;
pub mod session;
pub mod x11;
