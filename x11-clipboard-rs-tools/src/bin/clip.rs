#![deny(unsafe_code)]

use std::io::{stdin, Read};
use std::os::unix::ffi::OsStringExt;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::debug;
use signal_hook::consts::{SIGINT, SIGTERM};
use x11_clipboard_rs::cancel::CancellationToken;
use x11_clipboard_rs::session::{self, Error, TerminationReason};
use x11_clipboard_rs_tools::clip::Options;

fn session_options(x: &Options) -> session::Options {
    let mut opts = session::Options::new();
    opts.display(x.display.clone())
        .handoff_timeout(Duration::from_millis(x.handoff_timeout))
        .read_previous(!x.no_read)
        .trim_newline(x.trim_newline);
    opts
}

fn exit_code(reason: TerminationReason) -> i32 {
    match reason {
        TerminationReason::ManagerTimeout => 2,
        _ => 0,
    }
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command-line options.
    let mut options = Options::parse();

    stderrlog::new()
        .verbosity(usize::from(options.verbose) + 1)
        .init()
        .context("Couldn't initialize logging")?;

    let payload = if options.text.is_empty() {
        let mut data = Vec::new();
        stdin()
            .lock()
            .read_to_end(&mut data)
            .context("Couldn't read the standard input")?;
        data
    } else {
        // Join the arguments with spaces.
        let mut iter = options.text.drain(..);
        let mut data = iter.next().unwrap_or_default();

        for arg in iter {
            data.push(" ");
            data.push(arg);
        }

        data.into_vec()
    };

    let cancel = CancellationToken::new();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, cancel.flag())
            .context("Couldn't register the signal handler")?;
    }

    let session = match session_options(&options).prepare(payload) {
        Ok(session) => session,
        Err(err @ Error::OwnershipDenied) => {
            eprintln!("{}", err);
            process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    match session.previous() {
        Some(previous) => println!("read: {}", String::from_utf8_lossy(&previous.data)),
        None => println!("read: <nothing>"),
    }

    let reason = session.serve(&cancel)?;
    debug!("Exiting: {:?}", reason);

    if reason == TerminationReason::ManagerTimeout {
        eprintln!("The clipboard manager didn't save the contents in time");
    }

    process::exit(exit_code(reason));
}
