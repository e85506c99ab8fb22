use std::ffi::OsString;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "clip",
    version,
    about = "Copy text to the X11 clipboard and hand it to the clipboard manager on exit."
)]
pub struct Options {
    /// Trim the trailing newline character before copying
    #[arg(long, short = 'n')]
    pub trim_newline: bool,

    /// Don't read the current clipboard contents before taking it over
    #[arg(long)]
    pub no_read: bool,

    /// X display to connect to
    ///
    /// By default the display named by $DISPLAY is used.
    #[arg(long, short)]
    pub display: Option<String>,

    /// How long to wait for the clipboard manager to save the contents, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub handoff_timeout: u64,

    /// Text to copy
    ///
    /// If not specified, clip will use data from the standard input.
    #[arg(name = "TEXT TO COPY")]
    pub text: Vec<OsString>,

    /// Enable verbose logging
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
