//! Diagnostic logging setup
//!
//! Log lines go to stdout through `tracing`. The conversation transcript is
//! not a log target; see [`crate::transcript`].

use std::borrow::Cow;
use std::io::{self, Write};

use crossterm::terminal;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, honouring `RUST_LOG` (default `info`)
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(|| RawModeWriter::new(io::stdout()))
        .init();
}

/// Writer that keeps log lines readable while the terminal is in raw mode
///
/// Raw mode disables output post-processing, so a bare `\n` moves down
/// without returning to column 0.
pub struct RawModeWriter<W> {
    inner: W,
}

impl<W: Write> RawModeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !terminal::is_raw_mode_enabled().unwrap_or(false) {
            return self.inner.write(buf);
        }

        self.inner.write_all(&to_crlf(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn to_crlf(buf: &[u8]) -> Cow<'_, [u8]> {
    if !buf.contains(&b'\n') {
        return Cow::Borrowed(buf);
    }

    let mut out = Vec::with_capacity(buf.len() + 8);
    let mut prev = 0u8;
    for &byte in buf {
        if byte == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        prev = byte;
    }
    Cow::Owned(out)
}
