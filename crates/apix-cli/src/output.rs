use std::io::{self, Write};

use serde::Serialize;

use crate::error::CliError;

pub fn render<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

/// Writes one compact JSON document per line.
pub struct NdjsonWriter<W: Write> {
    inner: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), CliError> {
        serde_json::to_writer(&mut self.inner, value)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), CliError> {
        self.inner.flush()?;
        Ok(())
    }
}

pub fn stdout_ndjson() -> NdjsonWriter<io::StdoutLock<'static>> {
    NdjsonWriter::new(io::stdout().lock())
}
