//! Copying one chunk from the followed file to the output sink.

use std::io::{self, ErrorKind, Read, Write};

/// Transfer buffer size in bytes.
pub const BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    /// This many bytes were read and fully written.
    Relayed(usize),
    /// Nothing more is available right now.
    Drained,
}

#[derive(Debug)]
pub enum RelayError {
    Read(io::Error),
    Write(io::Error),
}

/// Read once into `buffer` and write everything read to `sink`.
///
/// The sink is flushed before returning so the chunk is out before the next read.
pub fn relay_chunk<R: Read, W: Write>(
    reader: &mut R,
    buffer: &mut [u8],
    sink: &mut W,
) -> Result<Relay, RelayError> {
    let n = loop {
        match reader.read(buffer) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(RelayError::Read(e)),
        }
    };

    if n == 0 {
        return Ok(Relay::Drained);
    }

    write_fully(sink, &buffer[..n]).map_err(RelayError::Write)?;
    sink.flush().map_err(RelayError::Write)?;

    Ok(Relay::Relayed(n))
}

/// Keep writing while the sink accepts bytes.
fn write_fully<W: Write>(sink: &mut W, mut chunk: &[u8]) -> io::Result<()> {
    while !chunk.is_empty() {
        match sink.write(chunk) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "output accepted no bytes",
                ))
            }
            Ok(written) => chunk = &chunk[written..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
