//! The instrument bus seam.
//!
//! Everything that moves bytes to and from an instrument goes through the two
//! traits in this module. The drivers never talk to a transport directly, so a
//! real VISA backend (see `visa_bus`, behind the `visa` feature) and the
//! scripted [`MockBus`](crate::mock_bus::MockBus) are interchangeable.

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Could not open resource {resource}: {reason}")]
    Open { resource: String, reason: String },

    #[error("Timeout while waiting for a response to '{command}'")]
    Timeout { command: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Response is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Bus backend error: {0}")]
    Backend(String),
}

/// One open connection to an instrument.
///
/// Implementors provide the raw primitives; `query` and `query_binary` have
/// default implementations that honour the configured query delay.
pub trait InstrumentBus: Send {
    /// Send one command. The implementation appends the line terminator.
    fn write(&mut self, command: &str) -> Result<(), BusError>;

    /// Read one complete response message, terminator included.
    fn read_raw(&mut self) -> Result<Vec<u8>, BusError>;

    fn query_delay(&self) -> Duration;

    fn set_query_delay(&mut self, delay: Duration);

    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError>;

    /// Write `command`, wait the query delay and read the response as text.
    fn query(&mut self, command: &str) -> Result<String, BusError> {
        let raw = self.query_binary(command)?;
        Ok(String::from_utf8(raw)?)
    }

    /// Write `command`, wait the query delay and read the raw response bytes.
    fn query_binary(&mut self, command: &str) -> Result<Vec<u8>, BusError> {
        self.write(command)?;
        let delay = self.query_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.read_raw()
    }
}

/// Enumerates and opens bus resources.
pub trait ResourceManager: Send + Sync {
    /// Identifiers of every resource currently present on the bus.
    fn list_resources(&self) -> Result<Vec<String>, BusError>;

    fn open(&self, resource: &str) -> Result<Box<dyn InstrumentBus>, BusError>;
}

/// Read one response message from a chunked stream.
///
/// A read shorter than `chunk_size` marks the end of the message. A message
/// that fills whole chunks ends once it is complete: a definite-length block
/// has its declared payload plus the terminator, anything else ends in `\n`.
#[cfg_attr(not(feature = "visa"), allow(dead_code))]
pub(crate) fn read_message<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut message = Vec::new();
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut chunk)?;
        message.extend_from_slice(&chunk[..n]);
        if n < chunk_size || message_complete(&message) {
            return Ok(message);
        }
    }
}

fn message_complete(data: &[u8]) -> bool {
    if let Some(marker) = data.iter().position(|&b| b == b'#') {
        if let Some(digits) = data
            .get(marker + 1)
            .filter(|b| (b'1'..=b'9').contains(*b))
            .map(|b| usize::from(b - b'0'))
        {
            let payload_start = marker + 2 + digits;
            let Some(field) = data.get(marker + 2..payload_start) else {
                return false;
            };
            let declared = std::str::from_utf8(field)
                .ok()
                .and_then(|s| s.parse::<usize>().ok());
            if let Some(len) = declared {
                return data.len() > payload_start + len;
            }
        }
    }
    data.last() == Some(&b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out scripted chunks and fails on any read past them, standing in
    /// for a transport that would block until the timeout.
    struct Chunks(Vec<Vec<u8>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read past end"));
            }
            let chunk = self.0.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_short_read_ends_message() {
        let mut reader = Chunks(vec![b"1.0E+0\n".to_vec()]);
        assert_eq!(read_message(&mut reader, 16).unwrap(), b"1.0E+0\n");
    }

    #[test]
    fn test_text_filling_whole_chunk() {
        let mut text = vec![b'A'; 4095];
        text.push(b'\n');
        let mut reader = Chunks(vec![text.clone()]);
        assert_eq!(read_message(&mut reader, 4096).unwrap(), text);
    }

    #[test]
    fn test_block_filling_whole_chunks() {
        // "#44089" header, 4089 payload bytes and the terminator: exactly 4096.
        let mut block = b"#44089".to_vec();
        block.extend_from_slice(&[b'\n'; 4089]);
        block.push(b'\n');
        assert_eq!(block.len(), 4096);
        let mut reader = Chunks(vec![block.clone()]);
        assert_eq!(read_message(&mut reader, 4096).unwrap(), block);
    }

    #[test]
    fn test_block_spanning_chunks() {
        let mut block = b"#211".to_vec();
        block.extend_from_slice(&[7; 11]);
        block.push(b'\n');
        let mut reader = Chunks(block.chunks(4).map(<[u8]>::to_vec).collect());
        assert_eq!(read_message(&mut reader, 4).unwrap(), block);
    }

    #[test]
    fn test_payload_newline_does_not_end_block() {
        let mut reader = Chunks(vec![b"#14\n\n".to_vec(), b"\n\n\n".to_vec()]);
        assert_eq!(read_message(&mut reader, 5).unwrap(), b"#14\n\n\n\n\n");
    }
}
