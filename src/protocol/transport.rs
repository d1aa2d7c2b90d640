use std::io::{Read, Write};

use log::trace;

use super::{
    ProtocolError,
    constants::{EOF_HEADER, EOF_MAX_LEN, ERR_HEADER, MAX_PAYLOAD_LEN},
    packet::ServerError,
};

/// Packet level connection to a backend.
///
/// Implementations own packet framing and the sequence counter; statement code
/// only deals in payloads.
pub trait PacketIo {
    fn write_packet(&mut self, payload: &[u8]) -> Result<(), ProtocolError>;

    fn read_packet(&mut self) -> Result<Vec<u8>, ProtocolError>;

    /// Restarts the packet sequence; every command starts at zero.
    fn reset_sequence(&mut self);

    /// Reads packets up to and excluding the next EOF marker.
    fn read_until_eof(&mut self) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let mut packets = Vec::new();
        loop {
            let data = self.read_packet()?;
            match data.first() {
                Some(&EOF_HEADER) if data.len() < EOF_MAX_LEN => return Ok(packets),
                Some(&ERR_HEADER) => return Err(ServerError::parse(&data)?.into()),
                _ => packets.push(data),
            }
        }
    }
}

/// Frames payloads as `[3-byte length][sequence id][payload]` over any stream.
pub struct PacketTransport<T: Read + Write> {
    stream: T,
    sequence: u8,
}

impl<T: Read + Write> PacketTransport<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            sequence: 0,
        }
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    fn write_frame(&mut self, chunk: &[u8]) -> Result<(), ProtocolError> {
        let len = (chunk.len() as u32).to_le_bytes();
        self.stream
            .write_all(&[len[0], len[1], len[2], self.sequence])?;
        self.stream.write_all(chunk)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header)?;

        if header[3] != self.sequence {
            return Err(ProtocolError::Malformed(format!(
                "packet out of order, expected sequence {} got {}",
                self.sequence, header[3]
            )));
        }
        self.sequence = self.sequence.wrapping_add(1);

        let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        let mut payload = vec![0; len];
        self.stream.read_exact(&mut payload)?;
        Ok(payload)
    }
}

impl<T: Read + Write> PacketIo for PacketTransport<T> {
    fn write_packet(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        trace!("write packet: {} bytes, sequence {}", payload.len(), self.sequence);

        for chunk in payload.chunks(MAX_PAYLOAD_LEN) {
            self.write_frame(chunk)?;
        }
        // A payload that fills its last frame is terminated by an empty one.
        if payload.len() % MAX_PAYLOAD_LEN == 0 {
            self.write_frame(&[])?;
        }

        self.stream.flush()?;
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut payload = self.read_frame()?;
        let mut last = payload.len();

        while last == MAX_PAYLOAD_LEN {
            let next = self.read_frame()?;
            last = next.len();
            payload.extend_from_slice(&next);
        }

        trace!("read packet: {} bytes", payload.len());
        Ok(payload)
    }

    fn reset_sequence(&mut self) {
        self.sequence = 0;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{self, Cursor};

    use super::*;

    /// In-memory stream: reads from a canned server reply, records writes.
    pub(crate) struct Duplex {
        pub input: Cursor<Vec<u8>>,
        pub output: Vec<u8>,
    }

    impl Duplex {
        pub fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn frame(sequence: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() as u32).to_le_bytes();
        let mut out = vec![len[0], len[1], len[2], sequence];
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn write_frames_payload() {
        let mut transport = PacketTransport::new(Duplex::new(Vec::new()));

        transport.write_packet(b"\x03select 1").unwrap();
        transport.write_packet(b"\x0e").unwrap();

        let mut expected = frame(0, b"\x03select 1");
        expected.extend(frame(1, b"\x0e"));
        assert_eq!(transport.sequence(), 2);
        assert_eq!(transport.into_inner().output, expected);
    }

    #[test]
    fn reset_sequence_restarts_numbering() {
        let mut transport = PacketTransport::new(Duplex::new(Vec::new()));

        transport.write_packet(b"a").unwrap();
        transport.reset_sequence();
        transport.write_packet(b"b").unwrap();

        let mut expected = frame(0, b"a");
        expected.extend(frame(0, b"b"));
        assert_eq!(transport.into_inner().output, expected);
    }

    #[test]
    fn read_checks_sequence() {
        let mut input = frame(0, b"first");
        input.extend(frame(5, b"second"));
        let mut transport = PacketTransport::new(Duplex::new(input));

        assert_eq!(transport.read_packet().unwrap(), b"first");
        assert!(matches!(
            transport.read_packet(),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn read_until_eof_collects_packets() {
        let mut input = frame(0, b"col1");
        input.extend(frame(1, b"col2"));
        input.extend(frame(2, &[EOF_HEADER, 0, 0, 2, 0]));
        input.extend(frame(3, b"after"));
        let mut transport = PacketTransport::new(Duplex::new(input));

        let packets = transport.read_until_eof().unwrap();
        assert_eq!(packets, vec![b"col1".to_vec(), b"col2".to_vec()]);
        assert_eq!(transport.read_packet().unwrap(), b"after");
    }

    #[test]
    fn read_until_eof_surfaces_server_error() {
        let mut input = frame(0, b"row");
        input.extend(frame(1, &[ERR_HEADER, 0x15, 0x04, b'#', b'2', b'8', b'0', b'0', b'0', b'x']));
        let mut transport = PacketTransport::new(Duplex::new(input));

        match transport.read_until_eof() {
            Err(ProtocolError::Server(e)) => {
                assert_eq!(e.code, 1045);
                assert_eq!(e.state, "28000");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let mut transport = PacketTransport::new(Duplex::new(vec![5, 0, 0, 0, b'a']));

        assert!(matches!(transport.read_packet(), Err(ProtocolError::Io(_))));
    }
}
