use thiserror::Error;

use super::{
    ProtocolError,
    constants::{ERR_HEADER, OK_HEADER},
};

/// Error reported by the server in an ERR packet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("ERROR {code} ({state}): {message}")]
pub struct ServerError {
    pub code: u16,
    pub state: String,
    pub message: String,
}

impl ServerError {
    /// Decodes an ERR packet payload, header byte included.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.first() != Some(&ERR_HEADER) || data.len() < 3 {
            return Err(ProtocolError::Malformed("short error packet".into()));
        }
        let code = u16::from_le_bytes([data[1], data[2]]);
        let mut rest = &data[3..];

        let mut state = String::from("HY000");
        if rest.first() == Some(&b'#') && rest.len() >= 6 {
            state = String::from_utf8_lossy(&rest[1..6]).into_owned();
            rest = &rest[6..];
        }

        Ok(Self {
            code,
            state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// Decoded OK packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: u16,
    pub warnings: u16,
}

impl OkPacket {
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        match data.first() {
            Some(&OK_HEADER) => {}
            Some(&ERR_HEADER) => return Err(ServerError::parse(data)?.into()),
            Some(other) => return Err(ProtocolError::UnexpectedHeader(*other)),
            None => return Err(ProtocolError::Malformed("empty packet".into())),
        }

        let mut pos = 1;
        let (affected_rows, n) = read_lenenc_int(&data[pos..])?;
        pos += n;
        let (last_insert_id, n) = read_lenenc_int(&data[pos..])?;
        pos += n;

        let status = read_u16(data, pos).unwrap_or_default();
        let warnings = read_u16(data, pos + 2).unwrap_or_default();

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
        })
    }
}

pub(crate) fn read_u16(data: &[u8], pos: usize) -> Option<u16> {
    data.get(pos..pos + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Appends a length-encoded integer.
pub fn write_lenenc_int(buf: &mut Vec<u8>, value: u64) {
    if value < 251 {
        buf.push(value as u8);
    } else if value < 0x1_0000 {
        buf.push(0xFC);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < 0x100_0000 {
        buf.push(0xFD);
        buf.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xFE);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Reads a length-encoded integer, returning the value and the number of
/// bytes consumed.
pub fn read_lenenc_int(data: &[u8]) -> Result<(u64, usize), ProtocolError> {
    let width = match data.first() {
        Some(0..=250) => return Ok((u64::from(data[0]), 1)),
        Some(0xFC) => 2,
        Some(0xFD) => 3,
        Some(0xFE) => 8,
        Some(b) => {
            return Err(ProtocolError::Malformed(format!(
                "invalid length-encoded integer prefix 0x{b:02x}"
            )));
        }
        None => return Err(ProtocolError::Malformed("missing length-encoded integer".into())),
    };

    let bytes = data
        .get(1..1 + width)
        .ok_or_else(|| ProtocolError::Malformed("truncated length-encoded integer".into()))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(bytes);

    Ok((u64::from_le_bytes(buf), 1 + width))
}
