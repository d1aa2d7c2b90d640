use std::collections::HashMap;

use log::debug;

use super::{
    PacketIo, PreparedStatement, ProtocolError,
    constants::{COM_STMT_CLOSE, COM_STMT_PREPARE, ERR_HEADER, LOCAL_INFILE_HEADER, OK_HEADER},
    packet::{OkPacket, ServerError, read_lenenc_int, read_u16, read_u32},
};

/// Server side handle of a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtMeta {
    pub id: u32,
    pub query: String,
    pub columns: u16,
    pub params: u16,
    pub warnings: u16,
}

impl StmtMeta {
    /// Decodes a prepare OK response:
    /// `[0x00][id: u32][columns: u16][params: u16][filler][warnings: u16]`.
    fn parse(query: &str, data: &[u8]) -> Result<Self, ProtocolError> {
        match data.first() {
            Some(&OK_HEADER) => {}
            Some(&ERR_HEADER) => return Err(ServerError::parse(data)?.into()),
            Some(other) => return Err(ProtocolError::UnexpectedHeader(*other)),
            None => return Err(ProtocolError::Malformed("empty prepare response".into())),
        }

        let short = || ProtocolError::Malformed("short prepare response".into());
        Ok(Self {
            id: read_u32(data, 1).ok_or_else(short)?,
            query: query.to_string(),
            columns: read_u16(data, 5).ok_or_else(short)?,
            params: read_u16(data, 7).ok_or_else(short)?,
            warnings: read_u16(data, 10).unwrap_or_default(),
        })
    }
}

/// Result set whose column definitions and rows are left undecoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResultset {
    pub columns: Vec<Vec<u8>>,
    pub rows: Vec<Vec<u8>>,
}

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Ok(OkPacket),
    Resultset(RawResultset),
}

/// Backend connection plus its prepared statement cache.
///
/// A `Conn` runs one command at a time; share it across callers only behind
/// exclusive access.
pub struct Conn<T: PacketIo> {
    io: T,
    stmts: HashMap<String, StmtMeta>,
}

impl<T: PacketIo> Conn<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            stmts: HashMap::new(),
        }
    }

    pub fn io(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    pub fn is_prepared(&self, query: &str) -> bool {
        self.stmts.contains_key(query)
    }

    pub fn prepared_count(&self) -> usize {
        self.stmts.len()
    }

    /// Prepares `query`, reusing the cached statement when one exists.
    pub fn prepare(&mut self, query: &str) -> Result<PreparedStatement<'_, T>, ProtocolError> {
        if let Some(meta) = self.stmts.get(query).cloned() {
            debug!("prepared statement cache hit for id {}", meta.id);
            return Ok(PreparedStatement::new(self, meta));
        }

        self.write_command(COM_STMT_PREPARE, query.as_bytes())?;
        let data = self.io.read_packet()?;
        let meta = StmtMeta::parse(query, &data)?;

        if meta.columns > 0 {
            self.io.read_until_eof()?;
        }
        if meta.params > 0 {
            self.io.read_until_eof()?;
        }

        debug!(
            "prepared statement {} with {} params and {} columns",
            meta.id, meta.params, meta.columns
        );
        self.stmts.insert(query.to_string(), meta.clone());
        Ok(PreparedStatement::new(self, meta))
    }

    /// Sends a command as the first packet of a fresh sequence.
    pub(crate) fn write_command(&mut self, command: u8, arg: &[u8]) -> Result<(), ProtocolError> {
        let mut data = Vec::with_capacity(1 + arg.len());
        data.push(command);
        data.extend_from_slice(arg);

        self.io.reset_sequence();
        self.io.write_packet(&data)
    }

    /// Drops the cache entry and sends the close command. The server never
    /// replies to it.
    pub(crate) fn close_statement(&mut self, meta: &StmtMeta) -> Result<(), ProtocolError> {
        self.stmts.remove(&meta.query);
        debug!("closing prepared statement {}", meta.id);
        self.write_command(COM_STMT_CLOSE, &meta.id.to_le_bytes())
    }

    pub(crate) fn read_ok(&mut self) -> Result<OkPacket, ProtocolError> {
        let data = self.io.read_packet()?;
        OkPacket::parse(&data)
    }

    /// Reads the reply of an execute command.
    pub(crate) fn read_result(&mut self) -> Result<ExecResult, ProtocolError> {
        let data = self.io.read_packet()?;

        match data.first() {
            Some(&OK_HEADER) => return Ok(ExecResult::Ok(OkPacket::parse(&data)?)),
            Some(&ERR_HEADER) => return Err(ServerError::parse(&data)?.into()),
            Some(&LOCAL_INFILE_HEADER) => {
                return Err(ProtocolError::UnexpectedHeader(LOCAL_INFILE_HEADER));
            }
            Some(_) => {}
            None => return Err(ProtocolError::Malformed("empty result packet".into())),
        }

        let (count, _) = read_lenenc_int(&data)?;
        let columns = self.io.read_until_eof()?;
        if columns.len() as u64 != count {
            return Err(ProtocolError::Malformed(format!(
                "expected {count} column definitions, got {}",
                columns.len()
            )));
        }
        let rows = self.io.read_until_eof()?;

        Ok(ExecResult::Resultset(RawResultset { columns, rows }))
    }

    pub(crate) fn io_mut(&mut self) -> &mut T {
        &mut self.io
    }
}
