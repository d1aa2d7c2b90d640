use log::debug;

use super::{
    Argument, Conn, ExecResult, PacketIo, ProtocolError, RawResultset, StmtMeta,
    codec::encode_execute, packet::OkPacket,
};

/// Decodes the rows of a binary result set. Supplied by the caller.
pub trait RowDecoder {
    type Row;

    fn decode(&self, columns: &[Vec<u8>], row: &[u8]) -> Result<Self::Row, ProtocolError>;
}

/// A statement prepared on the borrowed connection.
///
/// Obtained from [`Conn::prepare`]. Executing is repeatable; [`close`](Self::close)
/// consumes the handle.
pub struct PreparedStatement<'c, T: PacketIo> {
    conn: &'c mut Conn<T>,
    meta: StmtMeta,
}

impl<'c, T: PacketIo> PreparedStatement<'c, T> {
    pub(crate) fn new(conn: &'c mut Conn<T>, meta: StmtMeta) -> Self {
        Self { conn, meta }
    }

    pub fn id(&self) -> u32 {
        self.meta.id
    }

    pub fn sql(&self) -> &str {
        &self.meta.query
    }

    pub fn param_count(&self) -> u16 {
        self.meta.params
    }

    pub fn column_count(&self) -> u16 {
        self.meta.columns
    }

    pub fn meta(&self) -> &StmtMeta {
        &self.meta
    }

    /// Encodes `args` and sends the execute command. Nothing is sent if the
    /// arguments do not match the statement.
    fn write(&mut self, args: &[Argument]) -> Result<(), ProtocolError> {
        let data = encode_execute(self.meta.id, self.meta.params, args)?;
        debug!("executing statement {} with {} args", self.meta.id, args.len());

        let io = self.conn.io_mut();
        io.reset_sequence();
        io.write_packet(&data)
    }

    /// Executes the statement and returns the undecoded reply.
    pub fn execute(&mut self, args: &[Argument]) -> Result<ExecResult, ProtocolError> {
        self.write(args)?;
        self.conn.read_result()
    }

    /// Executes a statement that produces no result set.
    pub fn exec(&mut self, args: &[Argument]) -> Result<OkPacket, ProtocolError> {
        self.write(args)?;
        self.conn.read_ok()
    }

    /// Executes the statement and decodes every row with `decoder`.
    pub fn query<D: RowDecoder>(
        &mut self,
        decoder: &D,
        args: &[Argument],
    ) -> Result<Vec<D::Row>, ProtocolError> {
        match self.execute(args)? {
            ExecResult::Ok(_) => Ok(Vec::new()),
            ExecResult::Resultset(RawResultset { columns, rows }) => rows
                .iter()
                .map(|row| decoder.decode(&columns, row))
                .collect(),
        }
    }

    /// Releases the server side statement without waiting for a reply.
    pub fn close(self) -> Result<(), ProtocolError> {
        self.conn.close_statement(&self.meta)
    }
}
