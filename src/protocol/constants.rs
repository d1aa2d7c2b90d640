//! Wire constants of the MySQL client protocol used by this crate.

// Commands
pub const COM_STMT_PREPARE: u8 = 0x16;
pub const COM_STMT_EXECUTE: u8 = 0x17;
pub const COM_STMT_CLOSE: u8 = 0x19;

// Response headers
pub const OK_HEADER: u8 = 0x00;
pub const LOCAL_INFILE_HEADER: u8 = 0xFB;
pub const EOF_HEADER: u8 = 0xFE;
pub const ERR_HEADER: u8 = 0xFF;

/// EOF packets are shorter than this; longer 0xFE packets are row data.
pub const EOF_MAX_LEN: usize = 9;

// Execute flags
pub const CURSOR_TYPE_NO_CURSOR: u8 = 0x00;
pub const ITERATION_COUNT: u32 = 1;
pub const NEW_PARAMS_BOUND: u8 = 0x01;
pub const UNSIGNED_FLAG: u8 = 0x80;

// Column types
pub const MYSQL_TYPE_TINY: u8 = 0x01;
pub const MYSQL_TYPE_SHORT: u8 = 0x02;
pub const MYSQL_TYPE_LONG: u8 = 0x03;
pub const MYSQL_TYPE_FLOAT: u8 = 0x04;
pub const MYSQL_TYPE_DOUBLE: u8 = 0x05;
pub const MYSQL_TYPE_NULL: u8 = 0x06;
pub const MYSQL_TYPE_LONGLONG: u8 = 0x08;
pub const MYSQL_TYPE_STRING: u8 = 0xFE;

/// Largest payload carried by a single packet.
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;
