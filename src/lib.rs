pub mod protocol;
pub mod router;

pub use protocol::{Argument, Conn, PacketTransport, PreparedStatement, ProtocolError};
pub use router::{ConfigError, Router, RouterConfig, Rule, SharedRouter};
