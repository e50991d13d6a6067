pub mod packet;
pub mod status;
pub mod varint;

pub use packet::{InboundPacket, PacketBuilder, PacketReader};
pub use status::{query_status, ServerStatus};
