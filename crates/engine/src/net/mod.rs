mod protocol;
mod stats;
mod transport;
mod validate;
pub mod xdr;

pub use protocol::{
    chat_packet, position_packet, proto_major, proto_minor, read_fixed, set_magic, set_msg_id,
    write_fixed, MsgHeader, MsgId, PositionMsg, CHAT_PACKET_SIZE, DEFAULT_PORT, HEADER_SIZE,
    MAX_CALLSIGN_LEN, MAX_CHAT_MSG_LEN, MAX_MODEL_NAME_LEN, MAX_PACKET_SIZE, MSG_MAGIC,
    POSITION_PACKET_SIZE, POSITION_SIZE, PROTO_VER, RELAY_MAGIC, SERVER_CALLSIGN,
};
pub use stats::NetworkStats;
pub use transport::{NetworkEndpoint, Transport};
pub use validate::{validate, Accepted, RejectReason};
