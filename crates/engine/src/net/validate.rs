use std::net::SocketAddr;

use thiserror::Error;

use super::protocol::{
    proto_major, proto_minor, MsgHeader, MsgId, HEADER_SIZE, MSG_MAGIC, POSITION_PACKET_SIZE,
    PROTO_VER, RELAY_MAGIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub header: MsgHeader,
    pub msg_id: MsgId,
    pub relay_sourced: bool,
}

/// Why a datagram was refused. The display text is what the admin views
/// show next to the diagnostic session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("packet too small ({len} bytes)")]
    TooSmall { len: usize },
    #[error("illegal magic number {magic:#010x}")]
    IllegalMagic { magic: u32 },
    #[error("version mismatch: expected {}.{}, got {}.{}",
        proto_major(PROTO_VER), proto_minor(PROTO_VER),
        proto_major(*.actual), proto_minor(*.actual))]
    VersionMismatch { actual: u32 },
    #[error("insufficient position data: expected {expected}, got {actual}")]
    InsufficientPositionData { expected: usize, actual: usize },
}

pub fn validate(buf: &[u8], sender: SocketAddr) -> Result<Accepted, RejectReason> {
    if buf.len() < HEADER_SIZE {
        log::trace!("{}: {} byte datagram", sender, buf.len());
        return Err(RejectReason::TooSmall { len: buf.len() });
    }

    let header = MsgHeader::decode(buf);
    let relay_sourced = match header.magic {
        MSG_MAGIC => false,
        RELAY_MAGIC => true,
        magic => return Err(RejectReason::IllegalMagic { magic }),
    };

    if header.version != PROTO_VER {
        return Err(RejectReason::VersionMismatch {
            actual: header.version,
        });
    }

    let msg_id = header.id();
    if msg_id == MsgId::Position {
        let actual = (header.msg_len as usize).min(buf.len());
        if actual < POSITION_PACKET_SIZE {
            return Err(RejectReason::InsufficientPositionData {
                expected: POSITION_PACKET_SIZE,
                actual,
            });
        }
    }

    Ok(Accepted {
        header,
        msg_id,
        relay_sourced,
    })
}
