use glam::{DVec3, Vec3};

use super::xdr::{read_f32, read_f64, read_u32, write_f32, write_f64, write_u32, XDR_UNIT, XDR_UNIT2};

pub const MAX_PACKET_SIZE: usize = 1200;
pub const DEFAULT_PORT: u16 = 5000;

/// "FGFS", stamped on packets exchanged with clients.
pub const MSG_MAGIC: u32 = 0x4647_4653;
/// "SFGF", stamped on packets exchanged between servers.
pub const RELAY_MAGIC: u32 = 0x5346_4746;
/// Protocol 1.1; major in the high half, minor in the low half.
pub const PROTO_VER: u32 = 0x0001_0001;

pub const MAX_CALLSIGN_LEN: usize = 8;
pub const MAX_MODEL_NAME_LEN: usize = 96;
pub const MAX_CHAT_MSG_LEN: usize = 256;

pub const HEADER_SIZE: usize = 6 * XDR_UNIT + MAX_CALLSIGN_LEN;
pub const POSITION_SIZE: usize = MAX_MODEL_NAME_LEN + 5 * XDR_UNIT2 + 15 * XDR_UNIT;
pub const POSITION_PACKET_SIZE: usize = HEADER_SIZE + POSITION_SIZE;
pub const CHAT_PACKET_SIZE: usize = HEADER_SIZE + MAX_CHAT_MSG_LEN;

pub const SERVER_CALLSIGN: &str = "*FGMS*";

const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_MSG_ID: usize = 8;
const OFF_MSG_LEN: usize = 12;
const OFF_REPLY_ADDRESS: usize = 16;
const OFF_REPLY_PORT: usize = 20;
const OFF_CALLSIGN: usize = 24;

const OFF_TIME: usize = MAX_MODEL_NAME_LEN;
const OFF_LAG: usize = OFF_TIME + XDR_UNIT2;
const OFF_POSITION: usize = OFF_LAG + XDR_UNIT2;
const OFF_ORIENTATION: usize = OFF_POSITION + 3 * XDR_UNIT2;
const OFF_LINEAR_VEL: usize = OFF_ORIENTATION + 3 * XDR_UNIT;
const OFF_ANGULAR_VEL: usize = OFF_LINEAR_VEL + 3 * XDR_UNIT;
const OFF_LINEAR_ACCEL: usize = OFF_ANGULAR_VEL + 3 * XDR_UNIT;
const OFF_ANGULAR_ACCEL: usize = OFF_LINEAR_ACCEL + 3 * XDR_UNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgId {
    /// Deprecated by clients; still used for server notices.
    Chat,
    Reset,
    Position,
    Ping,
    Pong,
    Other(u32),
}

impl MsgId {
    pub const CHAT: u32 = 1;
    pub const RESET: u32 = 6;
    pub const POSITION: u32 = 7;
    pub const PING: u32 = 9;
    pub const PONG: u32 = 10;

    pub fn as_u32(self) -> u32 {
        match self {
            MsgId::Chat => Self::CHAT,
            MsgId::Reset => Self::RESET,
            MsgId::Position => Self::POSITION,
            MsgId::Ping => Self::PING,
            MsgId::Pong => Self::PONG,
            MsgId::Other(id) => id,
        }
    }
}

impl From<u32> for MsgId {
    fn from(value: u32) -> Self {
        match value {
            Self::CHAT => MsgId::Chat,
            Self::RESET => MsgId::Reset,
            Self::POSITION => MsgId::Position,
            Self::PING => MsgId::Ping,
            Self::PONG => MsgId::Pong,
            other => MsgId::Other(other),
        }
    }
}

#[inline]
pub fn proto_major(version: u32) -> u16 {
    (version >> 16) as u16
}

#[inline]
pub fn proto_minor(version: u32) -> u16 {
    (version & 0xFFFF) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub magic: u32,
    pub version: u32,
    pub msg_id: u32,
    pub msg_len: u32,
    pub reply_address: u32,
    pub reply_port: u32,
    pub callsign: [u8; MAX_CALLSIGN_LEN],
}

impl MsgHeader {
    pub fn new(msg_id: MsgId, msg_len: usize, callsign: &str) -> Self {
        let mut name = [0u8; MAX_CALLSIGN_LEN];
        write_fixed(&mut name, callsign);
        Self {
            magic: MSG_MAGIC,
            version: PROTO_VER,
            msg_id: msg_id.as_u32(),
            msg_len: msg_len as u32,
            reply_address: 0,
            reply_port: 0,
            callsign: name,
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut callsign = [0u8; MAX_CALLSIGN_LEN];
        callsign.copy_from_slice(&buf[OFF_CALLSIGN..OFF_CALLSIGN + MAX_CALLSIGN_LEN]);
        Self {
            magic: read_u32(buf, OFF_MAGIC),
            version: read_u32(buf, OFF_VERSION),
            msg_id: read_u32(buf, OFF_MSG_ID),
            msg_len: read_u32(buf, OFF_MSG_LEN),
            reply_address: read_u32(buf, OFF_REPLY_ADDRESS),
            reply_port: read_u32(buf, OFF_REPLY_PORT),
            callsign,
        }
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        write_u32(buf, OFF_MAGIC, self.magic);
        write_u32(buf, OFF_VERSION, self.version);
        write_u32(buf, OFF_MSG_ID, self.msg_id);
        write_u32(buf, OFF_MSG_LEN, self.msg_len);
        write_u32(buf, OFF_REPLY_ADDRESS, self.reply_address);
        write_u32(buf, OFF_REPLY_PORT, self.reply_port);
        buf[OFF_CALLSIGN..OFF_CALLSIGN + MAX_CALLSIGN_LEN].copy_from_slice(&self.callsign);
    }

    pub fn id(&self) -> MsgId {
        MsgId::from(self.msg_id)
    }

    pub fn callsign(&self) -> String {
        read_fixed(&self.callsign)
    }
}

#[inline]
pub fn set_magic(packet: &mut [u8], magic: u32) {
    write_u32(packet, OFF_MAGIC, magic);
}

#[inline]
pub fn set_msg_id(packet: &mut [u8], msg_id: MsgId) {
    write_u32(packet, OFF_MSG_ID, msg_id.as_u32());
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionMsg {
    pub model: String,
    pub time: f64,
    pub lag: f64,
    pub position: DVec3,
    /// Angle-axis orientation: the direction is the axis, the length the angle.
    pub orientation: Vec3,
    pub linear_vel: Vec3,
    pub angular_vel: Vec3,
    pub linear_accel: Vec3,
    pub angular_accel: Vec3,
}

impl Default for PositionMsg {
    fn default() -> Self {
        Self {
            model: String::new(),
            time: 0.0,
            lag: 0.0,
            position: DVec3::ZERO,
            orientation: Vec3::ZERO,
            linear_vel: Vec3::ZERO,
            angular_vel: Vec3::ZERO,
            linear_accel: Vec3::ZERO,
            angular_accel: Vec3::ZERO,
        }
    }
}

impl PositionMsg {
    pub fn new(model: &str, position: DVec3, orientation: Vec3) -> Self {
        Self {
            model: model.to_string(),
            position,
            orientation,
            ..Default::default()
        }
    }

    pub fn decode(payload: &[u8]) -> Self {
        Self {
            model: read_fixed(&payload[..MAX_MODEL_NAME_LEN]),
            time: read_f64(payload, OFF_TIME),
            lag: read_f64(payload, OFF_LAG),
            position: read_dvec3(payload, OFF_POSITION),
            orientation: read_vec3(payload, OFF_ORIENTATION),
            linear_vel: read_vec3(payload, OFF_LINEAR_VEL),
            angular_vel: read_vec3(payload, OFF_ANGULAR_VEL),
            linear_accel: read_vec3(payload, OFF_LINEAR_ACCEL),
            angular_accel: read_vec3(payload, OFF_ANGULAR_ACCEL),
        }
    }

    pub fn decode_pose(payload: &[u8]) -> (DVec3, Vec3) {
        (
            read_dvec3(payload, OFF_POSITION),
            read_vec3(payload, OFF_ORIENTATION),
        )
    }

    pub fn encode_into(&self, payload: &mut [u8]) {
        write_fixed(&mut payload[..MAX_MODEL_NAME_LEN], &self.model);
        write_f64(payload, OFF_TIME, self.time);
        write_f64(payload, OFF_LAG, self.lag);
        write_dvec3(payload, OFF_POSITION, self.position);
        write_vec3(payload, OFF_ORIENTATION, self.orientation);
        write_vec3(payload, OFF_LINEAR_VEL, self.linear_vel);
        write_vec3(payload, OFF_ANGULAR_VEL, self.angular_vel);
        write_vec3(payload, OFF_LINEAR_ACCEL, self.linear_accel);
        write_vec3(payload, OFF_ANGULAR_ACCEL, self.angular_accel);
    }
}

pub fn position_packet(magic: u32, callsign: &str, position: &PositionMsg) -> Vec<u8> {
    let mut packet = vec![0u8; POSITION_PACKET_SIZE];
    let mut header = MsgHeader::new(MsgId::Position, POSITION_PACKET_SIZE, callsign);
    header.magic = magic;
    header.encode_into(&mut packet);
    position.encode_into(&mut packet[HEADER_SIZE..]);
    packet
}

/// Builds a server chat notice. Text longer than the chat field is truncated.
pub fn chat_packet(text: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; CHAT_PACKET_SIZE];
    MsgHeader::new(MsgId::Chat, CHAT_PACKET_SIZE, SERVER_CALLSIGN).encode_into(&mut packet);
    let len = text.len().min(MAX_CHAT_MSG_LEN - 1);
    packet[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&text[..len]);
    packet
}

pub fn read_fixed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Writes `value` into a NUL-padded field, keeping at least one NUL.
pub fn write_fixed(field: &mut [u8], value: &str) {
    field.fill(0);
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len().saturating_sub(1));
    field[..len].copy_from_slice(&bytes[..len]);
}

fn read_dvec3(buf: &[u8], offset: usize) -> DVec3 {
    DVec3::new(
        read_f64(buf, offset),
        read_f64(buf, offset + XDR_UNIT2),
        read_f64(buf, offset + 2 * XDR_UNIT2),
    )
}

fn write_dvec3(buf: &mut [u8], offset: usize, v: DVec3) {
    write_f64(buf, offset, v.x);
    write_f64(buf, offset + XDR_UNIT2, v.y);
    write_f64(buf, offset + 2 * XDR_UNIT2, v.z);
}

fn read_vec3(buf: &[u8], offset: usize) -> Vec3 {
    Vec3::new(
        read_f32(buf, offset),
        read_f32(buf, offset + XDR_UNIT),
        read_f32(buf, offset + 2 * XDR_UNIT),
    )
}

fn write_vec3(buf: &mut [u8], offset: usize, v: Vec3) {
    write_f32(buf, offset, v.x);
    write_f32(buf, offset + XDR_UNIT, v.y);
    write_f32(buf, offset + 2 * XDR_UNIT, v.z);
}
