//! Packet distribution engine for the FlightGear multiplayer relay.
//!
//! [`Engine`] owns the session, relay, crossfeed and blacklist registries and
//! fans every accepted datagram out through a [`Transport`]. It never blocks
//! and never spawns; the caller drives it with [`Engine::handle_packet`],
//! [`Engine::sweep`] and [`Engine::tracker_tick`].

pub mod admin;
pub mod blacklist;
pub mod chat;
pub mod engine;
pub mod event;
pub mod geometry;
pub mod net;
pub mod peers;
pub mod session;
pub mod tracker;

pub use admin::{AdminSnapshot, BlacklistView, CrossfeedView, EngineStats, RelayView, SessionView};
pub use blacklist::{Blacklist, BlacklistEntry, BlacklistSelector};
pub use chat::{ChatMessage, ChatQueue, BROADCAST};
pub use engine::{Engine, EngineConfig};
pub use event::{EngineEvent, LeaveReason};
pub use geometry::{Attitude, Geod};
pub use net::{
    MsgHeader, MsgId, NetworkEndpoint, NetworkStats, PositionMsg, RejectReason, Transport,
    DEFAULT_PORT, MAX_PACKET_SIZE, MSG_MAGIC, PROTO_VER, RELAY_MAGIC,
};
pub use peers::{CrossfeedPeer, CrossfeedTable, RelayPeer, RelayTable};
pub use session::{Origin, Session, SessionDirectory};
pub use tracker::{TrackerEvent, TrackerFeed, TrackerKind};
