//! Read model handed to admin surfaces. Everything here is a copy; holders
//! never see live registry state.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use glam::{DVec3, Vec3};

use crate::blacklist::BlacklistEntry;
use crate::geometry::{cart_to_geod, euler_get, Attitude, Geod};
use crate::net::NetworkStats;
use crate::peers::{CrossfeedPeer, RelayPeer};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub net: NetworkStats,
    pub invalid: u64,
    pub blacklisted: u64,
    pub unknown_relay: u64,
    pub relay_magic: u64,
    pub position_data: u64,
    pub pings: u64,
    pub pongs: u64,
    pub unknown_msg_id: u64,
    pub collisions: u64,
    pub not_settled: u64,
    pub local_deliveries: u64,
    pub relay_deliveries: u64,
    pub crossfeed_deliveries: u64,
    pub tracker_events: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub client_id: u32,
    pub callsign: String,
    pub addr: SocketAddr,
    pub origin: String,
    pub is_local: bool,
    pub error: Option<String>,
    pub model: String,
    pub position: DVec3,
    pub geod: Geod,
    pub orientation: Vec3,
    pub attitude: Attitude,
    pub joined: Duration,
    pub last_seen: Duration,
    pub pkts_in: u64,
    pub pkts_out: u64,
    pub pkts_forwarded: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl SessionView {
    pub fn new(session: &Session, now: Instant) -> Self {
        let geod = cart_to_geod(session.position);
        Self {
            client_id: session.client_id,
            callsign: session.callsign.clone(),
            addr: session.addr,
            origin: session.origin.to_string(),
            is_local: session.is_local(),
            error: session.error.clone(),
            model: session.model.clone(),
            position: session.position,
            geod,
            orientation: session.orientation,
            attitude: euler_get(geod.lat, geod.lon, session.orientation),
            joined: now.saturating_duration_since(session.join_time),
            last_seen: now.saturating_duration_since(session.last_seen),
            pkts_in: session.pkts_in,
            pkts_out: session.pkts_out,
            pkts_forwarded: session.pkts_forwarded,
            bytes_in: session.bytes_in,
            bytes_out: session.bytes_out,
        }
    }

    pub fn is_observer(&self) -> bool {
        crate::session::is_observer(&self.callsign)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayView {
    pub name: String,
    pub addr: SocketAddr,
    pub active: bool,
    pub last_seen: Option<Duration>,
    pub pkts_in: u64,
    pub pkts_out: u64,
}

impl RelayView {
    pub fn new(relay: &RelayPeer, now: Instant) -> Self {
        Self {
            name: relay.name.clone(),
            addr: relay.addr,
            active: relay.active,
            last_seen: relay.last_seen.map(|t| now.saturating_duration_since(t)),
            pkts_in: relay.pkts_in,
            pkts_out: relay.pkts_out,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossfeedView {
    pub name: String,
    pub addr: SocketAddr,
    pub pkts_out: u64,
}

impl From<&CrossfeedPeer> for CrossfeedView {
    fn from(peer: &CrossfeedPeer) -> Self {
        Self {
            name: peer.name.clone(),
            addr: peer.addr,
            pkts_out: peer.pkts_out,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistView {
    pub id: u32,
    pub addr: IpAddr,
    pub reason: String,
    pub rejected: u64,
}

impl From<&BlacklistEntry> for BlacklistView {
    fn from(entry: &BlacklistEntry) -> Self {
        Self {
            id: entry.id,
            addr: entry.addr,
            reason: entry.reason.clone(),
            rejected: entry.rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminSnapshot {
    pub uptime: Duration,
    pub hub: bool,
    pub sessions: Vec<SessionView>,
    pub current_clients: usize,
    pub local_clients: usize,
    pub max_clients: usize,
    pub relays: Vec<RelayView>,
    pub crossfeeds: Vec<CrossfeedView>,
    pub blacklist: Vec<BlacklistView>,
    pub stats: EngineStats,
}

impl AdminSnapshot {
    /// Sessions shown in public listings.
    pub fn visible_sessions(&self) -> impl Iterator<Item = &SessionView> {
        self.sessions.iter().filter(|s| !s.is_observer())
    }

    pub fn active_relays(&self) -> usize {
        self.relays.iter().filter(|r| r.active).count()
    }
}
