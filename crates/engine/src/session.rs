use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use glam::{DVec3, Vec3};

use crate::net::{MsgHeader, PositionMsg};

pub const BAD_CLIENT_CALLSIGN: &str = "* Bad Client *";
pub const UNKNOWN_MODEL: &str = "* unknown *";
pub const OBSERVER_PREFIX: &str = "obs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Local,
    /// Relayed by the named peer server.
    Relay(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => f.write_str("LOCAL"),
            Origin::Relay(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub client_id: u32,
    pub callsign: String,
    pub addr: SocketAddr,
    pub origin: Origin,
    pub model: String,
    pub proto_version: u32,
    pub position: DVec3,
    pub orientation: Vec3,
    pub join_time: Instant,
    pub last_seen: Instant,
    pub last_relayed_to_inactive: Option<Instant>,
    pub pkts_in: u64,
    pub pkts_out: u64,
    pub pkts_forwarded: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub error: Option<String>,
}

impl Session {
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    pub fn is_bad(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_observer(&self) -> bool {
        is_observer(&self.callsign)
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }

    pub fn touch(&mut self, now: Instant, bytes: usize) {
        if now > self.last_seen {
            self.last_seen = now;
        }
        self.pkts_in += 1;
        self.bytes_in += bytes as u64;
    }

    pub fn update_pose(&mut self, position: DVec3, orientation: Vec3) {
        self.position = position;
        self.orientation = orientation;
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.pkts_out += 1;
        self.bytes_out += bytes as u64;
    }
}

pub fn is_observer(callsign: &str) -> bool {
    callsign.starts_with(OBSERVER_PREFIX)
}

/// Registry of every participant the server knows about. Lookups are linear;
/// a server rarely carries more than a few hundred sessions.
#[derive(Debug)]
pub struct SessionDirectory {
    sessions: Vec<Session>,
    next_client_id: u32,
    max_sessions: usize,
    ttl: Duration,
}

impl SessionDirectory {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Vec::new(),
            next_client_id: 1,
            max_sessions: 0,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Matches only when callsign and address both agree.
    pub fn find(&self, callsign: &str, addr: SocketAddr) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.addr == addr && s.callsign == callsign)
    }

    pub fn find_mut(&mut self, callsign: &str, addr: SocketAddr) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.addr == addr && s.callsign == callsign)
    }

    pub fn find_by_callsign(&self, callsign: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.callsign == callsign)
    }

    pub fn find_by_addr_mut(&mut self, addr: SocketAddr) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.addr == addr)
    }

    pub fn get(&self, client_id: u32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.client_id == client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.client_id == client_id)
    }

    /// Any non-error session at `ip` that is reached through a relay.
    pub fn remote_at(&self, ip: IpAddr) -> impl Iterator<Item = &Session> {
        self.sessions
            .iter()
            .filter(move |s| s.addr.ip() == ip && !s.is_local() && !s.is_bad())
    }

    pub fn add(
        &mut self,
        addr: SocketAddr,
        header: &MsgHeader,
        position: &PositionMsg,
        origin: Origin,
        now: Instant,
    ) -> &mut Session {
        let model = if position.model.is_empty() {
            UNKNOWN_MODEL.to_string()
        } else {
            position.model.clone()
        };
        let session = Session {
            client_id: self.allocate_id(),
            callsign: header.callsign(),
            addr,
            origin,
            model,
            proto_version: header.version,
            position: position.position,
            orientation: position.orientation,
            join_time: now,
            last_seen: now,
            last_relayed_to_inactive: None,
            pkts_in: 0,
            pkts_out: 0,
            pkts_forwarded: 0,
            bytes_in: 0,
            bytes_out: 0,
            error: None,
        };
        self.insert(session)
    }

    pub fn add_bad(&mut self, addr: SocketAddr, reason: String, now: Instant) -> &mut Session {
        let session = Session {
            client_id: self.allocate_id(),
            callsign: BAD_CLIENT_CALLSIGN.to_string(),
            addr,
            origin: Origin::Local,
            model: UNKNOWN_MODEL.to_string(),
            proto_version: 0,
            position: DVec3::ZERO,
            orientation: Vec3::ZERO,
            join_time: now,
            last_seen: now,
            last_relayed_to_inactive: None,
            pkts_in: 0,
            pkts_out: 0,
            pkts_forwarded: 0,
            bytes_in: 0,
            bytes_out: 0,
            error: Some(reason),
        };
        self.insert(session)
    }

    pub fn remove(&mut self, client_id: u32) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.client_id == client_id)?;
        Some(self.sessions.remove(index))
    }

    pub fn sweep(&mut self, now: Instant) -> Vec<Session> {
        let ttl = self.ttl;
        let (expired, live): (Vec<Session>, Vec<Session>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(|s| s.is_expired(now, ttl));
        self.sessions = live;
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn local_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_local()).count()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        id
    }

    fn insert(&mut self, session: Session) -> &mut Session {
        self.sessions.push(session);
        self.max_sessions = self.max_sessions.max(self.sessions.len());
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{MsgId, POSITION_PACKET_SIZE};

    fn header(callsign: &str) -> MsgHeader {
        MsgHeader::new(MsgId::Position, POSITION_PACKET_SIZE, callsign)
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 10], port))
    }

    #[test]
    fn test_find_requires_callsign_and_addr() {
        let now = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        dir.add(addr(5000), &header("A"), &PositionMsg::default(), Origin::Local, now);

        assert!(dir.find("A", addr(5000)).is_some());
        assert!(dir.find("A", addr(5001)).is_none());
        assert!(dir.find("B", addr(5000)).is_none());
        assert_eq!(dir.find_by_callsign("A").map(|s| s.addr), Some(addr(5000)));
    }

    #[test]
    fn test_client_ids_never_reused() {
        let now = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let a = dir.add(addr(1), &header("A"), &PositionMsg::default(), Origin::Local, now).client_id;
        let b = dir.add(addr(2), &header("B"), &PositionMsg::default(), Origin::Local, now).client_id;
        dir.remove(b);
        let c = dir.add(addr(3), &header("C"), &PositionMsg::default(), Origin::Local, now).client_id;

        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.max_sessions(), 2);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let start = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        dir.add(addr(1), &header("OLD"), &PositionMsg::default(), Origin::Local, start);
        dir.add(addr(2), &header("NEW"), &PositionMsg::default(), Origin::Local, start);
        dir.find_mut("NEW", addr(2))
            .unwrap()
            .touch(start + Duration::from_secs(8), 228);

        assert!(dir.sweep(start + Duration::from_secs(10)).is_empty());
        let expired = dir.sweep(start + Duration::from_secs(11));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].callsign, "OLD");
        assert!(dir.find("NEW", addr(2)).is_some());
    }

    #[test]
    fn test_touch_keeps_last_seen_monotonic() {
        let start = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let session = dir.add(addr(1), &header("A"), &PositionMsg::default(), Origin::Local, start);
        session.touch(start + Duration::from_secs(5), 100);
        session.touch(start + Duration::from_secs(2), 100);

        assert_eq!(session.last_seen, start + Duration::from_secs(5));
        assert_eq!(session.pkts_in, 2);
        assert_eq!(session.bytes_in, 200);
    }

    #[test]
    fn test_bad_client_defaults() {
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let bad = dir.add_bad(addr(9), "packet too small (4 bytes)".into(), Instant::now());

        assert_eq!(bad.callsign, BAD_CLIENT_CALLSIGN);
        assert_eq!(bad.model, UNKNOWN_MODEL);
        assert!(bad.is_bad());
        assert!(bad.is_local());
        assert!(dir.find_by_addr_mut(addr(9)).is_some());
    }

    #[test]
    fn test_remote_sessions_by_relay_ip() {
        let now = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let relay = Origin::Relay("mpserver02".into());
        dir.add(addr(5000), &header("R1"), &PositionMsg::default(), relay.clone(), now);
        dir.add(addr(5001), &header("L1"), &PositionMsg::default(), Origin::Local, now);

        let remote: Vec<_> = dir.remote_at(addr(0).ip()).map(|s| s.callsign.as_str()).collect();
        assert_eq!(remote, vec!["R1"]);
        assert_eq!(dir.local_count(), 1);
        assert_eq!(relay.to_string(), "mpserver02");
        assert_eq!(Origin::Local.to_string(), "LOCAL");
    }

    #[test]
    fn test_observer_prefix() {
        assert!(is_observer("obs01"));
        assert!(!is_observer("ob"));
        assert!(!is_observer("N-obs"));
    }
}
