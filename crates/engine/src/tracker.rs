//! Events for the external usage tracker. The engine only queues them; the
//! server owns the connection that delivers them.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::geometry::{cart_to_geod, euler_get};
use crate::session::Session;

pub const TRACKER_PASSWORD: &str = "test";
/// Placeholder callsign some clients use before the pilot sets one.
pub const UNTRACKED_CALLSIGN: &str = "mpdummy";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerKind {
    Connect,
    Disconnect,
    Position {
        lat: f64,
        lon: f64,
        alt_ft: f64,
        heading: f64,
        pitch: f64,
        roll: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerEvent {
    pub kind: TrackerKind,
    pub callsign: String,
    pub password: String,
    pub aircraft: String,
    pub timestamp: DateTime<Utc>,
}

impl TrackerEvent {
    pub fn connect(session: &Session, timestamp: DateTime<Utc>) -> Self {
        Self::new(TrackerKind::Connect, session, timestamp)
    }

    pub fn disconnect(session: &Session, timestamp: DateTime<Utc>) -> Self {
        Self::new(TrackerKind::Disconnect, session, timestamp)
    }

    pub fn position(session: &Session, timestamp: DateTime<Utc>) -> Self {
        let geod = cart_to_geod(session.position);
        let attitude = euler_get(geod.lat, geod.lon, session.orientation);
        let kind = TrackerKind::Position {
            lat: geod.lat,
            lon: geod.lon,
            alt_ft: geod.alt_ft,
            heading: attitude.heading,
            pitch: attitude.pitch,
            roll: attitude.roll,
        };
        Self::new(kind, session, timestamp)
    }

    fn new(kind: TrackerKind, session: &Session, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            callsign: session.callsign.clone(),
            password: TRACKER_PASSWORD.to_string(),
            aircraft: aircraft_short_name(&session.model).to_string(),
            timestamp,
        }
    }
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.timestamp.format(TIME_FORMAT);
        match self.kind {
            TrackerKind::Connect => write!(
                f,
                "CONNECT {} {} {} {}",
                self.callsign, self.password, self.aircraft, time
            ),
            TrackerKind::Disconnect => write!(
                f,
                "DISCONNECT {} {} {} {}",
                self.callsign, self.password, self.aircraft, time
            ),
            TrackerKind::Position {
                lat,
                lon,
                alt_ft,
                heading,
                pitch,
                roll,
            } => write!(
                f,
                "POSITION {} {} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {}",
                self.callsign, self.password, lat, lon, alt_ft, heading, pitch, roll, time
            ),
        }
    }
}

/// "Aircraft/c172p/Models/c172p.xml" becomes "c172p".
pub fn aircraft_short_name(model: &str) -> &str {
    let base = model.rsplit('/').next().unwrap_or(model);
    base.strip_suffix(".xml").unwrap_or(base)
}

pub fn is_tracked(session: &Session) -> bool {
    session.is_local() && !session.is_bad() && session.callsign != UNTRACKED_CALLSIGN
}

/// Ordered queue of events waiting for the tracker link.
#[derive(Debug, Default)]
pub struct TrackerFeed {
    enabled: bool,
    pending: VecDeque<TrackerEvent>,
}

impl TrackerFeed {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pending: VecDeque::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues the event when tracking is on and the session qualifies.
    pub fn push(&mut self, session: &Session, make: impl FnOnce(&Session) -> TrackerEvent) -> bool {
        if !self.enabled || !is_tracked(session) {
            return false;
        }
        self.pending.push_back(make(session));
        true
    }

    pub fn drain(&mut self) -> Vec<TrackerEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};

    use chrono::TimeZone;

    use super::*;
    use crate::geometry::{geod_to_cart, Geod};
    use crate::net::{MsgHeader, MsgId, PositionMsg, POSITION_PACKET_SIZE};
    use crate::session::{Origin, SessionDirectory};

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn session_with(dir: &mut SessionDirectory, callsign: &str, origin: Origin) -> Session {
        let addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let header = MsgHeader::new(MsgId::Position, POSITION_PACKET_SIZE, callsign);
        let geod = Geod { lat: 52.5, lon: 13.25, alt_ft: 1500.0 };
        let pos = PositionMsg::new(
            "Aircraft/c172p/Models/c172p.xml",
            geod_to_cart(geod),
            glam::Vec3::ZERO,
        );
        dir.add(addr, &header, &pos, origin, Instant::now()).clone()
    }

    #[test]
    fn test_short_names() {
        assert_eq!(aircraft_short_name("Aircraft/c172p/Models/c172p.xml"), "c172p");
        assert_eq!(aircraft_short_name("ufo.xml"), "ufo");
        assert_eq!(aircraft_short_name("Models/glider"), "glider");
        assert_eq!(aircraft_short_name(""), "");
    }

    #[test]
    fn test_connect_line() {
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let session = session_with(&mut dir, "D-EZAB", Origin::Local);
        let line = TrackerEvent::connect(&session, stamp()).to_string();
        assert_eq!(line, "CONNECT D-EZAB test c172p 2024-03-09 14:05:07");
        let line = TrackerEvent::disconnect(&session, stamp()).to_string();
        assert_eq!(line, "DISCONNECT D-EZAB test c172p 2024-03-09 14:05:07");
    }

    #[test]
    fn test_position_line_has_six_decimals() {
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let session = session_with(&mut dir, "D-EZAB", Origin::Local);
        let line = TrackerEvent::position(&session, stamp()).to_string();

        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields[0], "POSITION");
        assert_eq!(fields[3], "52.500000");
        assert_eq!(fields[4], "13.250000");
        let alt: f64 = fields[5].parse().unwrap();
        assert!((alt - 1500.0).abs() < 1e-3);
        assert_eq!(fields[5].split('.').nth(1).map(str::len), Some(6));
        assert_eq!(fields.len(), 11);
        assert!(line.ends_with("2024-03-09 14:05:07"));
    }

    #[test]
    fn test_feed_filters_sessions() {
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let local = session_with(&mut dir, "D-EZAB", Origin::Local);
        let dummy = session_with(&mut dir, UNTRACKED_CALLSIGN, Origin::Local);
        let remote = session_with(&mut dir, "N123", Origin::Relay("peer".into()));
        let mut bad = local.clone();
        bad.error = Some("broken".into());

        let mut feed = TrackerFeed::new(true);
        assert!(feed.push(&local, |s| TrackerEvent::connect(s, stamp())));
        assert!(!feed.push(&dummy, |s| TrackerEvent::connect(s, stamp())));
        assert!(!feed.push(&remote, |s| TrackerEvent::connect(s, stamp())));
        assert!(!feed.push(&bad, |s| TrackerEvent::connect(s, stamp())));
        assert_eq!(feed.drain().len(), 1);
        assert!(feed.is_empty());

        let mut off = TrackerFeed::new(false);
        assert!(!off.push(&local, |s| TrackerEvent::connect(s, stamp())));
    }
}
