use std::fmt;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SessionJoined {
        client_id: u32,
        callsign: String,
        origin: String,
        model: String,
    },
    SessionLeft {
        client_id: u32,
        callsign: String,
        origin: String,
        reason: LeaveReason,
    },
    BadClient {
        addr: SocketAddr,
        reason: String,
    },
    RelayActive {
        name: String,
    },
    RelayInactive {
        name: String,
    },
    BlacklistRejected {
        addr: IpAddr,
    },
    BlacklistRemoved {
        addr: IpAddr,
    },
    UnknownRelay {
        addr: IpAddr,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Timeout,
    Error,
}

impl LeaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveReason::Timeout => "timed out",
            LeaveReason::Error => "error session expired",
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::SessionJoined {
                client_id,
                callsign,
                origin,
                model,
            } => write!(f, "#{client_id} {callsign}@{origin} joined ({model})"),
            EngineEvent::SessionLeft {
                client_id,
                callsign,
                origin,
                reason,
            } => write!(f, "#{client_id} {callsign}@{origin} {}", reason.as_str()),
            EngineEvent::BadClient { addr, reason } => write!(f, "bad client {addr}: {reason}"),
            EngineEvent::RelayActive { name } => write!(f, "relay {name} is active"),
            EngineEvent::RelayInactive { name } => write!(f, "relay {name} went quiet"),
            EngineEvent::BlacklistRejected { addr } => write!(f, "rejecting blacklisted {addr}"),
            EngineEvent::BlacklistRemoved { addr } => write!(f, "{addr} removed from blacklist"),
            EngineEvent::UnknownRelay { addr } => write!(f, "{addr} is not a configured relay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lines() {
        let joined = EngineEvent::SessionJoined {
            client_id: 4,
            callsign: "D-EZAB".into(),
            origin: "LOCAL".into(),
            model: "c172p".into(),
        };
        assert_eq!(joined.to_string(), "#4 D-EZAB@LOCAL joined (c172p)");

        let left = EngineEvent::SessionLeft {
            client_id: 4,
            callsign: "D-EZAB".into(),
            origin: "LOCAL".into(),
            reason: LeaveReason::Timeout,
        };
        assert_eq!(left.to_string(), "#4 D-EZAB@LOCAL timed out");
    }
}
