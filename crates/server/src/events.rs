use std::fmt;
use std::net::SocketAddr;

use fgms::EngineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Started {
        addr: SocketAddr,
    },
    Engine(EngineEvent),
    TelnetServed {
        addr: SocketAddr,
        sessions: usize,
    },
    TrackerConnected {
        addr: SocketAddr,
    },
    TrackerLost {
        reason: String,
    },
    TrackerBacklog {
        dropped: u64,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn severity(&self) -> Severity {
        match self {
            ServerEvent::Engine(
                EngineEvent::BadClient { .. }
                | EngineEvent::UnknownRelay { .. }
                | EngineEvent::BlacklistRejected { .. },
            )
            | ServerEvent::TrackerLost { .. }
            | ServerEvent::TrackerBacklog { .. } => Severity::Warn,
            ServerEvent::Error { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl From<EngineEvent> for ServerEvent {
    fn from(event: EngineEvent) -> Self {
        ServerEvent::Engine(event)
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::Started { addr } => write!(f, "Listening on {}", addr),
            ServerEvent::Engine(event) => write!(f, "{}", event),
            ServerEvent::TelnetServed { addr, sessions } => {
                write!(f, "Telnet status for {} ({} pilots)", addr, sessions)
            }
            ServerEvent::TrackerConnected { addr } => write!(f, "Tracker connected to {}", addr),
            ServerEvent::TrackerLost { reason } => write!(f, "Tracker link lost: {}", reason),
            ServerEvent::TrackerBacklog { dropped } => {
                write!(f, "Tracker queue full, {} events dropped", dropped)
            }
            ServerEvent::Error { message } => write!(f, "{}", message),
        }
    }
}
