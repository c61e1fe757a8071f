use std::fs;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use fgms::engine::DEFAULT_UPDATE_INACTIVE_PERIOD;
use fgms::{EngineConfig, DEFAULT_PORT};
use thiserror::Error;

pub const DEFAULT_TELNET_PORT: u16 = DEFAULT_PORT + 1;
pub const DEFAULT_TRACKER_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected 'key = value'")]
    Syntax { line: usize },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("could not resolve {host}")]
    Unresolvable { host: String },
    #[error("relay {host} points back to me")]
    PointsToSelf { host: String },
}

/// A host/port pair as written in the config file, resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    pub host: String,
    pub port: u16,
}

impl PeerSpec {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn resolve(&self) -> Result<SocketAddr, ConfigError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.find(SocketAddr::is_ipv4))
            .ok_or_else(|| ConfigError::Unresolvable {
                host: self.host.clone(),
            })
    }

    /// Resolves a relay, refusing loopback targets.
    pub fn resolve_relay(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.resolve()?;
        if addr.ip().is_loopback() {
            return Err(ConfigError::PointsToSelf {
                host: self.host.clone(),
            });
        }
        Ok(addr)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub bind: String,
    pub port: u16,
    pub telnet_port: u16,
    pub out_of_reach_nm: f64,
    pub player_expires: Duration,
    pub relay_ttl: Duration,
    pub hub: bool,
    pub tracker: Option<PeerSpec>,
    pub tracker_interval: Duration,
    pub sweep_interval: Duration,
    pub relays: Vec<PeerSpec>,
    pub crossfeeds: Vec<PeerSpec>,
    pub blacklist: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            name: String::from("fgms"),
            bind: String::from("0.0.0.0"),
            port: DEFAULT_PORT,
            telnet_port: DEFAULT_TELNET_PORT,
            out_of_reach_nm: engine.out_of_reach_nm,
            player_expires: engine.session_ttl,
            relay_ttl: engine.relay_ttl,
            hub: false,
            tracker: None,
            tracker_interval: DEFAULT_TRACKER_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            relays: Vec::new(),
            crossfeeds: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses an fgms.conf style file on top of the defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut tracked = false;
        let mut tracking_server: Option<String> = None;
        let mut tracking_port: Option<u16> = None;
        let mut relay = PendingPeer::default();
        let mut crossfeed = PendingPeer::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or(ConfigError::Syntax { line: index + 1 })?;

            match key {
                "server.name" => config.name = value.to_string(),
                "server.address" => config.bind = value.to_string(),
                "server.port" => config.port = parse_value(key, value)?,
                "server.telnet_port" => config.telnet_port = parse_value(key, value)?,
                "server.out_of_reach" => config.out_of_reach_nm = parse_value(key, value)?,
                "server.playerexpires" => {
                    config.player_expires = Duration::from_secs(parse_value(key, value)?)
                }
                "server.relay_expires" => {
                    config.relay_ttl = Duration::from_secs(parse_value(key, value)?)
                }
                "server.tracked" => tracked = value == "true",
                "server.tracking_server" => tracking_server = Some(value.to_string()),
                "server.tracking_port" => tracking_port = Some(parse_value(key, value)?),
                "server.is_hub" => config.hub = value == "true",
                "relay.host" => relay.host = Some(value.to_string()),
                "relay.port" => relay.port = Some(parse_value(key, value)?),
                "crossfeed.host" => crossfeed.host = Some(value.to_string()),
                "crossfeed.port" => crossfeed.port = Some(parse_value(key, value)?),
                "blacklist" => config.blacklist.push(parse_value(key, value)?),
                _ => log::debug!("ignoring unknown config key {}", key),
            }

            if let Some(peer) = relay.take_complete() {
                config.relays.push(peer);
            }
            if let Some(peer) = crossfeed.take_complete() {
                config.crossfeeds.push(peer);
            }
        }

        if tracked {
            let host = tracking_server.ok_or_else(|| ConfigError::InvalidValue {
                key: "server.tracking_server".into(),
                value: String::new(),
            })?;
            let port = tracking_port.ok_or_else(|| ConfigError::InvalidValue {
                key: "server.tracking_port".into(),
                value: String::new(),
            })?;
            config.tracker = Some(PeerSpec::new(host, port));
        }

        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            out_of_reach_nm: self.out_of_reach_nm,
            session_ttl: self.player_expires,
            relay_ttl: self.relay_ttl,
            update_inactive_period: DEFAULT_UPDATE_INACTIVE_PERIOD,
            hub: self.hub,
            tracked: self.tracker.is_some(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Default)]
struct PendingPeer {
    host: Option<String>,
    port: Option<u16>,
}

impl PendingPeer {
    fn take_complete(&mut self) -> Option<PeerSpec> {
        if self.host.is_some() && self.port.is_some() {
            let host = self.host.take()?;
            let port = self.port.take()?;
            return Some(PeerSpec::new(host, port));
        }
        None
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# fgms sample
server.name = mpserver14
server.address = 0.0.0.0
server.port = 5002
server.telnet_port = 5003
server.out_of_reach = 150
server.playerexpires = 20
server.is_hub = true

relay.host = mpserver01.flightgear.org
relay.port = 5000
relay.host = 192.0.2.7
relay.port = 5001

crossfeed.host = 192.0.2.99
crossfeed.port = 5100

blacklist = 198.51.100.66
";

    #[test]
    fn test_parse_sample() {
        let config = ServerConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.name, "mpserver14");
        assert_eq!(config.port, 5002);
        assert_eq!(config.telnet_port, 5003);
        assert_eq!(config.out_of_reach_nm, 150.0);
        assert_eq!(config.player_expires, Duration::from_secs(20));
        assert!(config.hub);
        assert_eq!(
            config.relays,
            vec![
                PeerSpec::new("mpserver01.flightgear.org", 5000),
                PeerSpec::new("192.0.2.7", 5001),
            ]
        );
        assert_eq!(config.crossfeeds, vec![PeerSpec::new("192.0.2.99", 5100)]);
        assert_eq!(config.blacklist, vec!["198.51.100.66".parse::<IpAddr>().unwrap()]);
        assert!(config.tracker.is_none());
        assert_eq!(config.bind_addr(), "0.0.0.0:5002");
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.telnet_port, DEFAULT_TELNET_PORT);
        assert_eq!(config.out_of_reach_nm, 100.0);
        assert_eq!(config.player_expires, Duration::from_secs(10));
        assert_eq!(config.relay_ttl, Duration::from_secs(60));
        assert!(!config.hub);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ServerConfig::parse("relay.host = a\nrelay.port = lots").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for relay.port: 'lots'");
    }

    #[test]
    fn test_missing_equals_reports_line() {
        let err = ServerConfig::parse("server.name = x\n\nnonsense").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 3 }));
    }

    #[test]
    fn test_tracker_requires_server() {
        let config = ServerConfig::parse(
            "server.tracked = true\nserver.tracking_server = 192.0.2.5\nserver.tracking_port = 8000",
        )
        .unwrap();
        assert_eq!(config.tracker, Some(PeerSpec::new("192.0.2.5", 8000)));
        assert!(config.engine_config().tracked);

        assert!(ServerConfig::parse("server.tracked = true").is_err());
    }

    #[test]
    fn test_relay_to_loopback_refused() {
        let err = PeerSpec::new("127.0.0.1", 5000).resolve_relay().unwrap_err();
        assert!(matches!(err, ConfigError::PointsToSelf { .. }));

        let addr = PeerSpec::new("192.0.2.7", 5001).resolve_relay().unwrap();
        assert_eq!(addr, "192.0.2.7:5001".parse().unwrap());
    }

    #[test]
    fn test_engine_config_carries_limits() {
        let config = ServerConfig::parse(SAMPLE).unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.out_of_reach_nm, 150.0);
        assert_eq!(engine.session_ttl, Duration::from_secs(20));
        assert!(engine.hub);
        assert!(!engine.tracked);
    }
}
