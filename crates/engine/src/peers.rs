use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// A peer server exchanging RELAY_MAGIC traffic with this one.
#[derive(Debug, Clone)]
pub struct RelayPeer {
    pub name: String,
    pub addr: SocketAddr,
    pub active: bool,
    pub last_seen: Option<Instant>,
    pub pkts_in: u64,
    pub pkts_out: u64,
}

/// Result of a relay-sourced packet arriving from a configured peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayContact {
    Known,
    BecameActive,
}

#[derive(Debug)]
pub struct RelayTable {
    relays: Vec<RelayPeer>,
    ttl: Duration,
}

impl RelayTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            relays: Vec::new(),
            ttl,
        }
    }

    /// Returns false when a relay with that address is already configured.
    pub fn add(&mut self, name: impl Into<String>, addr: SocketAddr) -> bool {
        if self.relays.iter().any(|r| r.addr == addr) {
            return false;
        }
        self.relays.push(RelayPeer {
            name: name.into(),
            addr,
            active: false,
            last_seen: None,
            pkts_in: 0,
            pkts_out: 0,
        });
        true
    }

    pub fn find_by_ip(&self, ip: IpAddr) -> Option<&RelayPeer> {
        self.relays.iter().find(|r| r.addr.ip() == ip)
    }

    /// Records traffic from `ip`. `None` means no relay is configured there.
    pub fn mark_active(&mut self, ip: IpAddr, now: Instant) -> Option<(RelayContact, &RelayPeer)> {
        let relay = self.relays.iter_mut().find(|r| r.addr.ip() == ip)?;
        relay.last_seen = Some(now);
        relay.pkts_in += 1;
        let contact = if relay.active {
            RelayContact::Known
        } else {
            relay.active = true;
            RelayContact::BecameActive
        };
        Some((contact, &*relay))
    }

    /// Flags relays silent for longer than the TTL as inactive and returns
    /// the names that changed state.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let ttl = self.ttl;
        self.relays
            .iter_mut()
            .filter(|r| r.active)
            .filter(|r| match r.last_seen {
                Some(seen) => now.saturating_duration_since(seen) > ttl,
                None => true,
            })
            .map(|r| {
                r.active = false;
                r.name.clone()
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelayPeer> {
        self.relays.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RelayPeer> {
        self.relays.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }
}

/// One-way mirror destination.
#[derive(Debug, Clone)]
pub struct CrossfeedPeer {
    pub name: String,
    pub addr: SocketAddr,
    pub pkts_out: u64,
}

#[derive(Debug, Default)]
pub struct CrossfeedTable {
    feeds: Vec<CrossfeedPeer>,
}

impl CrossfeedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, addr: SocketAddr) -> bool {
        if self.feeds.iter().any(|f| f.addr == addr) {
            return false;
        }
        self.feeds.push(CrossfeedPeer {
            name: name.into(),
            addr,
            pkts_out: 0,
        });
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrossfeedPeer> {
        self.feeds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CrossfeedPeer> {
        self.feeds.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_addr() -> SocketAddr {
        "10.1.1.1:5000".parse().unwrap()
    }

    #[test]
    fn test_relay_transitions_once() {
        let start = Instant::now();
        let mut table = RelayTable::new(Duration::from_secs(60));
        assert!(table.add("mpserver01", relay_addr()));
        assert!(!table.add("dup", relay_addr()));

        let ip = relay_addr().ip();
        assert_eq!(table.mark_active(ip, start).map(|(c, _)| c), Some(RelayContact::BecameActive));
        assert_eq!(table.mark_active(ip, start).map(|(c, _)| c), Some(RelayContact::Known));
        assert!(table.mark_active("10.9.9.9".parse().unwrap(), start).is_none());
        assert_eq!(table.find_by_ip(ip).map(|r| r.pkts_in), Some(2));
    }

    #[test]
    fn test_relay_matched_by_ip_only() {
        let mut table = RelayTable::new(Duration::from_secs(60));
        table.add("mpserver01", relay_addr());
        assert!(table.mark_active(relay_addr().ip(), Instant::now()).is_some());
        let other_port: SocketAddr = "10.1.1.1:5002".parse().unwrap();
        assert!(table.find_by_ip(other_port.ip()).is_some());
    }

    #[test]
    fn test_relay_sweep_reports_transition() {
        let start = Instant::now();
        let mut table = RelayTable::new(Duration::from_secs(60));
        table.add("mpserver01", relay_addr());
        table.mark_active(relay_addr().ip(), start);

        assert!(table.sweep(start + Duration::from_secs(60)).is_empty());
        assert_eq!(table.sweep(start + Duration::from_secs(61)), vec!["mpserver01".to_string()]);
        assert!(table.sweep(start + Duration::from_secs(120)).is_empty());
        assert!(!table.iter().next().unwrap().active);
    }

    #[test]
    fn test_crossfeed_rejects_duplicates() {
        let mut table = CrossfeedTable::new();
        assert!(table.add("mirror", relay_addr()));
        assert!(!table.add("mirror2", relay_addr()));
        assert_eq!(table.len(), 1);
    }
}
