use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub id: u32,
    pub addr: IpAddr,
    pub reason: String,
    pub rejected: u64,
}

/// Picks an entry either by address or by the id shown in admin listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlacklistSelector {
    Ip(IpAddr),
    Id(u32),
}

impl FromStr for BlacklistSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(BlacklistSelector::Ip(ip));
        }
        s.parse::<u32>()
            .map(BlacklistSelector::Id)
            .map_err(|_| format!("'{s}' is neither an IP address nor an entry id"))
    }
}

impl fmt::Display for BlacklistSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlacklistSelector::Ip(ip) => write!(f, "{ip}"),
            BlacklistSelector::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// Banned source addresses. The engine only reads membership and bumps the
/// reject counters; entries change through configuration and admin commands.
#[derive(Debug)]
pub struct Blacklist {
    entries: Vec<BlacklistEntry>,
    next_id: u32,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `addr`, returning its entry id. An address already present keeps
    /// its original entry.
    pub fn add(&mut self, addr: IpAddr, reason: impl Into<String>) -> u32 {
        if let Some(entry) = self.entries.iter().find(|e| e.addr == addr) {
            return entry.id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(BlacklistEntry {
            id,
            addr,
            reason: reason.into(),
            rejected: 0,
        });
        id
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.entries.iter().any(|e| e.addr == addr)
    }

    /// Counts a rejected datagram and returns the entry's running total, or
    /// `None` when `addr` is not listed.
    pub fn record_hit(&mut self, addr: IpAddr) -> Option<u64> {
        let entry = self.entries.iter_mut().find(|e| e.addr == addr)?;
        entry.rejected += 1;
        Some(entry.rejected)
    }

    pub fn remove(&mut self, selector: BlacklistSelector) -> Option<BlacklistEntry> {
        let index = self.entries.iter().position(|e| match selector {
            BlacklistSelector::Ip(ip) => e.addr == ip,
            BlacklistSelector::Id(id) => e.id == id,
        })?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlacklistEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_hits_counted_per_entry() {
        let mut list = Blacklist::new();
        list.add(ip("203.0.113.7"), "abuse");

        assert_eq!(list.record_hit(ip("203.0.113.7")), Some(1));
        assert_eq!(list.record_hit(ip("203.0.113.7")), Some(2));
        assert_eq!(list.record_hit(ip("203.0.113.8")), None);
        assert!(list.contains(ip("203.0.113.7")));
    }

    #[test]
    fn test_duplicate_add_keeps_id() {
        let mut list = Blacklist::new();
        let first = list.add(ip("203.0.113.7"), "abuse");
        let again = list.add(ip("203.0.113.7"), "other");
        let second = list.add(ip("2001:db8::1"), "");

        assert_eq!(first, again);
        assert_eq!(second, first + 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove_by_ip_or_id() {
        let mut list = Blacklist::new();
        let a = list.add(ip("198.51.100.1"), "");
        list.add(ip("198.51.100.2"), "");

        assert_eq!(list.remove(BlacklistSelector::Id(a)).map(|e| e.addr), Some(ip("198.51.100.1")));
        assert!(list.remove(BlacklistSelector::Id(a)).is_none());
        assert!(list.remove(BlacklistSelector::Ip(ip("198.51.100.2"))).is_some());
        assert!(list.is_empty());
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("10.0.0.1".parse(), Ok(BlacklistSelector::Ip(ip("10.0.0.1"))));
        assert_eq!(" 42 ".parse(), Ok(BlacklistSelector::Id(42)));
        assert!("host.example".parse::<BlacklistSelector>().is_err());
        assert_eq!(BlacklistSelector::Id(3).to_string(), "#3");
    }
}
