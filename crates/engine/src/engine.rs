use std::collections::{HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use chrono::Utc;
use glam::DVec3;

use crate::admin::{AdminSnapshot, BlacklistView, CrossfeedView, EngineStats, RelayView, SessionView};
use crate::blacklist::{Blacklist, BlacklistSelector};
use crate::chat::{ChatMessage, ChatQueue, BROADCAST};
use crate::event::{EngineEvent, LeaveReason};
use crate::geometry::distance_nm;
use crate::net::{
    set_magic, set_msg_id, validate, MsgHeader, MsgId, NetworkStats, PositionMsg, RejectReason,
    Transport, HEADER_SIZE, MSG_MAGIC, RELAY_MAGIC,
};
use crate::peers::{CrossfeedTable, RelayContact, RelayTable};
use crate::session::{is_observer, Origin, Session, SessionDirectory};
use crate::tracker::{TrackerEvent, TrackerFeed};

pub const DEFAULT_OUT_OF_REACH_NM: f64 = 100.0;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10);
pub const DEFAULT_RELAY_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_UPDATE_INACTIVE_PERIOD: Duration = Duration::from_secs(1);
pub const MAX_UNKNOWN_RELAYS: usize = 256;
pub const UNKNOWN_RELAY_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub out_of_reach_nm: f64,
    pub session_ttl: Duration,
    pub relay_ttl: Duration,
    /// Minimum gap between a sender's forced sends to relays that would
    /// otherwise not get its packets.
    pub update_inactive_period: Duration,
    pub hub: bool,
    pub tracked: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            out_of_reach_nm: DEFAULT_OUT_OF_REACH_NM,
            session_ttl: DEFAULT_SESSION_TTL,
            relay_ttl: DEFAULT_RELAY_TTL,
            update_inactive_period: DEFAULT_UPDATE_INACTIVE_PERIOD,
            hub: false,
            tracked: false,
        }
    }
}

#[derive(Debug, Default)]
struct LocalPass {
    delivered: u64,
    force_inactive: bool,
    expired: Vec<u32>,
}

/// Owns every registry and decides, per inbound datagram, who gets a copy.
pub struct Engine<T: Transport> {
    config: EngineConfig,
    transport: T,
    sessions: SessionDirectory,
    relays: RelayTable,
    crossfeeds: CrossfeedTable,
    blacklist: Blacklist,
    chat: ChatQueue,
    tracker: TrackerFeed,
    pending_events: VecDeque<EngineEvent>,
    unknown_relays: HashSet<IpAddr>,
    unknown_relays_since: Instant,
    stats: EngineStats,
    started: Instant,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: EngineConfig, transport: T) -> Self {
        Self {
            sessions: SessionDirectory::new(config.session_ttl),
            relays: RelayTable::new(config.relay_ttl),
            crossfeeds: CrossfeedTable::new(),
            blacklist: Blacklist::new(),
            chat: ChatQueue::new(),
            tracker: TrackerFeed::new(config.tracked),
            pending_events: VecDeque::new(),
            unknown_relays: HashSet::new(),
            unknown_relays_since: Instant::now(),
            stats: EngineStats::default(),
            started: Instant::now(),
            config,
            transport,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sessions(&self) -> &SessionDirectory {
        &self.sessions
    }

    pub fn relays(&self) -> &RelayTable {
        &self.relays
    }

    pub fn crossfeeds(&self) -> &CrossfeedTable {
        &self.crossfeeds
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn add_relay(&mut self, name: impl Into<String>, addr: SocketAddr) -> bool {
        self.relays.add(name, addr)
    }

    pub fn add_crossfeed(&mut self, name: impl Into<String>, addr: SocketAddr) -> bool {
        self.crossfeeds.add(name, addr)
    }

    pub fn add_blacklist(&mut self, addr: IpAddr, reason: impl Into<String>) -> u32 {
        self.blacklist.add(addr, reason)
    }

    pub fn handle_packet(&mut self, buf: &[u8], sender: SocketAddr, now: Instant) {
        self.stats.net.record_received(buf.len());

        if let Some(hits) = self.blacklist.record_hit(sender.ip()) {
            self.stats.blacklisted += 1;
            if hits == 1 {
                log::warn!("rejecting packets from blacklisted {}", sender.ip());
                self.pending_events
                    .push_back(EngineEvent::BlacklistRejected { addr: sender.ip() });
            }
            return;
        }

        let accepted = match validate(buf, sender) {
            Ok(accepted) => accepted,
            Err(reason) => {
                self.stats.invalid += 1;
                self.register_bad_client(sender, reason, buf.len(), now);
                return;
            }
        };

        let origin = if accepted.relay_sourced {
            match self.relays.mark_active(sender.ip(), now) {
                Some((contact, relay)) => {
                    self.stats.relay_magic += 1;
                    if contact == RelayContact::BecameActive {
                        log::info!("relay {} is active", relay.name);
                        self.pending_events.push_back(EngineEvent::RelayActive {
                            name: relay.name.clone(),
                        });
                    }
                    Origin::Relay(relay.name.clone())
                }
                None => {
                    self.stats.unknown_relay += 1;
                    if self.unknown_relays.len() < MAX_UNKNOWN_RELAYS
                        && self.unknown_relays.insert(sender.ip())
                    {
                        log::warn!(
                            "{} sends relay traffic but is not a configured relay",
                            sender.ip()
                        );
                        self.pending_events
                            .push_back(EngineEvent::UnknownRelay { addr: sender.ip() });
                    }
                    return;
                }
            }
        } else {
            Origin::Local
        };

        match accepted.msg_id {
            MsgId::Position => self.stats.position_data += 1,
            MsgId::Ping => {
                self.stats.pings += 1;
                let mut reply = buf.to_vec();
                set_msg_id(&mut reply, MsgId::Pong);
                send_datagram(&mut self.transport, &mut self.stats.net, &reply, sender);
                return;
            }
            MsgId::Pong => {
                self.stats.pongs += 1;
                return;
            }
            _ => self.stats.unknown_msg_id += 1,
        }

        let is_position = accepted.msg_id == MsgId::Position;
        let callsign = accepted.header.callsign();
        let pose = is_position.then(|| PositionMsg::decode_pose(&buf[HEADER_SIZE..]));

        let sender_id = match self.sessions.find_mut(&callsign, sender) {
            Some(session) => {
                session.touch(now, buf.len());
                if let Some((position, orientation)) = pose {
                    if !is_settled(position) {
                        self.stats.not_settled += 1;
                        return;
                    }
                    session.update_pose(position, orientation);
                }
                session.client_id
            }
            None => {
                if self.sessions.find_by_callsign(&callsign).is_some() {
                    self.stats.collisions += 1;
                    log::debug!("{callsign}@{sender} collides with an existing session, dropped");
                    return;
                }
                if !is_position {
                    return;
                }
                self.join(sender, &accepted.header, buf, origin, now)
            }
        };

        let Some(sender_pos) = self.sessions.get(sender_id).map(|s| s.position) else {
            return;
        };

        let mut packet = buf.to_vec();
        set_magic(&mut packet, MSG_MAGIC);
        let suppress = is_observer(&callsign) && accepted.msg_id != MsgId::Chat;
        let local = self.distribute_local(&packet, sender_id, sender_pos, suppress, now);

        set_magic(&mut packet, RELAY_MAGIC);
        let relayed = if !accepted.relay_sourced || self.config.hub {
            self.send_to_relays(&packet, sender, sender_pos, local.force_inactive)
        } else {
            0
        };
        let mirrored = self.send_to_crossfeeds(&packet, sender);

        self.stats.local_deliveries += local.delivered;
        self.stats.relay_deliveries += relayed;
        self.stats.crossfeed_deliveries += mirrored;
        if let Some(session) = self.sessions.get_mut(sender_id) {
            session.pkts_forwarded += local.delivered + relayed + mirrored;
        }

        for client_id in local.expired {
            if let Some(session) = self.sessions.remove(client_id) {
                self.on_session_removed(session);
            }
        }
    }

    pub fn sweep(&mut self, now: Instant) {
        for session in self.sessions.sweep(now) {
            self.on_session_removed(session);
        }
        for name in self.relays.sweep(now) {
            log::info!("relay {name} is inactive");
            self.pending_events
                .push_back(EngineEvent::RelayInactive { name });
        }
        // Unknown relays are warned about once per window.
        if now.saturating_duration_since(self.unknown_relays_since) >= UNKNOWN_RELAY_WINDOW {
            self.unknown_relays.clear();
            self.unknown_relays_since = now;
        }
    }

    /// Queues a POSITION tracker event for every tracked session and returns
    /// how many were queued.
    pub fn tracker_tick(&mut self) -> usize {
        let timestamp = Utc::now();
        let mut queued = 0;
        for session in self.sessions.iter() {
            if self
                .tracker
                .push(session, |s| TrackerEvent::position(s, timestamp))
            {
                queued += 1;
            }
        }
        self.stats.tracker_events += queued as u64;
        queued
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.pending_events.drain(..).collect()
    }

    pub fn drain_tracker_events(&mut self) -> Vec<TrackerEvent> {
        self.tracker.drain()
    }

    pub fn snapshot(&self, now: Instant) -> AdminSnapshot {
        AdminSnapshot {
            uptime: now.saturating_duration_since(self.started),
            hub: self.config.hub,
            sessions: self
                .sessions
                .iter()
                .map(|s| SessionView::new(s, now))
                .collect(),
            current_clients: self.sessions.len(),
            local_clients: self.sessions.local_count(),
            max_clients: self.sessions.max_sessions(),
            relays: self.relays.iter().map(|r| RelayView::new(r, now)).collect(),
            crossfeeds: self.crossfeeds.iter().map(CrossfeedView::from).collect(),
            blacklist: self.blacklist.iter().map(BlacklistView::from).collect(),
            stats: self.stats,
        }
    }

    pub fn remove_blacklist(&mut self, selector: BlacklistSelector) -> Option<BlacklistView> {
        let entry = self.blacklist.remove(selector)?;
        log::info!("{} removed from blacklist", entry.addr);
        self.pending_events
            .push_back(EngineEvent::BlacklistRemoved { addr: entry.addr });
        Some(BlacklistView::from(&entry))
    }

    /// Queues a server chat notice for `target`, a client id or [`BROADCAST`].
    pub fn say(&mut self, target: u32, text: &str) {
        self.chat.push(ChatMessage::server_notice(target, text));
    }

    fn join(
        &mut self,
        addr: SocketAddr,
        header: &MsgHeader,
        buf: &[u8],
        origin: Origin,
        now: Instant,
    ) -> u32 {
        let position = PositionMsg::decode(&buf[HEADER_SIZE..]);
        let client_id = {
            let session = self.sessions.add(addr, header, &position, origin, now);
            session.touch(now, buf.len());
            session.client_id
        };
        let Some(session) = self.sessions.get(client_id) else {
            return client_id;
        };

        log::info!(
            "new {} client {}@{} ({}), {} clients",
            if session.is_local() { "local" } else { "remote" },
            session.callsign,
            session.origin,
            session.model,
            self.sessions.len()
        );
        self.pending_events.push_back(EngineEvent::SessionJoined {
            client_id,
            callsign: session.callsign.clone(),
            origin: session.origin.to_string(),
            model: session.model.clone(),
        });
        if self
            .tracker
            .push(session, |s| TrackerEvent::connect(s, Utc::now()))
        {
            self.stats.tracker_events += 1;
        }
        client_id
    }

    fn register_bad_client(
        &mut self,
        addr: SocketAddr,
        reason: RejectReason,
        bytes: usize,
        now: Instant,
    ) {
        if let Some(session) = self.sessions.find_by_addr_mut(addr) {
            session.touch(now, bytes);
            return;
        }
        let reason = reason.to_string();
        log::warn!("bad client {addr}: {reason}");
        self.pending_events.push_back(EngineEvent::BadClient {
            addr,
            reason: reason.clone(),
        });
        self.sessions.add_bad(addr, reason, now).touch(now, bytes);
    }

    fn on_session_removed(&mut self, session: Session) {
        let reason = if session.is_bad() {
            LeaveReason::Error
        } else {
            LeaveReason::Timeout
        };
        log::info!(
            "dropping {}@{} after {}s, {} clients left (max {})",
            session.callsign,
            session.origin,
            session.last_seen.saturating_duration_since(session.join_time).as_secs(),
            self.sessions.len(),
            self.sessions.max_sessions()
        );
        self.pending_events.push_back(EngineEvent::SessionLeft {
            client_id: session.client_id,
            callsign: session.callsign.clone(),
            origin: session.origin.to_string(),
            reason,
        });

        if !session.is_local() || session.is_bad() {
            return;
        }
        if self
            .tracker
            .push(&session, |s| TrackerEvent::disconnect(s, Utc::now()))
        {
            self.stats.tracker_events += 1;
        }
        if !self.sessions.is_empty() {
            self.say(BROADCAST, &format!("{} has left", session.callsign));
        }
    }

    /// One pass over the directory: queued chat, expiry, and the local copy
    /// of the packet for every session that should see it.
    fn distribute_local(
        &mut self,
        packet: &[u8],
        sender_id: u32,
        sender_pos: DVec3,
        suppress: bool,
        now: Instant,
    ) -> LocalPass {
        let chat = self.chat.take();
        let ttl = self.sessions.ttl();
        let out_of_reach = self.config.out_of_reach_nm;
        let period = self.config.update_inactive_period;
        let mut pass = LocalPass::default();

        for session in self.sessions.iter_mut() {
            if session.is_bad() {
                if session.is_expired(now, ttl) {
                    pass.expired.push(session.client_id);
                }
                continue;
            }

            if session.is_local() {
                let client_id = session.client_id;
                for message in chat.iter().filter(|m| m.is_for(client_id)) {
                    if send_datagram(
                        &mut self.transport,
                        &mut self.stats.net,
                        &message.packet,
                        session.addr,
                    ) {
                        session.record_sent(message.packet.len());
                    }
                }
            }

            if session.client_id == sender_id {
                pass.force_inactive = session
                    .last_relayed_to_inactive
                    .is_none_or(|last| now.saturating_duration_since(last) >= period);
                if pass.force_inactive {
                    session.last_relayed_to_inactive = Some(now);
                }
                continue;
            }

            if session.is_expired(now, ttl) {
                pass.expired.push(session.client_id);
                continue;
            }

            if suppress {
                continue;
            }
            if !session.is_observer() && distance_nm(sender_pos, session.position) >= out_of_reach {
                continue;
            }
            if !session.is_local() {
                continue;
            }

            if send_datagram(&mut self.transport, &mut self.stats.net, packet, session.addr) {
                session.record_sent(packet.len());
                pass.delivered += 1;
            }
        }

        pass
    }

    fn send_to_relays(
        &mut self,
        packet: &[u8],
        sender: SocketAddr,
        sender_pos: DVec3,
        force: bool,
    ) -> u64 {
        let out_of_reach = self.config.out_of_reach_nm;
        let hub = self.config.hub;
        let mut sent = 0;

        for relay in self.relays.iter_mut() {
            if relay.addr.ip() == sender.ip() {
                continue;
            }
            let wanted = force
                || hub
                || (relay.active
                    && relay_wants(&self.sessions, relay.addr.ip(), sender_pos, out_of_reach));
            if !wanted {
                continue;
            }
            if send_datagram(&mut self.transport, &mut self.stats.net, packet, relay.addr) {
                relay.pkts_out += 1;
                sent += 1;
            }
        }

        sent
    }

    fn send_to_crossfeeds(&mut self, packet: &[u8], sender: SocketAddr) -> u64 {
        let mut sent = 0;
        for feed in self.crossfeeds.iter_mut() {
            if feed.addr == sender {
                continue;
            }
            if send_datagram(&mut self.transport, &mut self.stats.net, packet, feed.addr) {
                feed.pkts_out += 1;
                sent += 1;
            }
        }
        sent
    }
}

/// Clients report zero coordinates until their position has settled.
fn is_settled(position: DVec3) -> bool {
    position.x != 0.0 && position.y != 0.0 && position.z != 0.0
}

fn relay_wants(sessions: &SessionDirectory, ip: IpAddr, sender_pos: DVec3, out_of_reach: f64) -> bool {
    sessions
        .remote_at(ip)
        .any(|s| s.is_observer() || distance_nm(sender_pos, s.position) < out_of_reach)
}

fn send_datagram<T: Transport>(
    transport: &mut T,
    stats: &mut NetworkStats,
    data: &[u8],
    addr: SocketAddr,
) -> bool {
    match transport.send_to(data, addr) {
        Ok(bytes) => {
            stats.record_sent(bytes);
            true
        }
        Err(e) => {
            stats.record_send_error();
            log::debug!("send to {addr} failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use glam::Vec3;

    use super::*;
    use crate::net::{position_packet, MsgHeader, CHAT_PACKET_SIZE};

    #[derive(Default)]
    struct Recorder {
        sent: Vec<(Vec<u8>, SocketAddr)>,
    }

    impl Transport for Recorder {
        fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
            self.sent.push((data.to_vec(), addr));
            Ok(data.len())
        }
    }

    struct Broken;

    impl Transport for Broken {
        fn send_to(&mut self, _: &[u8], _: SocketAddr) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "unreachable"))
        }
    }

    fn client(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 0, 2, 1], port))
    }

    fn position(callsign: &str, x: f64) -> Vec<u8> {
        let pos = PositionMsg::new("Aircraft/ufo/Models/ufo.xml", DVec3::new(x, 100.0, 100.0), Vec3::ZERO);
        position_packet(MSG_MAGIC, callsign, &pos)
    }

    #[test]
    fn test_ping_echoed_as_pong() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let mut ping = position("A", 1.0);
        set_msg_id(&mut ping, MsgId::Ping);

        engine.handle_packet(&ping, client(1), Instant::now());

        let sent = &engine.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, client(1));
        assert_eq!(MsgHeader::decode(&sent[0].0).id(), MsgId::Pong);
        assert!(engine.sessions().is_empty());
    }

    #[test]
    fn test_bad_client_refreshed_not_duplicated() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let now = Instant::now();
        engine.handle_packet(&[0u8; 10], client(1), now);
        engine.handle_packet(&[0u8; 12], client(1), now + Duration::from_secs(1));

        assert_eq!(engine.sessions().len(), 1);
        let bad = engine.sessions().iter().next().unwrap();
        assert_eq!(bad.error.as_deref(), Some("packet too small (10 bytes)"));
        assert_eq!(bad.pkts_in, 2);
        assert_eq!(engine.stats().invalid, 2);
        assert_eq!(engine.drain_events().len(), 1);
    }

    #[test]
    fn test_unsettled_position_not_forwarded() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let now = Instant::now();
        engine.handle_packet(&position("A", 1000.0), client(1), now);
        engine.handle_packet(&position("B", 1000.0), client(2), now);
        engine.transport_mut().sent.clear();

        engine.handle_packet(&position("A", 0.0), client(1), now);

        assert!(engine.transport().sent.is_empty());
        assert_eq!(engine.stats().not_settled, 1);
        let a = engine.sessions().find("A", client(1)).unwrap();
        assert_eq!(a.pkts_in, 2);
        assert_eq!(a.position.x, 1000.0);
    }

    #[test]
    fn test_non_position_from_unknown_sender_dropped() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let mut chat = vec![0u8; CHAT_PACKET_SIZE];
        MsgHeader::new(MsgId::Chat, CHAT_PACKET_SIZE, "A").encode_into(&mut chat);

        engine.handle_packet(&chat, client(1), Instant::now());

        assert!(engine.sessions().is_empty());
        assert!(engine.transport().sent.is_empty());
    }

    #[test]
    fn test_say_reaches_next_pass() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let now = Instant::now();
        engine.handle_packet(&position("A", 1000.0), client(1), now);
        engine.handle_packet(&position("B", 1000.0), client(2), now);
        let b_id = engine.sessions().find("B", client(2)).unwrap().client_id;
        engine.transport_mut().sent.clear();

        engine.say(b_id, "welcome");
        engine.handle_packet(&position("A", 1000.0), client(1), now);

        let to_b: Vec<_> = engine
            .transport()
            .sent
            .iter()
            .filter(|(_, addr)| *addr == client(2))
            .map(|(data, _)| MsgHeader::decode(data).id())
            .collect();
        assert_eq!(to_b, vec![MsgId::Chat, MsgId::Position]);
        assert!(engine.transport().sent.iter().all(|(_, addr)| *addr != client(1)));
    }

    #[test]
    fn test_send_failures_counted() {
        let mut engine = Engine::new(EngineConfig::default(), Broken);
        let now = Instant::now();
        engine.handle_packet(&position("A", 1000.0), client(1), now);
        engine.handle_packet(&position("B", 1000.0), client(2), now);

        assert_eq!(engine.stats().net.send_errors, 1);
        assert_eq!(engine.stats().local_deliveries, 0);
    }

    #[test]
    fn test_chat_delivered_to_sessions_in_same_pass() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let now = Instant::now();
        engine.handle_packet(&position("A", 1000.0), client(1), now);
        engine.handle_packet(&position("B", 1000.0), client(2), now);
        engine.transport_mut().sent.clear();

        engine.say(BROADCAST, "server restarting");
        engine.handle_packet(&position("B", 1000.0), client(2), now);

        let a = engine.sessions().find("A", client(1)).unwrap();
        let b = engine.sessions().find("B", client(2)).unwrap();
        assert_eq!(a.pkts_out, 3);
        assert_eq!(b.pkts_out, 1);
    }

    #[test]
    fn test_unknown_relays_bounded_and_forgotten() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let start = Instant::now();
        let pos = PositionMsg::new("Aircraft/ufo/Models/ufo.xml", DVec3::new(1000.0, 100.0, 100.0), Vec3::ZERO);
        let packet = position_packet(RELAY_MAGIC, "R", &pos);

        for i in 0..(MAX_UNKNOWN_RELAYS as u32 + 100) {
            let ip = std::net::Ipv4Addr::from(0x0a00_0000 + i);
            engine.handle_packet(&packet, SocketAddr::from((ip, 5000)), start);
        }
        assert_eq!(engine.unknown_relays.len(), MAX_UNKNOWN_RELAYS);
        assert_eq!(engine.stats().unknown_relay, MAX_UNKNOWN_RELAYS as u64 + 100);
        assert_eq!(engine.drain_events().len(), MAX_UNKNOWN_RELAYS);
        assert!(engine.sessions().is_empty());

        engine.sweep(start + UNKNOWN_RELAY_WINDOW / 2);
        assert_eq!(engine.unknown_relays.len(), MAX_UNKNOWN_RELAYS);

        engine.sweep(start + UNKNOWN_RELAY_WINDOW + Duration::from_secs(1));
        assert!(engine.unknown_relays.is_empty());

        engine.handle_packet(&packet, client(1), start + UNKNOWN_RELAY_WINDOW * 2);
        let events = engine.drain_events();
        assert!(matches!(events.as_slice(), [EngineEvent::UnknownRelay { .. }]));
    }

    #[test]
    fn test_remove_blacklist_by_id() {
        let mut engine = Engine::new(EngineConfig::default(), Recorder::default());
        let id = engine.add_blacklist(client(1).ip(), "abuse");

        let removed = engine.remove_blacklist(BlacklistSelector::Id(id)).unwrap();
        assert_eq!(removed.addr, client(1).ip());
        assert!(engine.blacklist().is_empty());
        assert!(engine.remove_blacklist(BlacklistSelector::Id(id)).is_none());

        engine.handle_packet(&position("A", 1000.0), client(1), Instant::now());
        assert_eq!(engine.sessions().len(), 1);
    }
}
