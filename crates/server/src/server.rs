use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener, UdpSocket as StdUdpSocket};
use std::sync::Arc;
use std::time::Instant;

use fgms::{Engine, Transport, MAX_PACKET_SIZE};
use thiserror::Error;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::admin::{AdminHandle, AdminRequest};
use crate::config::{ConfigError, ServerConfig};
use crate::events::ServerEvent;
use crate::telnet;
use crate::tracker::{TrackerLink, RECONNECT_DELAY, TRACKER_QUEUE};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create listener socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to bind to {addr}, already in use? ({source})")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("socket is not listening: {0}")]
    NotListening(#[source] io::Error),
    #[error("failed to listen on telnet port {port}: {source}")]
    Telnet {
        port: u16,
        #[source]
        source: io::Error,
    },
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) => 1,
            StartupError::Socket(_) => 2,
            StartupError::Bind { .. } => 3,
            StartupError::NotListening(_) => 4,
            StartupError::Telnet { .. } => 5,
        }
    }
}

/// Engine transport over the shared tokio socket. Sends never wait; a full
/// socket buffer counts as a failed send.
#[derive(Debug, Clone)]
pub struct SocketSender {
    socket: Arc<UdpSocket>,
}

impl Transport for SocketSender {
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.try_send_to(data, addr)
    }
}

pub struct RelayServer {
    engine: Engine<SocketSender>,
    socket: Arc<UdpSocket>,
    config: ServerConfig,
    admin_rx: mpsc::Receiver<AdminRequest>,
    events: mpsc::UnboundedSender<ServerEvent>,
    tracker_tx: Option<mpsc::Sender<String>>,
    tracker_dropped: u64,
}

impl RelayServer {
    /// Binds every socket, registers peers and spawns the telnet and tracker
    /// tasks. Must be called inside a runtime.
    pub async fn start(
        config: ServerConfig,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<(Self, AdminHandle), StartupError> {
        let socket = Arc::new(bind_udp(&config.bind_addr())?);
        let local_addr = socket.local_addr().map_err(StartupError::NotListening)?;

        let mut engine = Engine::new(
            config.engine_config(),
            SocketSender {
                socket: Arc::clone(&socket),
            },
        );
        for peer in &config.relays {
            let addr = peer.resolve_relay()?;
            if engine.add_relay(peer.host.clone(), addr) {
                log::info!("added relay {} ({})", peer.host, addr);
            }
        }
        for peer in &config.crossfeeds {
            let addr = peer.resolve()?;
            if engine.add_crossfeed(peer.host.clone(), addr) {
                log::info!("added crossfeed {} ({})", peer.host, addr);
            }
        }
        for ip in &config.blacklist {
            engine.add_blacklist(*ip, "static config entry");
        }

        let (admin, admin_rx) = AdminHandle::channel();
        let tracker_name = config.tracker.as_ref().map(|t| format!("{}:{}", t.host, t.port));

        if config.telnet_port != 0 {
            let listener = bind_telnet(&config.bind, config.telnet_port)?;
            log::info!("telnet status on port {}", config.telnet_port);
            tokio::spawn(telnet::serve(
                listener,
                admin.clone(),
                config.name.clone(),
                tracker_name.clone(),
                events.clone(),
            ));
        }

        let tracker_tx = tracker_name.map(|target| {
            let (tx, rx) = mpsc::channel(TRACKER_QUEUE);
            log::info!("tracking through {}", target);
            tokio::spawn(TrackerLink::new(target, rx, events.clone(), RECONNECT_DELAY).run());
            tx
        });

        log::info!("{} listening on {}", config.name, local_addr);
        let _ = events.send(ServerEvent::Started { addr: local_addr });

        Ok((
            Self {
                engine,
                socket,
                config,
                admin_rx,
                events,
                tracker_tx,
                tracker_dropped: 0,
            },
            admin,
        ))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves until ctrl-c, an admin shutdown, or every admin handle is gone.
    pub async fn run(mut self) {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let mut sweep = time::interval(self.config.sweep_interval);
        let mut track = time::interval(self.config.tracker_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        track.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let tracking = self.tracker_tx.is_some();
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.engine.handle_packet(&buf[..len], from, Instant::now()),
                    Err(e) => {
                        log::debug!("receive failed: {}", e);
                        let _ = self.events.send(ServerEvent::Error {
                            message: format!("Receive failed: {}", e),
                        });
                    }
                },
                _ = sweep.tick() => self.engine.sweep(Instant::now()),
                _ = track.tick(), if tracking => {
                    self.engine.tracker_tick();
                    self.report_tracker_backlog();
                }
                request = self.admin_rx.recv() => match request {
                    Some(request) => {
                        if !self.handle_admin(request) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut shutdown => break,
            }
            self.flush();
        }

        self.flush();
        log::info!("{} shutting down", self.config.name);
    }

    fn handle_admin(&mut self, request: AdminRequest) -> bool {
        match request {
            AdminRequest::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot(Instant::now()));
            }
            AdminRequest::DeleteBlacklist { selector, reply } => {
                let removed = self.engine.remove_blacklist(selector);
                if removed.is_none() {
                    log::info!("no blacklist entry matches {}", selector);
                }
                let _ = reply.send(removed);
            }
            AdminRequest::Say { target, text } => self.engine.say(target, &text),
            AdminRequest::Shutdown => return false,
        }
        true
    }

    fn flush(&mut self) {
        for event in self.engine.drain_events() {
            let _ = self.events.send(ServerEvent::Engine(event));
        }
        let lines = self.engine.drain_tracker_events();
        let Some(tx) = &self.tracker_tx else {
            return;
        };
        for event in lines {
            if tx.try_send(event.to_string()).is_err() {
                self.tracker_dropped += 1;
            }
        }
    }

    fn report_tracker_backlog(&mut self) {
        if self.tracker_dropped == 0 {
            return;
        }
        log::warn!("tracker queue full, {} events dropped", self.tracker_dropped);
        let _ = self.events.send(ServerEvent::TrackerBacklog {
            dropped: self.tracker_dropped,
        });
        self.tracker_dropped = 0;
    }
}

fn bind_udp(addr: &str) -> Result<UdpSocket, StartupError> {
    let socket = StdUdpSocket::bind(addr).map_err(|source| match source.kind() {
        io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::InvalidInput => StartupError::Bind {
            addr: addr.to_string(),
            source,
        },
        _ => StartupError::Socket(source),
    })?;
    socket
        .set_nonblocking(true)
        .map_err(StartupError::NotListening)?;
    UdpSocket::from_std(socket).map_err(StartupError::NotListening)
}

fn bind_telnet(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    let listener = StdTcpListener::bind((host, port))
        .and_then(|listener| {
            listener.set_nonblocking(true)?;
            Ok(listener)
        })
        .map_err(|source| StartupError::Telnet { port, source })?;
    TcpListener::from_std(listener).map_err(|source| StartupError::Telnet { port, source })
}
