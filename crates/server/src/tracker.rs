use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use crate::events::ServerEvent;

pub const TRACKER_QUEUE: usize = 1024;
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Lines go out NUL-terminated.
pub fn frame(line: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(line.len() + 1);
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(0);
    bytes
}

/// Strips the terminator and surrounding whitespace from a tracker reply.
pub fn parse_reply(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Owns the TCP link to the tracker and feeds it queued lines in order.
pub struct TrackerLink {
    target: String,
    rx: mpsc::Receiver<String>,
    events: mpsc::UnboundedSender<ServerEvent>,
    retry: Duration,
    pending: Option<String>,
}

impl TrackerLink {
    pub fn new(
        target: String,
        rx: mpsc::Receiver<String>,
        events: mpsc::UnboundedSender<ServerEvent>,
        retry: Duration,
    ) -> Self {
        Self {
            target,
            rx,
            events,
            retry,
            pending: None,
        }
    }

    /// Runs until the sending side of the queue is dropped.
    pub async fn run(mut self) {
        loop {
            let stream = match TcpStream::connect(&self.target).await {
                Ok(stream) => stream,
                Err(e) => {
                    log::debug!("tracker {} unreachable: {}", self.target, e);
                    if self.wait_retry().await {
                        return;
                    }
                    continue;
                }
            };
            if let Ok(addr) = stream.peer_addr() {
                log::info!("tracker connected to {}", addr);
                let _ = self.events.send(ServerEvent::TrackerConnected { addr });
            }

            match self.serve(stream).await {
                Ok(()) => return,
                Err(e) => {
                    log::warn!("tracker link lost: {}", e);
                    let _ = self.events.send(ServerEvent::TrackerLost {
                        reason: e.to_string(),
                    });
                    if self.wait_retry().await {
                        return;
                    }
                }
            }
        }
    }

    /// Sleeps out the back-off. Returns true when the queue closed meanwhile
    /// and there is nothing left to deliver.
    async fn wait_retry(&mut self) -> bool {
        tokio::time::sleep(self.retry).await;
        self.rx.is_closed() && self.rx.is_empty() && self.pending.is_none()
    }

    async fn serve(&mut self, stream: TcpStream) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut inbound = Vec::new();

        if let Some(line) = self.pending.take() {
            self.send_line(&mut writer, line).await?;
        }

        loop {
            tokio::select! {
                line = self.rx.recv() => match line {
                    Some(line) => self.send_line(&mut writer, line).await?,
                    None => return Ok(()),
                },
                read = reader.read_until(0, &mut inbound) => {
                    if read? == 0 {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "tracker closed the connection"));
                    }
                    let reply = parse_reply(&inbound);
                    inbound.clear();
                    if reply == "PING" {
                        writer.write_all(&frame("PONG")).await?;
                    } else if !reply.is_empty() {
                        log::debug!("tracker says {}", reply);
                    }
                }
            }
        }
    }

    async fn send_line(&mut self, writer: &mut OwnedWriteHalf, line: String) -> io::Result<()> {
        if let Err(e) = writer.write_all(&frame(&line)).await {
            self.pending = Some(line);
            return Err(e);
        }
        Ok(())
    }
}
