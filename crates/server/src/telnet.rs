use std::io;

use fgms::net::{proto_major, proto_minor};
use fgms::{AdminSnapshot, SessionView, PROTO_VER};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::admin::AdminHandle;
use crate::events::ServerEvent;

/// Banner and pilot list written to every status connection.
pub fn status_report(snapshot: &AdminSnapshot, server_name: &str, tracker: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# This is {}\n", server_name));
    out.push_str(&format!(
        "# FlightGear Multiplayer Server v{}\n",
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(&format!(
        "# using protocol version v{}.{} (LazyRelay enabled)\n",
        proto_major(PROTO_VER),
        proto_minor(PROTO_VER)
    ));
    if let Some(tracker) = tracker {
        out.push_str(&format!("# This server is tracked: {}\n", tracker));
    }
    out.push_str(&format!("# {} pilot(s) online\n", snapshot.current_clients));
    for session in snapshot.visible_sessions() {
        out.push_str(&session_line(session));
        out.push('\n');
    }
    out
}

pub fn session_line(session: &SessionView) -> String {
    let mut line = format!("{}@{}: ", session.callsign, session.origin);
    if let Some(error) = &session.error {
        line.push_str(error);
        line.push(' ');
    }
    line.push_str(&format!(
        "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {}",
        session.position.x,
        session.position.y,
        session.position.z,
        session.geod.lat,
        session.geod.lon,
        session.geod.alt_ft,
        session.orientation.x,
        session.orientation.y,
        session.orientation.z,
        session.model
    ));
    line
}

pub async fn serve(
    listener: TcpListener,
    admin: AdminHandle,
    server_name: String,
    tracker: Option<String>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                log::warn!("telnet accept failed: {}", e);
                continue;
            }
        };
        let admin = admin.clone();
        let server_name = server_name.clone();
        let tracker = tracker.clone();
        let events = events.clone();
        tokio::spawn(async move {
            match write_status(stream, &admin, &server_name, tracker.as_deref()).await {
                Ok(sessions) => {
                    let _ = events.send(ServerEvent::TelnetServed { addr, sessions });
                }
                Err(e) => log::debug!("telnet client {} dropped: {}", addr, e),
            }
        });
    }
}

async fn write_status(
    mut stream: TcpStream,
    admin: &AdminHandle,
    server_name: &str,
    tracker: Option<&str>,
) -> io::Result<usize> {
    let snapshot = admin
        .snapshot()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?;
    let report = status_report(&snapshot, server_name, tracker);
    stream.write_all(report.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(snapshot.current_clients)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use fgms::geometry::geod_to_cart;
    use fgms::net::POSITION_PACKET_SIZE;
    use fgms::{Geod, MsgHeader, MsgId, Origin, PositionMsg, SessionDirectory};
    use glam::Vec3;

    use super::*;

    fn snapshot() -> AdminSnapshot {
        let now = Instant::now();
        let mut dir = SessionDirectory::new(Duration::from_secs(10));
        let pos = geod_to_cart(Geod {
            lat: 47.5,
            lon: 8.5,
            alt_ft: 3000.0,
        });
        for (n, (cs, origin)) in [
            ("HB-ABC", Origin::Local),
            ("obs01", Origin::Local),
            ("N12345", Origin::Relay("mpserver01".into())),
        ]
        .into_iter()
        .enumerate()
        {
            let header = MsgHeader::new(MsgId::Position, POSITION_PACKET_SIZE, cs);
            let msg = PositionMsg::new("Aircraft/c172p/Models/c172p.xml", pos, Vec3::new(0.1, 0.2, 0.3));
            let addr = format!("10.0.0.{}:5000", n + 1).parse().unwrap();
            dir.add(addr, &header, &msg, origin, now);
        }
        let sessions: Vec<SessionView> = dir.iter().map(|s| SessionView::new(s, now)).collect();
        AdminSnapshot {
            uptime: Duration::ZERO,
            hub: false,
            current_clients: sessions.len(),
            local_clients: 2,
            max_clients: 3,
            sessions,
            relays: Vec::new(),
            crossfeeds: Vec::new(),
            blacklist: Vec::new(),
            stats: Default::default(),
        }
    }

    #[test]
    fn test_report_hides_observers() {
        let report = status_report(&snapshot(), "mpserver14", Some("192.0.2.5:8000"));
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "# This is mpserver14");
        assert_eq!(lines[2], "# using protocol version v1.1 (LazyRelay enabled)");
        assert_eq!(lines[3], "# This server is tracked: 192.0.2.5:8000");
        assert_eq!(lines[4], "# 3 pilot(s) online");
        assert_eq!(lines.len(), 7);
        assert!(lines[5].starts_with("HB-ABC@LOCAL: "));
        assert!(lines[6].starts_with("N12345@mpserver01: "));
        assert!(!report.contains("obs01"));
    }

    #[test]
    fn test_session_line_fields() {
        let snap = snapshot();
        let line = session_line(&snap.sessions[0]);
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 11);
        assert_eq!(fields[7], "0.100000");
        assert_eq!(fields[10], "Aircraft/c172p/Models/c172p.xml");
        let lat: f64 = fields[4].parse().unwrap();
        assert!((lat - 47.5).abs() < 1e-4);
    }

    #[test]
    fn test_session_line_with_error() {
        let mut snap = snapshot();
        snap.sessions[0].error = Some("illegal magic number 0x00000001".into());
        let line = session_line(&snap.sessions[0]);
        assert!(line.starts_with("HB-ABC@LOCAL: illegal magic number 0x00000001 "));
    }
}
