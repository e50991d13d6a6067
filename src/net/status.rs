// ─── Server-list ping ───
// DNS SRV indirection followed by the handshake/status exchange over TCP.
// The exchange itself is generic over the stream so the frame-joining
// logic runs against in-memory duplexes in tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hickory_resolver::TokioAsyncResolver;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

use super::packet::{InboundPacket, PacketBuilder};

pub const DEFAULT_PORT: u16 = 25565;

const STATUS_PACKET_ID: u32 = 0x00;
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);
/// Additional reads permitted after the first chunk.
const MAX_EXTRA_READS: usize = 5;

/// Normalized server-list-ping response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    /// Always an object; bare-string descriptions arrive as `{"text": ...}`.
    pub description: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Unix epoch milliseconds at which the response was received.
    pub retrieved_at: u64,
}

/// Ping `hostname:port` and return the normalized status payload.
///
/// An SRV record at `_minecraft._tcp.<hostname>` redirects the dial
/// target when present; lookup failures fall back to the literal input.
pub async fn query_status(protocol: u32, hostname: &str, port: u16) -> CoreResult<ServerStatus> {
    let (target_host, target_port) = resolve_srv(hostname)
        .await
        .unwrap_or_else(|| (hostname.to_string(), port));

    debug!("Pinging {}:{}", target_host, target_port);

    let addr = format!("{}:{}", target_host, target_port);
    let mut addrs = tokio::net::lookup_host(addr.as_str())
        .await
        .map_err(|_| CoreError::NameNotFound(target_host.clone()))?;
    let socket_addr = addrs
        .next()
        .ok_or_else(|| CoreError::NameNotFound(target_host.clone()))?;

    let stream = TcpStream::connect(socket_addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::ConnectionRefused {
            CoreError::ConnectionRefused(addr.clone())
        } else {
            CoreError::io(&addr, e)
        }
    })?;

    let raw = exchange(stream, protocol, &target_host, target_port).await?;
    Ok(normalize(raw))
}

/// First SRV record for `_minecraft._tcp.<hostname>`, if any.
async fn resolve_srv(hostname: &str) -> Option<(String, u16)> {
    let resolver = TokioAsyncResolver::tokio_from_system_conf().ok()?;
    let lookup = resolver
        .srv_lookup(format!("_minecraft._tcp.{}", hostname))
        .await
        .ok()?;
    let record = lookup.iter().next()?;
    let target = record.target().to_utf8();
    Some((target.trim_end_matches('.').to_string(), record.port()))
}

/// Send the handshake + status request and assemble the framed reply.
pub(crate) async fn exchange<S>(
    mut stream: S,
    protocol: u32,
    hostname: &str,
    port: u16,
) -> CoreResult<Value>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Handshake: id 0x00 | protocol | hostname | port | next state = 1
    let mut handshake = PacketBuilder::new();
    handshake
        .put_varint(STATUS_PACKET_ID)
        .put_varint(protocol)
        .put_string(hostname)
        .put_u16(port)
        .put_varint(1);

    // Status request: id 0x00, empty body
    let mut request = PacketBuilder::new();
    request.put_varint(STATUS_PACKET_ID);

    stream.write_all(&handshake.finish()).await?;
    stream.write_all(&request.finish()).await?;
    stream.flush().await?;

    let mut buf = vec![0u8; 4096];
    let n = read_with_timeout(&mut stream, &mut buf).await?;
    let mut packet = InboundPacket::new(&buf[..n])?;

    let mut extra_reads = 0;
    while !packet.is_complete() {
        if extra_reads >= MAX_EXTRA_READS {
            return Err(CoreError::FrameOverflow(MAX_EXTRA_READS));
        }
        let n = read_with_timeout(&mut stream, &mut buf).await?;
        if n == 0 {
            return Err(CoreError::Other(
                "connection closed before the status frame completed".into(),
            ));
        }
        packet.append(&buf[..n])?;
        extra_reads += 1;
    }

    let mut reader = packet.reader()?;
    let id = reader.read_varint()?;
    if id != STATUS_PACKET_ID {
        return Err(CoreError::UnexpectedPacket {
            expected: STATUS_PACKET_ID as u8,
            got: id as u8,
        });
    }

    let body = reader.read_string()?;
    Ok(serde_json::from_str(&body)?)
}

async fn read_with_timeout<S>(stream: &mut S, buf: &mut [u8]) -> CoreResult<usize>
where
    S: AsyncRead + Unpin,
{
    tokio::time::timeout(IDLE_TIMEOUT, stream.read(buf))
        .await
        .map_err(|_| CoreError::Timeout(IDLE_TIMEOUT.as_secs()))?
        .map_err(CoreError::from)
}

/// Wrap bare-string descriptions and stamp the retrieval time.
fn normalize(mut raw: Value) -> ServerStatus {
    if let Some(obj) = raw.as_object_mut() {
        if let Some(desc) = obj.get("description") {
            if desc.is_string() {
                let text = desc.clone();
                obj.insert("description".into(), json!({ "text": text }));
            }
        }
    }

    let retrieved_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    ServerStatus {
        description: raw
            .get("description")
            .cloned()
            .unwrap_or_else(|| json!({ "text": "" })),
        players: raw.get("players").cloned(),
        version: raw.get("version").cloned(),
        favicon: raw
            .get("favicon")
            .and_then(Value::as_str)
            .map(str::to_string),
        retrieved_at,
    }
}
