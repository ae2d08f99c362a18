//! Process-group protocol
//!
//! Messages exchanged between the coordinator (rank 0) and the node services
//! (ranks 1..n). Bodies are MessagePack (rmp-serde); big integers travel as
//! [`LimbBuffer`]s.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator (rank 0)            Node (rank k)
//!     |                              |
//!     |-------- JOIN(rank, cfg) ---->|
//!     |<------- READY ---------------|
//!     |                              |
//!     |-------- DIVIDEND(limbs) ---->|   broadcast
//!     |                              |   (scan)
//!     |<------- RESULT(limbs) -------|   gather
//!     |                              |
//!     |-------- DONE --------------->|   every result arrived
//!     |-------- ABORT -------------->|   or: the run failed somewhere
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack message]
//! ```

use crate::config::SearchConfig;
use crate::distributed::limbs::LimbBuffer;
use crate::error::{DivisorError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Coordinator and nodes must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest accepted frame body (1 GiB)
pub const MAX_FRAME_BYTES: usize = 1 << 30;

/// Protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Join message (Coordinator → Node)
    ///
    /// Assigns the node its rank and hands it the run configuration.
    Join(JoinMessage),

    /// Ready message (Node → Coordinator)
    Ready(ReadyMessage),

    /// Broadcast payload (Coordinator → Node)
    Dividend(LimbBuffer),

    /// Gather payload (Node → Coordinator)
    Result(ResultMessage),

    /// Gather completed on every rank (Coordinator → Node)
    Done,

    /// Abort message (Coordinator → Node)
    ///
    /// The run is over; the node exits with a non-zero status.
    Abort(ErrorMessage),

    /// Error message (Node → Coordinator)
    Error(ErrorMessage),
}

impl Message {
    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join(_) => "JOIN",
            Message::Ready(_) => "READY",
            Message::Dividend(_) => "DIVIDEND",
            Message::Result(_) => "RESULT",
            Message::Done => "DONE",
            Message::Abort(_) => "ABORT",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Join message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Address the coordinator used to reach this node
    pub node_id: String,

    /// Rank assigned to the node (1-based; the coordinator is rank 0)
    pub rank: usize,

    /// Total processes in the group, coordinator included
    pub world_size: usize,

    /// Run configuration
    pub config: SearchConfig,
}

/// Ready message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyMessage {
    pub protocol_version: u32,

    /// Node identifier (hostname)
    pub node_id: String,

    pub rank: usize,

    /// Worker threads the node will run
    pub num_workers: usize,
}

/// Result message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    pub rank: usize,

    /// Process result
    pub result: LimbBuffer,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Node identifier
    pub node_id: String,

    /// Error description
    pub error: String,
}

/// Serialize a message to bytes with its length prefix
///
/// ```text
/// [4 bytes: message length (little-endian u32)][N bytes: MessagePack message]
/// ```
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg)
        .map_err(|e| DivisorError::Protocol(format!("Failed to serialize {}: {}", msg.kind(), e)))?;

    if msg_bytes.len() > MAX_FRAME_BYTES {
        return Err(DivisorError::Transport(format!(
            "{} message too large: {} bytes (max {})",
            msg.kind(),
            msg_bytes.len(),
            MAX_FRAME_BYTES
        )));
    }

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Read a complete message from a stream
pub async fn read_message<R>(stream: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await
        .map_err(|e| DivisorError::Transport(format!("Failed to read message length: {}", e)))?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_BYTES {
        return Err(DivisorError::Transport(format!(
            "Message too large: {} bytes (max {})",
            msg_len, MAX_FRAME_BYTES
        )));
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .map_err(|e| DivisorError::Transport(format!("Failed to read message body: {}", e)))?;

    rmp_serde::from_slice(&msg_buf)
        .map_err(|e| DivisorError::Protocol(format!("Failed to deserialize message: {}", e)))
}

/// Write a message to a stream and flush it
pub async fn write_message<W>(stream: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .map_err(|e| DivisorError::Transport(format!("Failed to write {}: {}", msg.kind(), e)))?;
    stream.flush().await
        .map_err(|e| DivisorError::Transport(format!("Failed to flush stream: {}", e)))?;

    Ok(())
}

/// Check a peer's protocol version
pub fn check_version(peer: &str, version: u32) -> Result<()> {
    if version != PROTOCOL_VERSION {
        return Err(DivisorError::Protocol(format!(
            "Protocol version mismatch with {}: expected {}, got {}",
            peer, PROTOCOL_VERSION, version
        )));
    }
    Ok(())
}
