//! Node service for distributed mode
//!
//! A node service is one non-root rank of the process group. It:
//! - Listens for the coordinator's connection
//! - Receives its rank and the run configuration (JOIN)
//! - Answers READY
//! - Receives the dividend, scans its slice, sends its result back
//! - Waits for DONE, or ABORT when the run failed on another rank
//!
//! A service handles exactly one run. An ABORT from the coordinator ends it
//! with an error so the process exits non-zero.

use crate::config::SearchConfig;
use crate::distributed::collective::Collective;
use crate::distributed::limbs::{capacity_for_bits, LimbBuffer};
use crate::distributed::protocol::*;
use crate::error::{DivisorError, Result};
use num_bigint::BigUint;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

/// Node service
///
/// Bound but not yet joined to a group.
pub struct NodeService {
    runtime: Runtime,
    listener: TcpListener,

    /// Node identifier (hostname)
    node_id: String,
}

impl NodeService {
    /// Bind the service to `listen_addr` (e.g. `0.0.0.0:9999`)
    pub fn bind(listen_addr: &str) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| DivisorError::Transport(format!("Failed to create tokio runtime: {}", e)))?;
        let listener = runtime
            .block_on(TcpListener::bind(listen_addr))
            .map_err(|e| DivisorError::Transport(format!("Failed to bind node service on {}: {}", listen_addr, e)))?;

        Ok(Self {
            runtime,
            listener,
            node_id: get_node_id(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Wait for the coordinator and join its group
    ///
    /// Returns the collective for this rank and the configuration the
    /// coordinator sent.
    pub fn accept(self) -> Result<(NodeCollective, SearchConfig)> {
        let NodeService {
            runtime,
            listener,
            node_id,
        } = self;

        let (stream, join) = runtime.block_on(async {
            println!("Waiting for coordinator connection...");
            let (mut stream, peer) = listener.accept().await?;
            stream.set_nodelay(true)?;
            println!("Coordinator connected from: {}", peer);

            let join = match read_message(&mut stream).await? {
                Message::Join(join) => join,
                Message::Abort(abort) => {
                    return Err(DivisorError::Aborted(format!("coordinator aborted: {}", abort.error)));
                }
                other => {
                    return Err(DivisorError::Protocol(format!("Expected JOIN, got {}", other.kind())));
                }
            };

            if let Err(e) = check_join(&join) {
                let reply = Message::Error(ErrorMessage {
                    node_id: node_id.clone(),
                    error: e.to_string(),
                });
                // The coordinator may already be gone; the local error is what matters
                let _ = write_message(&mut stream, &reply).await;
                return Err(e);
            }

            let ready = Message::Ready(ReadyMessage {
                protocol_version: PROTOCOL_VERSION,
                node_id: node_id.clone(),
                rank: join.rank,
                num_workers: join.config.threads,
            });
            write_message(&mut stream, &ready).await?;

            Ok::<_, DivisorError>((stream, join))
        })?;

        println!("Joined as rank {} of {}", join.rank, join.world_size);

        let collective = NodeCollective {
            runtime,
            stream,
            node_id,
            rank: join.rank,
            world_size: join.world_size,
            capacity: capacity_for_bits(join.config.bits),
        };

        Ok((collective, join.config))
    }
}

fn check_join(join: &JoinMessage) -> Result<()> {
    check_version("coordinator", join.protocol_version)?;
    if join.rank == 0 || join.rank >= join.world_size {
        return Err(DivisorError::Protocol(format!(
            "invalid rank {} for group of {}",
            join.rank, join.world_size
        )));
    }
    Ok(())
}

/// Non-root rank of a TCP process group
pub struct NodeCollective {
    runtime: Runtime,
    stream: TcpStream,
    node_id: String,
    rank: usize,
    world_size: usize,
    capacity: usize,
}

impl Collective for NodeCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn broadcast(&mut self, _value: Option<&BigUint>) -> Result<BigUint> {
        let stream = &mut self.stream;
        let buffer = self.runtime.block_on(async {
            match read_message(stream).await? {
                Message::Dividend(buffer) => Ok(buffer),
                Message::Abort(abort) => Err(DivisorError::Aborted(format!("coordinator aborted: {}", abort.error))),
                other => Err(DivisorError::Protocol(format!("Expected DIVIDEND, got {}", other.kind()))),
            }
        })?;

        buffer.import(self.capacity)
    }

    fn gather(&mut self, value: &BigUint) -> Result<Option<Vec<BigUint>>> {
        let result = Message::Result(ResultMessage {
            rank: self.rank,
            result: LimbBuffer::export(value, self.capacity)?,
        });
        let stream = &mut self.stream;
        let sent = self.runtime.block_on(write_message(stream, &result));

        // A pending ABORT explains a failed write better than the write error
        let stream = &mut self.stream;
        self.runtime.block_on(async {
            match read_message(stream).await? {
                Message::Done => Ok(()),
                Message::Abort(abort) => Err(DivisorError::Aborted(format!("coordinator aborted: {}", abort.error))),
                other => Err(DivisorError::Protocol(format!("Expected DONE, got {}", other.kind()))),
            }
        })?;
        sent?;

        Ok(None)
    }

    fn abort(&mut self, reason: &str) {
        let error = Message::Error(ErrorMessage {
            node_id: self.node_id.clone(),
            error: reason.to_string(),
        });
        let stream = &mut self.stream;
        if let Err(e) = self.runtime.block_on(write_message(stream, &error)) {
            eprintln!("Warning: failed to report error to coordinator: {}", e);
        }
    }
}

/// Get node identifier (hostname)
pub fn get_node_id() -> String {
    if let Ok(hostname) = hostname::get() {
        if let Ok(hostname_str) = hostname.into_string() {
            return hostname_str;
        }
    }

    "unknown".to_string()
}
