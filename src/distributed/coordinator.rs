//! Coordinator side of the TCP process group
//!
//! The coordinator is rank 0. It:
//! - Connects to every node service, in list order (node `i` becomes rank `i + 1`)
//! - Sends each node its rank and the run configuration
//! - Waits for every node to report READY
//! - Broadcasts the dividend and gathers process results in rank order
//! - Tells every node to abort when the run fails

use crate::config::SearchConfig;
use crate::distributed::collective::{Collective, ROOT_RANK};
use crate::distributed::limbs::{capacity_for_bits, LimbBuffer};
use crate::distributed::protocol::*;
use crate::error::{DivisorError, Result};
use num_bigint::BigUint;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

/// Connection attempts per node before giving up
const CONNECT_ATTEMPTS: u32 = 50;

/// Delay between connection attempts
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Connection to one node
struct NodeLink {
    rank: usize,
    addr: String,
    stream: TcpStream,
}

/// Rank 0 of a TCP process group
pub struct CoordinatorCollective {
    runtime: Runtime,
    nodes: Vec<NodeLink>,
    capacity: usize,
    debug: bool,
    /// Rank whose error ended the run
    failed_rank: Option<usize>,
}

fn new_runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| DivisorError::Transport(format!("Failed to create tokio runtime: {}", e)))
}

/// Connect, retrying while the node service is still starting up
async fn connect_with_retry(addr: &str) -> Result<TcpStream> {
    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
    Err(DivisorError::Transport(format!(
        "Failed to connect to {}: {}",
        addr,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

impl CoordinatorCollective {
    /// Connect to all nodes and bring them into the group
    ///
    /// Returns once every node has answered READY.
    pub fn connect(node_addresses: &[String], config: &SearchConfig) -> Result<Self> {
        if node_addresses.is_empty() {
            return Err(DivisorError::InvalidConfig("No nodes specified for coordinator mode".to_string()));
        }

        let runtime = new_runtime()?;
        let world_size = node_addresses.len() + 1;
        let debug = config.runtime.debug;

        let nodes = runtime.block_on(async {
            println!("Connecting to {} nodes...", node_addresses.len());

            let mut nodes = Vec::with_capacity(node_addresses.len());
            for (i, addr) in node_addresses.iter().enumerate() {
                let rank = i + 1;
                let mut stream = connect_with_retry(addr).await?;
                println!("  ✅ Connected to node {} ({})", rank, addr);

                let join = JoinMessage {
                    protocol_version: PROTOCOL_VERSION,
                    node_id: addr.clone(),
                    rank,
                    world_size,
                    config: config.clone(),
                };
                write_message(&mut stream, &Message::Join(join)).await?;
                if debug {
                    eprintln!("DEBUG: sent JOIN to rank {} ({})", rank, addr);
                }

                nodes.push(NodeLink {
                    rank,
                    addr: addr.clone(),
                    stream,
                });
            }

            println!("Waiting for all nodes to be ready...");
            for node in &mut nodes {
                match read_message(&mut node.stream).await? {
                    Message::Ready(ready) => {
                        check_version(&node.addr, ready.protocol_version)?;
                        if ready.rank != node.rank {
                            return Err(DivisorError::Protocol(format!(
                                "node {} answered as rank {}, expected {}",
                                node.addr, ready.rank, node.rank
                            )));
                        }
                        println!(
                            "  ✅ Node {} ready ({} on {}, {} workers)",
                            node.rank, ready.node_id, node.addr, ready.num_workers
                        );
                    }
                    Message::Error(err) => {
                        return Err(DivisorError::Aborted(format!(
                            "node {} reported error: {}",
                            node.rank, err.error
                        )));
                    }
                    other => {
                        return Err(DivisorError::Protocol(format!(
                            "Expected READY from node {}, got {}",
                            node.rank,
                            other.kind()
                        )));
                    }
                }
            }

            Ok::<_, DivisorError>(nodes)
        })?;

        Ok(Self {
            runtime,
            nodes,
            capacity: capacity_for_bits(config.bits),
            debug,
            failed_rank: None,
        })
    }

    /// Reach every node only to tell it the run is cancelled
    ///
    /// Used when the configuration is rejected before a group could be formed.
    /// Unreachable nodes are skipped.
    pub fn notify_abort(node_addresses: &[String], reason: &str) {
        let runtime = match new_runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Warning: cannot notify nodes of abort: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            for addr in node_addresses {
                let connect = tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(addr)).await;
                match connect {
                    Ok(Ok(mut stream)) => {
                        let abort = Message::Abort(ErrorMessage {
                            node_id: "coordinator".to_string(),
                            error: reason.to_string(),
                        });
                        if let Err(e) = write_message(&mut stream, &abort).await {
                            eprintln!("Warning: failed to send ABORT to {}: {}", addr, e);
                        }
                    }
                    _ => eprintln!("Warning: could not reach {} to abort it", addr),
                }
            }
        });
    }
}

impl Collective for CoordinatorCollective {
    fn rank(&self) -> usize {
        ROOT_RANK
    }

    fn world_size(&self) -> usize {
        self.nodes.len() + 1
    }

    fn broadcast(&mut self, value: Option<&BigUint>) -> Result<BigUint> {
        let value = value.ok_or_else(|| DivisorError::Protocol("root must supply the broadcast value".to_string()))?;
        let buffer = LimbBuffer::export(value, self.capacity)?;
        let debug = self.debug;
        let nodes = &mut self.nodes;

        self.runtime.block_on(async {
            for node in nodes.iter_mut() {
                write_message(&mut node.stream, &Message::Dividend(buffer.clone())).await?;
                if debug {
                    eprintln!("DEBUG: sent DIVIDEND ({} limbs) to rank {}", buffer.used(), node.rank);
                }
            }
            Ok::<_, DivisorError>(())
        })?;

        buffer.import(self.capacity)
    }

    fn gather(&mut self, value: &BigUint) -> Result<Option<Vec<BigUint>>> {
        let capacity = self.capacity;
        let own = LimbBuffer::export(value, capacity)?.import(capacity)?;
        let nodes = &mut self.nodes;
        let failed_rank = &mut self.failed_rank;

        let mut results = Vec::with_capacity(nodes.len() + 1);
        results.push(own);

        self.runtime.block_on(async {
            for node in nodes.iter_mut() {
                match read_message(&mut node.stream).await? {
                    Message::Result(result) => {
                        if result.rank != node.rank {
                            return Err(DivisorError::Protocol(format!(
                                "result from {} claims rank {}, expected {}",
                                node.addr, result.rank, node.rank
                            )));
                        }
                        results.push(result.result.import(capacity)?);
                    }
                    Message::Error(err) => {
                        *failed_rank = Some(node.rank);
                        return Err(DivisorError::Aborted(format!(
                            "node {} reported error: {}",
                            node.rank, err.error
                        )));
                    }
                    other => {
                        return Err(DivisorError::Protocol(format!(
                            "Expected RESULT from node {}, got {}",
                            node.rank,
                            other.kind()
                        )));
                    }
                }
            }

            // Nodes wait for this before exiting successfully
            for node in nodes.iter_mut() {
                write_message(&mut node.stream, &Message::Done).await?;
            }
            Ok::<_, DivisorError>(())
        })?;

        Ok(Some(results))
    }

    fn abort(&mut self, reason: &str) {
        let nodes = &mut self.nodes;
        let failed_rank = self.failed_rank;
        self.runtime.block_on(async {
            for node in nodes.iter_mut().filter(|node| Some(node.rank) != failed_rank) {
                let abort = Message::Abort(ErrorMessage {
                    node_id: "coordinator".to_string(),
                    error: reason.to_string(),
                });
                if let Err(e) = write_message(&mut node.stream, &abort).await {
                    eprintln!("Warning: failed to send ABORT to node {}: {}", node.rank, e);
                }
            }
        });
    }
}
