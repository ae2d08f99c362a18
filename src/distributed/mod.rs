//! Distributed mode implementation
//!
//! This module implements the process group a search runs across.
//!
//! # Architecture
//!
//! divsearch distributed mode uses a coordinator-node architecture:
//!
//! - **Coordinator**: Rank 0. Resolves the dividend, broadcasts it, gathers results
//! - **Node Service**: Ranks 1..n. Scans its slice and reports its result
//! - **Workers**: Threads inside every process, each scanning one sub-range
//!
//! # Modules
//!
//! - `limbs`: Fixed-capacity wire form of big integers
//! - `protocol`: Message definitions and framing
//! - `collective`: The broadcast/gather interface plus in-process groups
//! - `node_service`: Node side over TCP
//! - `coordinator`: Coordinator side over TCP

pub mod collective;
pub mod coordinator;
pub mod limbs;
pub mod node_service;
pub mod protocol;

// Re-export key types
pub use collective::{Collective, LocalCollective, MemoryCollective, ROOT_RANK};
pub use coordinator::CoordinatorCollective;
pub use limbs::{capacity_for_bits, LimbBuffer};
pub use node_service::{NodeCollective, NodeService};
pub use protocol::{Message, PROTOCOL_VERSION};
