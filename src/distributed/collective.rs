//! Collective operations
//!
//! The search core talks to the process group only through [`Collective`]:
//! one broadcast of the dividend and one gather of process results. Both are
//! blocking barriers. Implementations:
//!
//! - [`LocalCollective`]: a group of one, for standalone runs
//! - [`MemoryCollective`]: an in-memory group of any size over channels
//! - [`crate::distributed::CoordinatorCollective`] / [`crate::distributed::NodeCollective`]: TCP
//!
//! All of them push values through [`LimbBuffer`] so capacity overflow is
//! caught the same way everywhere.

use crate::distributed::limbs::LimbBuffer;
use crate::error::{DivisorError, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use num_bigint::BigUint;

/// Rank of the coordinating process
pub const ROOT_RANK: usize = 0;

/// Blocking collective operations over a fixed process group
pub trait Collective {
    /// This process's rank
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn world_size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT_RANK
    }

    /// Broadcast from the root; every rank returns the same value
    ///
    /// The root passes `Some(value)`, other ranks pass `None`.
    fn broadcast(&mut self, value: Option<&BigUint>) -> Result<BigUint>;

    /// Gather one value per rank to the root, in rank order
    ///
    /// Returns `Some` on the root and `None` elsewhere. A non-root rank
    /// returns only once the root has confirmed every result arrived, and
    /// fails with [`DivisorError::Aborted`] if the root aborted instead.
    fn gather(&mut self, value: &BigUint) -> Result<Option<Vec<BigUint>>>;

    /// Tell the rest of the group the run is over (best effort)
    ///
    /// On the root this reaches every other rank except the one whose abort
    /// caused the failure.
    fn abort(&mut self, reason: &str);
}

/// Export then import, so a single process enforces the same capacity rules as a group
fn through_buffer(value: &BigUint, capacity: usize) -> Result<BigUint> {
    LimbBuffer::export(value, capacity)?.import(capacity)
}

fn root_value(value: Option<&BigUint>) -> Result<&BigUint> {
    value.ok_or_else(|| DivisorError::Protocol("root must supply the broadcast value".to_string()))
}

/// Single-process group
#[derive(Debug, Clone)]
pub struct LocalCollective {
    capacity: usize,
}

impl LocalCollective {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Collective for LocalCollective {
    fn rank(&self) -> usize {
        ROOT_RANK
    }

    fn world_size(&self) -> usize {
        1
    }

    fn broadcast(&mut self, value: Option<&BigUint>) -> Result<BigUint> {
        through_buffer(root_value(value)?, self.capacity)
    }

    fn gather(&mut self, value: &BigUint) -> Result<Option<Vec<BigUint>>> {
        Ok(Some(vec![through_buffer(value, self.capacity)?]))
    }

    fn abort(&mut self, _reason: &str) {}
}

#[derive(Debug)]
enum Packet {
    Value(LimbBuffer),
    /// Root to ranks: every result arrived
    Done,
    Abort(String),
}

/// One rank of an in-memory group created by [`MemoryCollective::group`]
///
/// Each rank is meant to run on its own thread, standing in for a process.
#[derive(Debug)]
pub struct MemoryCollective {
    rank: usize,
    world_size: usize,
    capacity: usize,
    /// Root: one sender per rank (index 0 unused). Others: empty.
    to_ranks: Vec<Sender<(usize, Packet)>>,
    /// Root: gather inbox. Others: broadcast inbox.
    inbox: Receiver<(usize, Packet)>,
    /// Others: sender into the root's gather inbox
    to_root: Option<Sender<(usize, Packet)>>,
    /// Root: rank whose abort ended the run
    failed_rank: Option<usize>,
}

impl MemoryCollective {
    /// Build a connected group of `world_size` ranks
    pub fn group(world_size: usize, capacity: usize) -> Result<Vec<MemoryCollective>> {
        if world_size == 0 {
            return Err(DivisorError::InvalidWorkerCount(world_size));
        }

        let (root_tx, root_rx) = unbounded();
        let mut to_ranks = Vec::with_capacity(world_size);
        let mut members = Vec::with_capacity(world_size);

        // Placeholder keeps `to_ranks` indexable by rank
        let (placeholder, _) = unbounded();
        to_ranks.push(placeholder);

        for rank in 1..world_size {
            let (tx, rx) = unbounded();
            to_ranks.push(tx);

            members.push(MemoryCollective {
                rank,
                world_size,
                capacity,
                to_ranks: Vec::new(),
                inbox: rx,
                to_root: Some(root_tx.clone()),
                failed_rank: None,
            });
        }

        let root = MemoryCollective {
            rank: ROOT_RANK,
            world_size,
            capacity,
            to_ranks,
            inbox: root_rx,
            to_root: None,
            failed_rank: None,
        };
        members.insert(0, root);

        Ok(members)
    }

    fn receive(&mut self) -> Result<(usize, LimbBuffer)> {
        match self.inbox.recv() {
            Ok((from, Packet::Value(buffer))) => Ok((from, buffer)),
            Ok((from, Packet::Abort(reason))) => {
                self.failed_rank = Some(from);
                Err(DivisorError::Aborted(format!("rank {}: {}", from, reason)))
            }
            Ok((from, Packet::Done)) => Err(DivisorError::Protocol(format!("unexpected DONE from rank {}", from))),
            Err(_) => Err(DivisorError::Transport(format!(
                "rank {} lost its peers",
                self.rank
            ))),
        }
    }

    /// Non-root: wait for the root's DONE or ABORT after sending a result
    fn await_verdict(&mut self) -> Result<()> {
        match self.inbox.recv() {
            Ok((_, Packet::Done)) => Ok(()),
            Ok((from, Packet::Abort(reason))) => {
                Err(DivisorError::Aborted(format!("rank {}: {}", from, reason)))
            }
            Ok((from, Packet::Value(_))) => Err(DivisorError::Protocol(format!(
                "unexpected value from rank {} after gather",
                from
            ))),
            Err(_) => Err(DivisorError::Transport(format!(
                "rank {} lost the root before the run completed",
                self.rank
            ))),
        }
    }
}

impl Collective for MemoryCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn broadcast(&mut self, value: Option<&BigUint>) -> Result<BigUint> {
        if self.is_root() {
            let value = root_value(value)?;
            let buffer = LimbBuffer::export(value, self.capacity)?;
            for (rank, tx) in self.to_ranks.iter().enumerate().skip(1) {
                tx.send((ROOT_RANK, Packet::Value(buffer.clone())))
                    .map_err(|_| DivisorError::Transport(format!("rank {} is gone", rank)))?;
            }
            buffer.import(self.capacity)
        } else {
            let (_, buffer) = self.receive()?;
            buffer.import(self.capacity)
        }
    }

    fn gather(&mut self, value: &BigUint) -> Result<Option<Vec<BigUint>>> {
        let buffer = LimbBuffer::export(value, self.capacity)?;

        if !self.is_root() {
            let sent = match self.to_root {
                Some(ref to_root) => to_root.send((self.rank, Packet::Value(buffer))).is_ok(),
                None => false,
            };
            // An abort the root left behind explains a failed send better than the send error
            self.await_verdict()?;
            if !sent {
                return Err(DivisorError::Transport("root is gone".to_string()));
            }
            return Ok(None);
        }

        let mut slots: Vec<Option<BigUint>> = vec![None; self.world_size];
        slots[ROOT_RANK] = Some(buffer.import(self.capacity)?);
        for _ in 1..self.world_size {
            let (from, buffer) = self.receive()?;
            if from >= self.world_size || slots[from].is_some() {
                return Err(DivisorError::Protocol(format!("unexpected result from rank {}", from)));
            }
            slots[from] = Some(buffer.import(self.capacity)?);
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(rank, slot)| {
                slot.ok_or_else(|| DivisorError::Protocol(format!("missing result from rank {}", rank)))
            })
            .collect::<Result<Vec<_>>>()?;

        for (rank, tx) in self.to_ranks.iter().enumerate().skip(1) {
            tx.send((ROOT_RANK, Packet::Done))
                .map_err(|_| DivisorError::Transport(format!("rank {} is gone", rank)))?;
        }

        Ok(Some(results))
    }

    fn abort(&mut self, reason: &str) {
        if let Some(ref to_root) = self.to_root {
            let _ = to_root.send((self.rank, Packet::Abort(reason.to_string())));
        } else {
            for (rank, tx) in self.to_ranks.iter().enumerate().skip(1) {
                if self.failed_rank == Some(rank) {
                    continue;
                }
                let _ = tx.send((ROOT_RANK, Packet::Abort(reason.to_string())));
            }
        }
    }
}
