//! In-process transport: one crossbeam channel per ordered pair of ranks.
//!
//! Used to run a whole group as threads of one process, which is how the
//! collectives are exercised in tests.

use super::channel::Channel;
use crate::core::error::{Result, SpmdError};
use crate::core::types::Rank;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Endpoint of one rank in an in-process group.
#[derive(Debug)]
pub struct LocalChannel {
    rank: Rank,
    outgoing: Vec<Option<Sender<Vec<u8>>>>,
    incoming: Vec<Option<Receiver<Vec<u8>>>>,
}

impl LocalChannel {
    /// Build fully connected endpoints for ranks `0..size`, in rank order.
    pub fn create_group(size: usize) -> Vec<LocalChannel> {
        let mut endpoints: Vec<LocalChannel> = (0..size)
            .map(|rank| LocalChannel {
                rank,
                outgoing: (0..size).map(|_| None).collect(),
                incoming: (0..size).map(|_| None).collect(),
            })
            .collect();

        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = unbounded();
                endpoints[src].outgoing[dst] = Some(tx);
                endpoints[dst].incoming[src] = Some(rx);
            }
        }
        endpoints
    }

    /// Rank this endpoint belongs to.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn peer_error(&self, peer: Rank) -> SpmdError {
        SpmdError::invalid_argument(
            "peer",
            peer,
            format!("no local link from rank {}", self.rank),
        )
    }
}

impl Channel for LocalChannel {
    fn send_bytes(&self, dst: Rank, bytes: &[u8]) -> Result<()> {
        let tx = self
            .outgoing
            .get(dst)
            .and_then(Option::as_ref)
            .ok_or_else(|| self.peer_error(dst))?;
        tx.send(bytes.to_vec()).map_err(|_| {
            SpmdError::transport(format!(
                "rank {} cannot send to rank {}: endpoint dropped",
                self.rank, dst
            ))
        })
    }

    fn recv_bytes(&self, src: Rank) -> Result<Vec<u8>> {
        let rx = self
            .incoming
            .get(src)
            .and_then(Option::as_ref)
            .ok_or_else(|| self.peer_error(src))?;
        rx.recv().map_err(|_| {
            SpmdError::transport(format!(
                "rank {} cannot receive from rank {}: endpoint dropped",
                self.rank, src
            ))
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
