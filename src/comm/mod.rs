//! Fixed process group with point-to-point and collective operations.
//!
//! A [`Communicator`] is built once per process and passed by reference to
//! whatever needs to talk to the group. All operations block the calling
//! thread until the local part of the transfer is done.
//!
//! Each message opens with a frame holding its element count, so a receive
//! into a buffer of the wrong length fails with `DimensionMismatch` and
//! leaves the stream from that peer aligned.
//!
//! Collectives (`broadcast`, `reduce`, `all_reduce`, `barrier`) must be
//! called by every rank, with the same root, in the same order. Nothing
//! checks the order; a mismatch deadlocks the group.

pub mod channel;
pub mod local;
#[cfg(feature = "tcp")]
pub mod tcp;

pub use channel::Channel;
pub use local::LocalChannel;
#[cfg(feature = "tcp")]
pub use tcp::{ConnectPolicy, TcpChannel};

use crate::buf::Buf;
use crate::config::Config;
use crate::core::constants::{MESSAGE_HEADER_SIZE, MIN_WINDOW_CAPACITY};
use crate::core::error::{Result, SpmdError};
use crate::core::types::{Element, Rank};
use crate::core::utils::byte_window::ByteWindow;
use crate::op::Op;
use log::{debug, error, info};

/// One rank's handle on a fixed-size group.
pub struct Communicator {
    rank: Rank,
    size: usize,
    channel: Box<dyn Channel>,
    window: ByteWindow,
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("channel", &self.channel.name())
            .field("window_capacity", &self.window.capacity())
            .finish()
    }
}

/// Parent and children of a rank in the binomial tree rooted at `root`.
///
/// Children are listed from the smallest subtree to the largest.
fn binomial_links(rank: Rank, size: usize, root: Rank) -> (Option<Rank>, Vec<Rank>) {
    let vrank = (rank + size - root) % size;
    let to_rank = |v: usize| (v + root) % size;
    let mut children = Vec::new();
    let mut mask = 1;
    while mask < size {
        if vrank & mask != 0 {
            return (Some(to_rank(vrank ^ mask)), children);
        }
        if vrank + mask < size {
            children.push(to_rank(vrank + mask));
        }
        mask <<= 1;
    }
    (None, children)
}

impl Communicator {
    /// Wrap a connected channel. `window_capacity` bounds every frame sent.
    pub fn new(
        rank: Rank,
        size: usize,
        channel: Box<dyn Channel>,
        window_capacity: usize,
    ) -> Result<Self> {
        if size == 0 {
            return Err(SpmdError::invalid_argument("size", size, "must be at least 1"));
        }
        if rank >= size {
            return Err(SpmdError::invalid_argument(
                "rank",
                rank,
                format!("must be below group size {}", size),
            ));
        }
        if window_capacity < MIN_WINDOW_CAPACITY {
            return Err(SpmdError::invalid_argument(
                "window_capacity",
                window_capacity,
                format!("must be at least {} bytes", MIN_WINDOW_CAPACITY),
            ));
        }
        debug!(
            "rank {}/{} communicator over {} transport, window {} bytes",
            rank,
            size,
            channel.name(),
            window_capacity
        );
        Ok(Self {
            rank,
            size,
            channel,
            window: ByteWindow::new(window_capacity),
        })
    }

    /// A group of one. Every collective returns immediately.
    pub fn single() -> Self {
        let mut group = LocalChannel::create_group(1);
        let channel = group.remove(0);
        Self {
            rank: 0,
            size: 1,
            channel: Box::new(channel),
            window: ByteWindow::new(MIN_WINDOW_CAPACITY),
        }
    }

    /// All ranks of an in-process group, in rank order.
    pub fn local_group(size: usize, window_capacity: usize) -> Result<Vec<Communicator>> {
        if size == 0 {
            return Err(SpmdError::invalid_argument("size", size, "must be at least 1"));
        }
        LocalChannel::create_group(size)
            .into_iter()
            .enumerate()
            .map(|(rank, channel)| Self::new(rank, size, Box::new(channel), window_capacity))
            .collect()
    }

    /// Join the group described by `config`.
    ///
    /// A group of one needs no transport; larger groups connect over TCP
    /// using `config.hosts`, one address per rank.
    pub fn init(config: &Config) -> Result<Self> {
        config.validate()?;
        if config.group_size == 1 {
            info!("running as a single-rank group");
            let mut group = LocalChannel::create_group(1);
            return Self::new(0, 1, Box::new(group.remove(0)), config.window_capacity);
        }
        Self::connect_tcp(config)
    }

    #[cfg(feature = "tcp")]
    fn connect_tcp(config: &Config) -> Result<Self> {
        let policy = ConnectPolicy {
            retries: config.connect_retries,
            delay: std::time::Duration::from_millis(config.connect_retry_delay_ms),
        };
        let channel = TcpChannel::connect(config.rank, &config.hosts, policy)?;
        Self::new(
            config.rank,
            config.group_size,
            Box::new(channel),
            config.window_capacity,
        )
    }

    #[cfg(not(feature = "tcp"))]
    fn connect_tcp(config: &Config) -> Result<Self> {
        Err(SpmdError::config(format!(
            "group size {} needs the tcp feature",
            config.group_size
        )))
    }

    /// This process's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks in the group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes per frame.
    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    fn check_peer(&self, peer: Rank, parameter: &str) -> Result<()> {
        if peer >= self.size {
            return Err(SpmdError::invalid_argument(
                parameter,
                peer,
                format!("must be below group size {}", self.size),
            ));
        }
        if peer == self.rank {
            return Err(SpmdError::invalid_argument(
                parameter,
                peer,
                "cannot exchange with own rank",
            ));
        }
        Ok(())
    }

    fn check_root(&self, root: Rank) -> Result<()> {
        if root >= self.size {
            return Err(SpmdError::invalid_argument(
                "root",
                root,
                format!("must be below group size {}", self.size),
            ));
        }
        Ok(())
    }

    fn fatal(&self, op: &str, peer: Rank, err: SpmdError) -> SpmdError {
        if err.is_fatal_to_group() {
            error!(
                "rank {} {} with rank {} failed: {}",
                self.rank, op, peer, err
            );
        }
        err
    }

    /// Stream every element of `buf` to `dst`.
    pub fn send<T: Element>(&mut self, dst: Rank, buf: &Buf<'_, T>) -> Result<()> {
        self.check_peer(dst, "dst")?;
        self.send_unchecked(dst, buf)
            .map_err(|e| self.fatal("send", dst, e))
    }

    fn send_unchecked<T: Element>(&mut self, dst: Rank, buf: &Buf<'_, T>) -> Result<()> {
        let len = buf.len();
        self.channel.send_bytes(dst, &(len as u64).to_le_bytes())?;
        let mut sent = 0;
        while sent < len {
            self.window.clear();
            let packed = buf.send_items(sent, &mut self.window);
            if packed == 0 {
                return Err(SpmdError::internal(format!(
                    "window of {} bytes cannot hold a {} element",
                    self.window.capacity(),
                    T::KIND
                )));
            }
            self.channel.send_bytes(dst, self.window.written())?;
            sent += packed;
        }
        self.window.clear();
        Ok(())
    }

    /// Fill `buf` with elements streamed from `src`.
    pub fn receive<T: Element>(&mut self, src: Rank, buf: &mut Buf<'_, T>) -> Result<()> {
        self.check_peer(src, "src")?;
        self.receive_unchecked(src, buf)
            .map_err(|e| self.fatal("receive", src, e))
    }

    fn receive_unchecked<T: Element>(&mut self, src: Rank, buf: &mut Buf<'_, T>) -> Result<()> {
        let len = buf.len();
        let announced = self.receive_count(src)?;
        if announced != len {
            let bytes = announced.checked_mul(T::WIDTH).ok_or_else(|| {
                SpmdError::transport(format!("message length from rank {} overflows usize", src))
            })?;
            self.discard(src, bytes)?;
            return Err(SpmdError::dimension_mismatch(
                format!("{} {} elements from rank {}", len, T::KIND, src),
                format!("{} elements", announced),
            ));
        }
        let mut received = 0;
        self.window.clear();
        while received < len {
            if self.window.readable_elements::<T>() == 0 {
                let frame = self.channel.recv_bytes(src)?;
                if frame.is_empty() {
                    return Err(SpmdError::transport(format!(
                        "empty frame from rank {}",
                        src
                    )));
                }
                self.window.load(&frame);
                continue;
            }
            received += buf.receive_items(received, len - received, &mut self.window);
        }
        if !self.window.is_drained() {
            let extra = self.window.readable();
            self.window.clear();
            return Err(SpmdError::dimension_mismatch(
                format!("{} {} elements from rank {}", len, T::KIND, src),
                format!("{} trailing bytes", extra),
            ));
        }
        Ok(())
    }

    fn receive_count(&mut self, src: Rank) -> Result<usize> {
        let header = self.channel.recv_bytes(src)?;
        let bytes: [u8; MESSAGE_HEADER_SIZE] = header.as_slice().try_into().map_err(|_| {
            SpmdError::transport(format!(
                "expected a {}-byte message header from rank {}, got {} bytes",
                MESSAGE_HEADER_SIZE,
                src,
                header.len()
            ))
        })?;
        usize::try_from(u64::from_le_bytes(bytes)).map_err(|_| {
            SpmdError::transport(format!("message length from rank {} overflows usize", src))
        })
    }

    /// Consume the data frames of a message whose length did not match.
    fn discard(&mut self, src: Rank, bytes: usize) -> Result<()> {
        let mut seen = 0;
        while seen < bytes {
            seen += self.channel.recv_bytes(src)?.len();
        }
        if seen != bytes {
            return Err(SpmdError::transport(format!(
                "rank {} sent {} bytes for a {}-byte message",
                src, seen, bytes
            )));
        }
        Ok(())
    }

    /// Copy the root's `buf` into every other rank's `buf`.
    pub fn broadcast<T: Element>(&mut self, root: Rank, buf: &mut Buf<'_, T>) -> Result<()> {
        self.check_root(root)?;
        if self.size == 1 {
            return Ok(());
        }
        debug!(
            "rank {} broadcast root {} of {} {} elements",
            self.rank,
            root,
            buf.len(),
            T::KIND
        );
        let (parent, children) = binomial_links(self.rank, self.size, root);
        if let Some(parent) = parent {
            self.receive(parent, buf)?;
        }
        for &child in children.iter().rev() {
            self.send(child, buf)?;
        }
        Ok(())
    }

    /// Combine every rank's `buf` into the root's `buf` with `op`.
    ///
    /// The root computes `op(local, incoming)` for each contribution; the
    /// final value is the fold of all ranks in rank order relative to the
    /// root, so any associative op gives a deterministic result. Buffers on
    /// other ranks are left unchanged.
    pub fn reduce<T: Element>(&mut self, root: Rank, buf: &mut Buf<'_, T>, op: Op<T>) -> Result<()> {
        self.check_root(root)?;
        if self.size == 1 {
            return Ok(());
        }
        debug!(
            "rank {} reduce root {} of {} {} elements with {}",
            self.rank,
            root,
            buf.len(),
            T::KIND,
            op.name()
        );
        let (parent, children) = binomial_links(self.rank, self.size, root);
        match parent {
            None => {
                let mut acc = std::mem::take(buf).reduction(op);
                let result = children
                    .iter()
                    .try_for_each(|&child| self.receive(child, &mut acc));
                *buf = acc.into_target();
                result
            }
            Some(parent) if children.is_empty() => self.send(parent, buf),
            Some(parent) => {
                let mut scratch = buf.to_vec();
                let mut acc = Buf::flat(&mut scratch).reduction(op);
                for &child in &children {
                    self.receive(child, &mut acc)?;
                }
                self.send(parent, &acc)
            }
        }
    }

    /// Reduce onto rank 0, then broadcast the result to everyone.
    pub fn all_reduce<T: Element>(&mut self, buf: &mut Buf<'_, T>, op: Op<T>) -> Result<()> {
        self.reduce(0, buf, op)?;
        self.broadcast(0, buf)
    }

    /// Return only after every rank has entered the barrier.
    pub fn barrier(&mut self) -> Result<()> {
        let mut token = [0u8; 1];
        let mut buf = Buf::flat(&mut token);
        self.all_reduce(&mut buf, Op::first())
    }
}
