//! Byte transport underneath a [`Communicator`](super::Communicator).

use crate::core::error::Result;
use crate::core::types::Rank;

/// Ordered, reliable byte frames between the ranks of a fixed group.
///
/// Frames sent from one rank to another arrive in the order they were sent.
/// Frame boundaries carry no meaning to the communicator; it reassembles
/// elements by count. Both calls block and never time out.
pub trait Channel: Send {
    /// Ship one frame to `dst`.
    fn send_bytes(&self, dst: Rank, bytes: &[u8]) -> Result<()>;

    /// Wait for the next frame from `src`.
    fn recv_bytes(&self, src: Rank) -> Result<Vec<u8>>;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn send_bytes(&self, dst: Rank, bytes: &[u8]) -> Result<()> {
        (**self).send_bytes(dst, bytes)
    }

    fn recv_bytes(&self, src: Rank) -> Result<Vec<u8>> {
        (**self).recv_bytes(src)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
