//! TCP transport: a full mesh of sockets over a static address list.
//!
//! Every rank listens on its own address, connects to every lower rank and
//! accepts a connection from every higher rank. The connecting side opens
//! with its rank as a `u32` little-endian handshake. Afterwards each frame is
//! a `u32` little-endian byte length followed by the payload.

use super::channel::Channel;
use crate::core::constants::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
use crate::core::error::{Result, SpmdError};
use crate::core::types::Rank;
use crate::transport_error;
use log::{debug, info, warn};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

/// How hard to try reaching a peer that is not listening yet.
#[derive(Debug, Clone, Copy)]
pub struct ConnectPolicy {
    pub retries: u32,
    pub delay: Duration,
}

/// Endpoint of one rank in a TCP group.
#[derive(Debug)]
pub struct TcpChannel {
    rank: Rank,
    peers: Vec<Option<TcpStream>>,
}

impl TcpChannel {
    /// Bind `hosts[rank]` and build the mesh.
    pub fn connect(rank: Rank, hosts: &[String], policy: ConnectPolicy) -> Result<Self> {
        let address = hosts.get(rank).ok_or_else(|| {
            SpmdError::invalid_argument("rank", rank, format!("only {} hosts", hosts.len()))
        })?;
        let listener = TcpListener::bind(address.as_str())?;
        Self::connect_with_listener(rank, listener, hosts, policy)
    }

    /// Build the mesh using an already bound listener for this rank.
    pub fn connect_with_listener(
        rank: Rank,
        listener: TcpListener,
        hosts: &[String],
        policy: ConnectPolicy,
    ) -> Result<Self> {
        let size = hosts.len();
        if rank >= size {
            return Err(SpmdError::invalid_argument(
                "rank",
                rank,
                format!("must be below group size {}", size),
            ));
        }
        let mut peers: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();

        for (peer, host) in hosts.iter().enumerate().take(rank) {
            let mut stream = connect_with_retry(host, policy)?;
            stream.set_nodelay(true)?;
            stream.write_all(&(rank as u32).to_le_bytes())?;
            debug!("rank {} connected to rank {} at {}", rank, peer, host);
            peers[peer] = Some(stream);
        }

        for _ in rank + 1..size {
            let (mut stream, from) = listener.accept()?;
            stream.set_nodelay(true)?;
            let mut header = [0u8; 4];
            stream.read_exact(&mut header)?;
            let peer = u32::from_le_bytes(header) as usize;
            if peer <= rank || peer >= size || peers[peer].is_some() {
                return Err(transport_error!(
                    "rank {} got unexpected handshake {} from {}",
                    rank,
                    peer,
                    from
                ));
            }
            debug!("rank {} accepted rank {} from {}", rank, peer, from);
            peers[peer] = Some(stream);
        }

        info!("rank {} joined a tcp group of {}", rank, size);
        Ok(Self { rank, peers })
    }

    fn stream(&self, peer: Rank) -> Result<&TcpStream> {
        self.peers
            .get(peer)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                SpmdError::invalid_argument(
                    "peer",
                    peer,
                    format!("no tcp link from rank {}", self.rank),
                )
            })
    }
}

fn connect_with_retry(host: &str, policy: ConnectPolicy) -> Result<TcpStream> {
    let mut attempt = 0;
    loop {
        let result = host
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "address did not resolve")
                })
            })
            .and_then(TcpStream::connect);
        match result {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                warn!(
                    "connect to {} failed ({}), retry {}/{}",
                    host, e, attempt, policy.retries
                );
                thread::sleep(policy.delay);
            }
            Err(e) => {
                return Err(transport_error!(
                    "cannot reach {} after {} retries: {}",
                    host,
                    policy.retries,
                    e
                ))
            }
        }
    }
}

impl Channel for TcpChannel {
    fn send_bytes(&self, dst: Rank, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(SpmdError::invalid_argument(
                "frame",
                bytes.len(),
                format!("exceeds maximum frame size {}", MAX_FRAME_SIZE),
            ));
        }
        let mut stream = self.stream(dst)?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + bytes.len());
        frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(bytes);
        stream.write_all(&frame)?;
        Ok(())
    }

    fn recv_bytes(&self, src: Rank) -> Result<Vec<u8>> {
        let mut stream = self.stream(src)?;
        let mut header = [0u8; FRAME_HEADER_SIZE];
        stream.read_exact(&mut header)?;
        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(transport_error!(
                "frame of {} bytes from rank {} exceeds limit",
                len,
                src
            ));
        }
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ConnectPolicy {
        ConnectPolicy {
            retries: 20,
            delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_two_rank_mesh_exchanges_frames() {
        let listeners: Vec<TcpListener> = (0..2)
            .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
            .collect();
        let hosts: Vec<String> = listeners
            .iter()
            .map(|l| l.local_addr().unwrap().to_string())
            .collect();

        let channels: Vec<TcpChannel> = thread::scope(|s| {
            let handles: Vec<_> = listeners
                .into_iter()
                .enumerate()
                .map(|(rank, listener)| {
                    let hosts = &hosts;
                    s.spawn(move || {
                        TcpChannel::connect_with_listener(rank, listener, hosts, policy()).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        channels[1].send_bytes(0, &[9, 8, 7]).unwrap();
        channels[0].send_bytes(1, &[]).unwrap();
        assert_eq!(channels[0].recv_bytes(1).unwrap(), vec![9, 8, 7]);
        assert!(channels[1].recv_bytes(0).unwrap().is_empty());
        assert!(channels[0].send_bytes(0, &[1]).is_err());
    }

    #[test]
    fn test_unreachable_host_gives_up() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = listener.local_addr().unwrap().to_string();
        drop(listener);
        let quick = ConnectPolicy {
            retries: 1,
            delay: Duration::from_millis(1),
        };
        let err = connect_with_retry(&dead, quick).unwrap_err();
        assert!(err.is_fatal_to_group());
    }
}
