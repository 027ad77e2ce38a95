//! Async UDP endpoint that fragments outbound packets and reassembles
//! inbound ones.
//!
//! A [`FragmentSocket`] owns one socket, one splitter and one reassembly
//! buffer. Datagrams from every peer feed the same buffer; peers are not
//! distinguished.

use std::{io, net::SocketAddr};

use bytes::Bytes;
use thiserror::Error;
use tokio::{
    net::{ToSocketAddrs, UdpSocket},
    select,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    SequenceNumber,
    fragment::{ConfigError, FragmentationConfig, PacketDispatcher, SplitError, Splitter},
    metrics,
    packet::{PacketCodec, PacketFactory, WriteError},
};

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Errors surfaced by [`FragmentSocket`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket failed.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// An outbound packet could not be written.
    #[error("failed to write packet: {0}")]
    Write(#[from] WriteError),
    /// An outbound packet could not be split.
    #[error("failed to split packet: {0}")]
    Split(#[from] SplitError),
}

/// Datagram endpoint with transparent fragmentation.
#[derive(Debug)]
pub struct FragmentSocket<F: PacketFactory> {
    socket: UdpSocket,
    codec: PacketCodec<F>,
    splitter: Splitter,
    dispatcher: PacketDispatcher,
    next_sequence: SequenceNumber,
    recv_buffer: Vec<u8>,
}

impl<F: PacketFactory> FragmentSocket<F> {
    /// Bind a socket to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] for an invalid configuration and
    /// [`TransportError::Io`] if binding fails.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        config: FragmentationConfig,
        factory: F,
    ) -> Result<Self, TransportError> {
        let num_types = factory.num_types();
        let codec = PacketCodec::new(factory, &config)?;
        let splitter = Splitter::new(&config, num_types)?;
        let dispatcher = PacketDispatcher::new(config, num_types)?;
        let socket = UdpSocket::bind(addr).await?;
        debug!("fragment socket bound: local_addr={:?}", socket.local_addr().ok());
        Ok(Self {
            socket,
            codec,
            splitter,
            dispatcher,
            next_sequence: SequenceNumber::default(),
            recv_buffer: vec![0; MAX_DATAGRAM_SIZE],
        })
    }

    /// Address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns any error reported by the operating system.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket.local_addr() }

    /// Sequence the next outbound packet will carry.
    #[must_use]
    pub const fn next_sequence(&self) -> SequenceNumber { self.next_sequence }

    /// Borrow the inbound dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &PacketDispatcher { &self.dispatcher }

    /// Write `packet`, split it if needed, and send every datagram to
    /// `target`.
    ///
    /// Returns the number of datagrams sent. The sequence advances only once
    /// the packet has been written and split successfully.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Write`] or [`TransportError::Split`] when
    /// the packet cannot be encoded and [`TransportError::Io`] when sending
    /// fails.
    pub async fn send_to(
        &mut self,
        packet: &F::Packet,
        target: SocketAddr,
    ) -> Result<usize, TransportError> {
        let sequence = self.next_sequence;
        let bytes = self.codec.write(packet, sequence)?;
        let datagrams: Vec<Bytes> = if self.splitter.needs_split(bytes.len()) {
            self.splitter.split(sequence, &bytes)?.into_iter().collect()
        } else {
            vec![Bytes::from(bytes)]
        };
        self.next_sequence = sequence.next();

        for datagram in &datagrams {
            self.socket.send_to(datagram, target).await?;
        }
        debug!(
            "packet sent: sequence={sequence}, datagrams={}, target={target}",
            datagrams.len()
        );
        Ok(datagrams.len())
    }

    /// Receive one datagram and return every packet it completed.
    ///
    /// Rejected datagrams and undecodable packets are logged and counted,
    /// then skipped, so the result is often empty.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when receiving fails.
    pub async fn recv(&mut self) -> Result<Vec<(SequenceNumber, F::Packet)>, TransportError> {
        let (len, peer) = self.socket.recv_from(&mut self.recv_buffer).await?;
        let datagram = &self.recv_buffer[..len];
        if let Err(err) = self.dispatcher.process_packet(datagram) {
            debug!("datagram dropped: peer={peer}, len={len}, error={err}");
            return Ok(Vec::new());
        }

        let mut packets = Vec::new();
        for message in self.dispatcher.drain_completed() {
            match self.codec.read(message.payload()) {
                Ok(packet) => packets.push(packet),
                Err(err) => {
                    debug!(
                        "reassembled packet dropped: sequence={}, error={err}",
                        message.sequence()
                    );
                    metrics::inc_rejected("undecodable_packet");
                }
            }
        }
        Ok(packets)
    }

    /// Forward received packets into `sink` until `shutdown` is cancelled or
    /// the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when receiving fails.
    pub async fn run(
        mut self,
        sink: mpsc::Sender<(SequenceNumber, F::Packet)>,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let packets = select! {
                () = shutdown.cancelled() => break,
                received = self.recv() => received?,
            };
            for packet in packets {
                if sink.send(packet).await.is_err() {
                    warn!("packet sink closed; stopping receive loop");
                    return Ok(());
                }
            }
        }
        debug!("receive loop cancelled");
        Ok(())
    }
}
