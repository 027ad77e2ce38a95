//! Demonstration packets and an in-process soak run.
//!
//! [`DemoPacket`] models a small game-style protocol with three packet
//! kinds. Packet B carries up to [`MAX_ITEMS`] ranged integers and regularly
//! exceeds a single fragment, so [`run_soak`] exercises both the whole-packet
//! and the fragmented path.

use bytes::Bytes;
use rand::{Rng, seq::SliceRandom};
use thiserror::Error;
use tracing::trace;

use crate::{
    SequenceNumber,
    bitstream::{BitReader, BitWriter, StreamError},
    fragment::{
        ConfigError,
        FragmentationConfig,
        PacketDispatcher,
        ProcessError,
        SplitError,
        Splitter,
    },
    packet::{Packet, PacketCodec, PacketFactory, PacketType, ReadError, WriteError},
};

/// Largest number of items a [`DemoPacket::B`] may carry.
pub const MAX_ITEMS: u16 = 4096;

const ITEM_MIN: i32 = -100;
const ITEM_MAX: i32 = 100;

/// Three-component vector sent as raw `f32` bits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Construct a vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self { Self { x, y, z } }

    fn random<R: Rng>(rng: &mut R, bound: f32) -> Self {
        Self::new(
            rng.gen_range(-bound..=bound),
            rng.gen_range(-bound..=bound),
            rng.gen_range(-bound..=bound),
        )
    }

    fn write(self, writer: &mut BitWriter) -> Result<(), StreamError> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)
    }

    fn read(reader: &mut BitReader<'_>) -> Result<Self, StreamError> {
        Ok(Self::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?))
    }
}

/// Packets of the demonstration protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum DemoPacket {
    /// Three small ranged integers.
    A { a: i32, b: i32, c: i32 },
    /// A variable-length list of ranged integers.
    B { items: Vec<i32> },
    /// A position and a velocity elided when at rest.
    C { position: Vec3, velocity: Vec3 },
}

impl DemoPacket {
    /// Tag of [`DemoPacket::A`].
    pub const TYPE_A: PacketType = PacketType::new(1);
    /// Tag of [`DemoPacket::B`].
    pub const TYPE_B: PacketType = PacketType::new(2);
    /// Tag of [`DemoPacket::C`].
    pub const TYPE_C: PacketType = PacketType::new(3);

    /// Generate a packet of a random kind with random contents.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => Self::A {
                a: rng.gen_range(-10..=10),
                b: rng.gen_range(-20..=20),
                c: rng.gen_range(-30..=30),
            },
            1 => {
                let len = rng.gen_range(0..=usize::from(MAX_ITEMS));
                Self::B {
                    items: (0..len).map(|_| rng.gen_range(ITEM_MIN..=ITEM_MAX)).collect(),
                }
            }
            _ => Self::C {
                position: Vec3::random(rng, 1000.0),
                velocity: if rng.gen_bool(0.5) {
                    Vec3::random(rng, 100.0)
                } else {
                    Vec3::ZERO
                },
            },
        }
    }
}

impl Packet for DemoPacket {
    fn packet_type(&self) -> PacketType {
        match self {
            Self::A { .. } => Self::TYPE_A,
            Self::B { .. } => Self::TYPE_B,
            Self::C { .. } => Self::TYPE_C,
        }
    }

    fn serialize(&self, writer: &mut BitWriter) -> Result<(), StreamError> {
        match self {
            Self::A { a, b, c } => {
                writer.write_ranged(*a, -10, 10)?;
                writer.write_ranged(*b, -20, 20)?;
                writer.write_ranged(*c, -30, 30)
            }
            Self::B { items } => {
                let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
                writer.write_ranged(count, 0, i32::from(MAX_ITEMS))?;
                items
                    .iter()
                    .try_for_each(|item| writer.write_ranged(*item, ITEM_MIN, ITEM_MAX))
            }
            Self::C { position, velocity } => {
                position.write(writer)?;
                let at_rest = *velocity == Vec3::ZERO;
                writer.write_bool(at_rest)?;
                if at_rest {
                    return Ok(());
                }
                velocity.write(writer)
            }
        }
    }

    fn deserialize(&mut self, reader: &mut BitReader<'_>) -> Result<(), StreamError> {
        match self {
            Self::A { a, b, c } => {
                *a = reader.read_ranged(-10, 10)?;
                *b = reader.read_ranged(-20, 20)?;
                *c = reader.read_ranged(-30, 30)?;
            }
            Self::B { items } => {
                let count = reader.read_ranged(0, i32::from(MAX_ITEMS))?;
                *items = (0..count)
                    .map(|_| reader.read_ranged(ITEM_MIN, ITEM_MAX))
                    .collect::<Result<_, _>>()?;
            }
            Self::C { position, velocity } => {
                *position = Vec3::read(reader)?;
                *velocity = if reader.read_bool()? {
                    Vec3::ZERO
                } else {
                    Vec3::read(reader)?
                };
            }
        }
        Ok(())
    }
}

/// Factory for [`DemoPacket`]s; tag `0` remains the fragment tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct DemoPacketFactory;

impl PacketFactory for DemoPacketFactory {
    type Packet = DemoPacket;

    fn num_types(&self) -> u32 { 4 }

    fn create(&self, packet_type: PacketType) -> Option<DemoPacket> {
        match packet_type {
            DemoPacket::TYPE_A => Some(DemoPacket::A { a: 0, b: 0, c: 0 }),
            DemoPacket::TYPE_B => Some(DemoPacket::B { items: Vec::new() }),
            DemoPacket::TYPE_C => Some(DemoPacket::C {
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
            }),
            _ => None,
        }
    }
}

/// Summary of a successful soak run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoakReport {
    /// Packets sent and verified.
    pub iterations: usize,
    /// Packets that travelled as several fragments.
    pub fragmented: usize,
    /// Packets that travelled whole.
    pub whole: usize,
}

/// Failures that abort a soak run.
#[derive(Debug, Error)]
pub enum SoakError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A packet could not be written.
    #[error("iteration {iteration}: failed to write packet: {source}")]
    Write {
        iteration: usize,
        #[source]
        source: WriteError,
    },
    /// A packet could not be split.
    #[error("iteration {iteration}: failed to split packet: {source}")]
    Split {
        iteration: usize,
        #[source]
        source: SplitError,
    },
    /// The dispatcher refused a datagram.
    #[error("iteration {iteration}: datagram rejected: {source}")]
    Dispatch {
        iteration: usize,
        #[source]
        source: ProcessError,
    },
    /// A reassembled packet could not be read.
    #[error("iteration {iteration}: failed to read packet: {source}")]
    Read {
        iteration: usize,
        #[source]
        source: ReadError,
    },
    /// The packet did not come out of the buffer.
    #[error("iteration {iteration}: packet {sequence} was not reassembled")]
    Lost {
        iteration: usize,
        sequence: SequenceNumber,
    },
    /// The packet came out different from what went in.
    #[error("iteration {iteration}: packet {sequence} changed in transit")]
    Mismatch {
        iteration: usize,
        sequence: SequenceNumber,
    },
}

/// Send `iterations` random packets through a splitter and dispatcher.
///
/// Fragments of each packet are fed in shuffled order. Every packet must
/// come back out of the buffer unchanged.
///
/// # Errors
///
/// Returns the first [`SoakError`] encountered.
pub fn run_soak<R: Rng>(
    config: FragmentationConfig,
    iterations: usize,
    rng: &mut R,
) -> Result<SoakReport, SoakError> {
    let factory = DemoPacketFactory;
    let codec = PacketCodec::new(factory, &config)?;
    let splitter = Splitter::new(&config, factory.num_types())?;
    let mut dispatcher = PacketDispatcher::new(config, factory.num_types())?;
    let mut report = SoakReport::default();
    let mut sequence = SequenceNumber::default();

    for iteration in 0..iterations {
        let packet = DemoPacket::random(rng);
        let bytes = codec
            .write(&packet, sequence)
            .map_err(|source| SoakError::Write { iteration, source })?;

        let mut datagrams: Vec<Bytes> = if splitter.needs_split(bytes.len()) {
            report.fragmented += 1;
            splitter
                .split(sequence, &bytes)
                .map_err(|source| SoakError::Split { iteration, source })?
                .into_iter()
                .collect()
        } else {
            report.whole += 1;
            vec![Bytes::from(bytes)]
        };
        datagrams.shuffle(rng);
        trace!(
            "soak iteration: iteration={iteration}, sequence={sequence}, datagrams={}",
            datagrams.len()
        );

        for datagram in &datagrams {
            dispatcher
                .process_packet(datagram)
                .map_err(|source| SoakError::Dispatch { iteration, source })?;
        }

        let message = dispatcher
            .drain_completed()
            .into_iter()
            .find(|message| message.sequence() == sequence)
            .ok_or(SoakError::Lost {
                iteration,
                sequence,
            })?;
        let received = message
            .decode(&codec)
            .map_err(|source| SoakError::Read { iteration, source })?;
        if received != packet {
            return Err(SoakError::Mismatch {
                iteration,
                sequence,
            });
        }

        report.iterations += 1;
        sequence = sequence.next();
    }
    Ok(report)
}
