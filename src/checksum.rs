//! CRC-32 integrity checks for wire packets.
//!
//! Every packet starts with a 32-bit checksum field. The checksum covers the
//! big-endian protocol identifier followed by the whole packet with that
//! field treated as zero, so packets from a different protocol version fail
//! verification just like corrupted ones.

use crc32fast::Hasher;

/// Size of the checksum field at the start of every packet.
pub const CHECKSUM_LEN: usize = 4;

const ZEROED_FIELD: [u8; CHECKSUM_LEN] = [0; CHECKSUM_LEN];

/// Compute the checksum of `packet` under `protocol_id`.
///
/// The first [`CHECKSUM_LEN`] bytes are ignored and hashed as zeros. Packets
/// shorter than the field are hashed as if zero-extended.
#[must_use]
pub fn compute(protocol_id: u32, packet: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&protocol_id.to_be_bytes());
    hasher.update(&ZEROED_FIELD);
    hasher.update(packet.get(CHECKSUM_LEN..).unwrap_or_default());
    hasher.finalize()
}

/// Read the checksum embedded at the start of `packet`.
#[must_use]
pub fn embedded(packet: &[u8]) -> Option<u32> {
    let field: [u8; CHECKSUM_LEN] = packet.get(..CHECKSUM_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(field))
}

/// Compute the checksum of `packet` and write it into its checksum field.
///
/// Returns the written value, or `None` when the packet is too short to hold
/// the field.
pub fn stamp(protocol_id: u32, packet: &mut [u8]) -> Option<u32> {
    let value = compute(protocol_id, packet);
    let field = packet.get_mut(..CHECKSUM_LEN)?;
    field.copy_from_slice(&value.to_be_bytes());
    Some(value)
}

/// Whether the embedded checksum matches the recomputed one.
#[must_use]
pub fn verify(protocol_id: u32, packet: &[u8]) -> bool {
    embedded(packet).is_some_and(|found| found == compute(protocol_id, packet))
}
