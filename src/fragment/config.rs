//! Configuration bounding fragment sizes and reassembly resource usage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest window that still keeps every retained sequence unambiguous.
pub const MAX_WINDOW_SIZE: usize = 1 << 15;

/// Fragment counts travel in an 8-bit field.
pub const MAX_FRAGMENT_COUNT_LIMIT: usize = u8::MAX as usize;

/// Protocol identifier mixed into every checksum by default.
pub const DEFAULT_PROTOCOL_ID: u32 = 0x5566_7788;

/// Errors raised when a configuration violates the reassembly invariants.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The window must hold at least one slot.
    #[error("window size must be non-zero")]
    ZeroWindow,
    /// The window must divide the sequence space evenly.
    #[error("window size {0} is not a power of two")]
    WindowNotPowerOfTwo(usize),
    /// The window may not exceed half the sequence space.
    #[error("window size {size} exceeds {max}")]
    WindowTooLarge { size: usize, max: usize },
    /// Fragments must carry at least one byte.
    #[error("maximum fragment size must be non-zero")]
    ZeroFragmentSize,
    /// The per-message fragment count must fit the wire field.
    #[error("maximum fragments per message must be within 1..={max}, got {count}")]
    FragmentCount { count: usize, max: usize },
    /// The global fragment ceiling must admit at least one fragment.
    #[error("maximum buffered fragments must be non-zero")]
    ZeroBufferedFragments,
    /// The tolerance must reach across the whole window.
    #[error("sequence tolerance {tolerance} is below the window size {window}")]
    ToleranceBelowWindow { tolerance: u16, window: usize },
    /// The global ceiling must hold at least one message of maximum size.
    #[error(
        "maximum buffered fragments {buffered} cannot hold a message of {per_message} fragments"
    )]
    CeilingBelowMessage { buffered: usize, per_message: usize },
    /// The header codec needs the fragment tag plus at least one packet type.
    #[error("at least 2 packet types are required, got {0}")]
    PacketTypes(u32),
}

/// Settings that bound fragment sizes and reassembly resource usage.
///
/// Unset fields take their [`Default`] values when deserialized.
///
/// # Examples
///
/// ```
/// use wirefrag::fragment::FragmentationConfig;
/// let config = FragmentationConfig {
///     window_size: 8,
///     max_fragments_per_message: 4,
///     ..FragmentationConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_message_size(), 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentationConfig {
    /// Number of reassembly slots (`W`); a power of two.
    pub window_size: usize,
    /// Maximum payload bytes carried by a single fragment.
    pub max_fragment_size: usize,
    /// Maximum number of fragments one message may be split into.
    pub max_fragments_per_message: usize,
    /// Ceiling on fragments buffered across all in-flight messages.
    pub max_buffered_fragments: usize,
    /// Largest circular distance from the current sequence still admitted.
    pub sequence_tolerance: u16,
    /// Identifier seeding every packet checksum.
    pub protocol_id: u32,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            window_size: 256,
            max_fragment_size: 1024,
            max_fragments_per_message: MAX_FRAGMENT_COUNT_LIMIT,
            max_buffered_fragments: 256,
            sequence_tolerance: 10 * 1024,
            protocol_id: DEFAULT_PROTOCOL_ID,
        }
    }
}

impl FragmentationConfig {
    /// Check every field against the reassembly invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !self.window_size.is_power_of_two() {
            return Err(ConfigError::WindowNotPowerOfTwo(self.window_size));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::WindowTooLarge {
                size: self.window_size,
                max: MAX_WINDOW_SIZE,
            });
        }
        if self.max_fragment_size == 0 {
            return Err(ConfigError::ZeroFragmentSize);
        }
        if self.max_fragments_per_message == 0
            || self.max_fragments_per_message > MAX_FRAGMENT_COUNT_LIMIT
        {
            return Err(ConfigError::FragmentCount {
                count: self.max_fragments_per_message,
                max: MAX_FRAGMENT_COUNT_LIMIT,
            });
        }
        if self.max_buffered_fragments == 0 {
            return Err(ConfigError::ZeroBufferedFragments);
        }
        if self.max_buffered_fragments < self.max_fragments_per_message {
            return Err(ConfigError::CeilingBelowMessage {
                buffered: self.max_buffered_fragments,
                per_message: self.max_fragments_per_message,
            });
        }
        if usize::from(self.sequence_tolerance) < self.window_size {
            return Err(ConfigError::ToleranceBelowWindow {
                tolerance: self.sequence_tolerance,
                window: self.window_size,
            });
        }
        Ok(())
    }

    /// Largest message the splitter can carve into fragments.
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_fragment_size
            .saturating_mul(self.max_fragments_per_message)
    }

    /// Window size as a `u16`, valid once [`validate`](Self::validate) passed.
    pub(crate) fn window_u16(&self) -> u16 {
        u16::try_from(self.window_size).unwrap_or(u16::MAX)
    }
}
