//! # Action Payload Codec
//!
//! Binary form of a player's combat input as it arrives from the network
//! layer. Everything is little-endian; vectors are copied as `Pod`.
//!
//! ```text
//! ┌──────────┬───────────────────────────────────────────────┐
//! │ tag: u32 │ fields in declaration order                   │
//! ├──────────┼───────────────────────────────────────────────┤
//! │ 0 Attack │ attack_type u32, weapon_type u32, target Vec4 │
//! │ 1 Defense│ defense_type u32, incoming_attack_id u32      │
//! │ 2 Sign   │ sign_type u32, target Vec4                    │
//! │ 3 Anim   │ animation_type u32, is_attack u8              │
//! │ 4 Move   │ position Vec4, velocity Vec4                  │
//! └──────────┴───────────────────────────────────────────────┘
//! ```
//!
//! The writer uses a fixed stack buffer so encoding never allocates.

use crate::action::{ActionKind, ActionPayload};
use crate::error::CodecError;
use bytemuck::{bytes_of, Pod};
use kestrel_core::Vec4;

/// Largest encoded frame (a movement frame is 36 bytes).
pub const MAX_FRAME_SIZE: usize = 64;

/// Writes tagged payload frames into a reusable buffer.
pub struct PayloadWriter {
    buffer: [u8; MAX_FRAME_SIZE],
    position: usize,
}

impl PayloadWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_FRAME_SIZE],
            position: 0,
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        let end = self.position + bytes.len();
        if end > MAX_FRAME_SIZE {
            return false;
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        true
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        self.write_bytes(&[value])
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> bool {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> bool {
        self.write_bytes(bytes_of(value))
    }

    /// Encodes `payload` as a complete tagged frame, replacing any previous
    /// content.
    pub fn encode(&mut self, payload: &ActionPayload) -> bool {
        self.reset();
        if !self.write_u32(payload.kind().tag()) {
            return false;
        }
        match *payload {
            ActionPayload::Attack {
                attack_type,
                weapon_type,
                target_position,
            } => {
                self.write_u32(attack_type)
                    && self.write_u32(weapon_type)
                    && self.write_pod(&target_position)
            }
            ActionPayload::Defense {
                defense_type,
                incoming_attack_id,
            } => self.write_u32(defense_type) && self.write_u32(incoming_attack_id),
            ActionPayload::Sign {
                sign_type,
                target_position,
            } => self.write_u32(sign_type) && self.write_pod(&target_position),
            ActionPayload::Animation {
                animation_type,
                is_attack,
            } => self.write_u32(animation_type) && self.write_u8(u8::from(is_attack)),
            ActionPayload::Movement { position, velocity } => {
                self.write_pod(&position) && self.write_pod(&velocity)
            }
        }
    }
}

impl Default for PayloadWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads payload fields from a borrowed buffer.
pub struct PayloadReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::Truncated { needed, remaining });
        }
        let slice = &self.buffer[self.position..self.position + needed];
        self.position += needed;
        Ok(slice)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a Pod type directly.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, CodecError> {
        let size = std::mem::size_of::<T>();
        let slice = self.take(size)?;
        bytemuck::try_pod_read_unaligned(slice).map_err(|_| CodecError::Truncated {
            needed: size,
            remaining: slice.len(),
        })
    }

    /// Reads the fields of a `kind` payload (the tag is already consumed).
    pub fn read_payload(&mut self, kind: ActionKind) -> Result<ActionPayload, CodecError> {
        Ok(match kind {
            ActionKind::Attack => ActionPayload::Attack {
                attack_type: self.read_u32()?,
                weapon_type: self.read_u32()?,
                target_position: self.read_pod::<Vec4>()?,
            },
            ActionKind::Defense => ActionPayload::Defense {
                defense_type: self.read_u32()?,
                incoming_attack_id: self.read_u32()?,
            },
            ActionKind::Sign => ActionPayload::Sign {
                sign_type: self.read_u32()?,
                target_position: self.read_pod::<Vec4>()?,
            },
            ActionKind::Animation => ActionPayload::Animation {
                animation_type: self.read_u32()?,
                is_attack: self.read_u8()? != 0,
            },
            ActionKind::Movement => ActionPayload::Movement {
                position: self.read_pod::<Vec4>()?,
                velocity: self.read_pod::<Vec4>()?,
            },
        })
    }

    /// Reads a complete tagged frame.
    pub fn read_frame(&mut self) -> Result<ActionPayload, CodecError> {
        let tag = self.read_u32()?;
        let kind = ActionKind::from_tag(tag).ok_or(CodecError::UnknownKind(tag))?;
        self.read_payload(kind)
    }
}

/// Decodes one tagged frame. Trailing bytes are ignored.
pub fn decode_frame(bytes: &[u8]) -> Result<ActionPayload, CodecError> {
    PayloadReader::new(bytes).read_frame()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_frame() {
        let payload = ActionPayload::Attack {
            attack_type: 2,
            weapon_type: 7,
            target_position: Vec4::point(1.0, 2.0, 3.0),
        };
        let mut writer = PayloadWriter::new();
        assert!(writer.encode(&payload));
        assert_eq!(writer.len(), 4 + 4 + 4 + 16);
        assert_eq!(&writer.as_slice()[..4], &[0, 0, 0, 0]);

        assert_eq!(decode_frame(writer.as_slice()), Ok(payload));
    }

    #[test]
    fn test_animation_flag_byte() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&11u32.to_le_bytes());
        bytes.push(1);

        assert_eq!(
            decode_frame(&bytes),
            Ok(ActionPayload::Animation {
                animation_type: 11,
                is_attack: true
            })
        );
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = 42u32.to_le_bytes();
        assert_eq!(decode_frame(&bytes), Err(CodecError::UnknownKind(42)));
    }

    #[test]
    fn test_truncated_movement() {
        let mut writer = PayloadWriter::new();
        assert!(writer.encode(&ActionPayload::Movement {
            position: Vec4::point(1.0, 1.0, 1.0),
            velocity: Vec4::ZERO,
        }));
        let cut = &writer.as_slice()[..writer.len() - 3];
        assert_eq!(
            decode_frame(cut),
            Err(CodecError::Truncated {
                needed: 16,
                remaining: 13
            })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            decode_frame(&[]),
            Err(CodecError::Truncated {
                needed: 4,
                remaining: 0
            })
        );
    }
}
