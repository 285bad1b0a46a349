//! Read cursor over a marshalled frame.

use super::UnmarshalError;
use crate::type_system::Endianness;

/// A wrapper over `&[u8]` that keeps track of the position relative to the
/// start of the frame.
///
/// The slice must begin at the start of the marshalled frame (or on an
/// 8-byte boundary of it): alignment is computed from that origin, never
/// from whatever framing the transport delivered.
#[derive(Copy, Clone, Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endianness,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Position of the reader, from the start of the frame.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Skip over padding until at an n-byte boundary.
    ///
    /// The padding must consist of null bytes.
    pub fn advance_to_boundary(&mut self, boundary: usize) -> Result<(), UnmarshalError> {
        debug_assert!(
            [1, 2, 4, 8].contains(&boundary),
            "alignment is always 1, 2, 4 or 8"
        );

        while self.pos % boundary != 0 {
            let byte = *self.data.get(self.pos).ok_or(UnmarshalError::EarlyEof)?;
            if byte != 0 {
                return Err(UnmarshalError::InvalidPadding);
            }
            self.pos += 1;
        }

        Ok(())
    }

    /// A view of the next `len` bytes, consuming them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], UnmarshalError> {
        let end = self.pos.checked_add(len).ok_or(UnmarshalError::EarlyEof)?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(UnmarshalError::EarlyEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, UnmarshalError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, UnmarshalError> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(match self.endianness {
            Endianness::BigEndian => u16::from_be_bytes(bytes),
            Endianness::LittleEndian => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, UnmarshalError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(match self.endianness {
            Endianness::BigEndian => u32::from_be_bytes(bytes),
            Endianness::LittleEndian => u32::from_le_bytes(bytes),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, UnmarshalError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(match self.endianness {
            Endianness::BigEndian => u64::from_be_bytes(bytes),
            Endianness::LittleEndian => u64::from_le_bytes(bytes),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, UnmarshalError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, UnmarshalError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, UnmarshalError> {
        Ok(self.read_u64()? as i64)
    }

    /// The IEEE-754 bit pattern moves as a u64.
    pub fn read_f64(&mut self) -> Result<f64, UnmarshalError> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}
