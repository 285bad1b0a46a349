//! Marshalling of values into wire bytes.
//!
//! The [Encoder] owns the output buffer of one frame. Alignment is always
//! computed from the start of that buffer, which is also the start of the
//! marshalled frame (a message body is marshalled into its own encoder,
//! which works out because bodies begin on an 8-byte boundary).

use std::convert::TryFrom;

use super::signature::Signature;
use super::types::*;
use super::Endianness;

#[derive(Debug, Default)]
pub struct Encoder {
    pub buf: Vec<u8>,
}

/// Marshal a value into the encoder, padding to the value's alignment
/// boundary first.
pub trait Marshal<T> {
    fn marshal(&mut self, t: &T, endianness: Endianness) -> crate::Result<()>;
}

impl Encoder {
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Push null bytes until aligned.
    pub fn align(&mut self, alignment: usize) {
        debug_assert!(
            [1, 2, 4, 8].contains(&alignment),
            "alignment is always 1, 2, 4 or 8"
        );

        while self.buf.len() % alignment != 0 {
            self.buf.push(0);
        }
    }

    pub fn push_u16(&mut self, value: u16, endianness: Endianness) {
        let bytes = match endianness {
            Endianness::BigEndian => value.to_be_bytes(),
            Endianness::LittleEndian => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn push_u32(&mut self, value: u32, endianness: Endianness) {
        let bytes = match endianness {
            Endianness::BigEndian => value.to_be_bytes(),
            Endianness::LittleEndian => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    pub fn push_u64(&mut self, value: u64, endianness: Endianness) {
        let bytes = match endianness {
            Endianness::BigEndian => value.to_be_bytes(),
            Endianness::LittleEndian => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    /// Reserve N bytes and return a closure that can be called to set the
    /// bytes later.
    ///
    /// This pushes N null bytes, and the returned closure remembers their
    /// index and overwrites them when called. Intended for length-value
    /// encoding where the length isn't known up front.
    pub fn reserve_n_bytes<const N: usize>(&mut self) -> impl FnOnce(&mut Encoder, [u8; N]) {
        let idx = self.buf.len();

        self.buf.extend_from_slice(&[0; N]);

        move |encoder: &mut Encoder, values: [u8; N]| {
            encoder.buf[idx..idx + N].copy_from_slice(&values);
        }
    }
}

impl Marshal<Type> for Encoder {
    fn marshal(&mut self, t: &Type, endianness: Endianness) -> crate::Result<()> {
        match t {
            Type::Basic(inner) => self.marshal(inner, endianness),
            Type::Container(inner) => self.marshal(inner, endianness),
        }
    }
}

impl Marshal<BasicType> for Encoder {
    fn marshal(&mut self, t: &BasicType, endianness: Endianness) -> crate::Result<()> {
        match t {
            BasicType::DBusByte(inner) => self.marshal(inner, endianness),
            BasicType::DBusBoolean(inner) => self.marshal(inner, endianness),
            BasicType::DBusInt16(inner) => self.marshal(inner, endianness),
            BasicType::DBusUint16(inner) => self.marshal(inner, endianness),
            BasicType::DBusInt32(inner) => self.marshal(inner, endianness),
            BasicType::DBusUint32(inner) => self.marshal(inner, endianness),
            BasicType::DBusInt64(inner) => self.marshal(inner, endianness),
            BasicType::DBusUint64(inner) => self.marshal(inner, endianness),
            BasicType::DBusDouble(inner) => self.marshal(inner, endianness),
            BasicType::DBusString(inner) => self.marshal(inner, endianness),
            BasicType::DBusObjectPath(inner) => self.marshal(inner, endianness),
            BasicType::DBusSignature(inner) => self.marshal(inner, endianness),
            BasicType::DBusUnixFileDescriptor(inner) => self.marshal(inner, endianness),
        }
    }
}

impl Marshal<ContainerType> for Encoder {
    fn marshal(&mut self, t: &ContainerType, endianness: Endianness) -> crate::Result<()> {
        match t {
            ContainerType::DBusArray(inner) => self.marshal(inner, endianness),
            ContainerType::DBusStruct(inner) => self.marshal(inner, endianness),
            ContainerType::DBusVariant(inner) => self.marshal(inner, endianness),
            ContainerType::DBusDictEntry(inner) => self.marshal(inner, endianness),
        }
    }
}

impl Marshal<DBusByte> for Encoder {
    fn marshal(&mut self, t: &DBusByte, _endianness: Endianness) -> crate::Result<()> {
        self.buf.push(t.u8);
        Ok(())
    }
}

impl Marshal<DBusBoolean> for Encoder {
    fn marshal(&mut self, t: &DBusBoolean, endianness: Endianness) -> crate::Result<()> {
        // Booleans take a full u32 on the wire.
        let value: u32 = if t.bool { 1 } else { 0 };
        self.marshal(&DBusUint32 { u32: value }, endianness)
    }
}

impl Marshal<DBusInt16> for Encoder {
    fn marshal(&mut self, t: &DBusInt16, endianness: Endianness) -> crate::Result<()> {
        self.align(2);
        self.push_u16(t.i16 as u16, endianness);
        Ok(())
    }
}

impl Marshal<DBusUint16> for Encoder {
    fn marshal(&mut self, t: &DBusUint16, endianness: Endianness) -> crate::Result<()> {
        self.align(2);
        self.push_u16(t.u16, endianness);
        Ok(())
    }
}

impl Marshal<DBusInt32> for Encoder {
    fn marshal(&mut self, t: &DBusInt32, endianness: Endianness) -> crate::Result<()> {
        self.align(4);
        self.push_u32(t.i32 as u32, endianness);
        Ok(())
    }
}

impl Marshal<DBusUint32> for Encoder {
    fn marshal(&mut self, t: &DBusUint32, endianness: Endianness) -> crate::Result<()> {
        self.align(4);
        self.push_u32(t.u32, endianness);
        Ok(())
    }
}

impl Marshal<DBusInt64> for Encoder {
    fn marshal(&mut self, t: &DBusInt64, endianness: Endianness) -> crate::Result<()> {
        self.align(8);
        self.push_u64(t.i64 as u64, endianness);
        Ok(())
    }
}

impl Marshal<DBusUint64> for Encoder {
    fn marshal(&mut self, t: &DBusUint64, endianness: Endianness) -> crate::Result<()> {
        self.align(8);
        self.push_u64(t.u64, endianness);
        Ok(())
    }
}

impl Marshal<DBusDouble> for Encoder {
    fn marshal(&mut self, t: &DBusDouble, endianness: Endianness) -> crate::Result<()> {
        // The IEEE-754 bit pattern moves as a u64.
        self.align(8);
        self.push_u64(t.f64.to_bits(), endianness);
        Ok(())
    }
}

impl Marshal<DBusString> for Encoder {
    fn marshal(&mut self, t: &DBusString, endianness: Endianness) -> crate::Result<()> {
        self.align(4);

        // Length of the string in bytes, excluding the terminating null.
        let length = u32::try_from(t.string.len())?;
        self.push_u32(length, endianness);

        // Rust strings are UTF-8, as are D-Bus strings.
        self.buf.extend_from_slice(t.string.as_bytes());

        // Terminating null byte.
        self.buf.push(0x00);

        Ok(())
    }
}

impl Marshal<DBusObjectPath> for Encoder {
    fn marshal(&mut self, t: &DBusObjectPath, endianness: Endianness) -> crate::Result<()> {
        // Marshals the same way as DBusString.
        self.marshal(&t.dbus_string, endianness)
    }
}

impl Marshal<DBusSignature> for Encoder {
    fn marshal(&mut self, t: &DBusSignature, _endianness: Endianness) -> crate::Result<()> {
        // Single length byte, no alignment.
        let specify_length = self.reserve_n_bytes::<1>();

        let offset_first_byte = self.buf.len();

        for single_complete_type_signature in &t.vec {
            self.buf
                .extend_from_slice(&single_complete_type_signature.serialize());
        }

        let length = u8::try_from(self.buf.len() - offset_first_byte)?;
        specify_length(self, length.to_be_bytes());

        // Terminating null byte.
        self.buf.push(0x00);

        Ok(())
    }
}

impl Marshal<DBusUnixFileDescriptor> for Encoder {
    fn marshal(
        &mut self,
        t: &DBusUnixFileDescriptor,
        endianness: Endianness,
    ) -> crate::Result<()> {
        // Only the index into the descriptor list is marshalled.
        self.align(4);
        self.push_u32(t.index, endianness);
        Ok(())
    }
}

impl Marshal<DBusVariant> for Encoder {
    fn marshal(&mut self, t: &DBusVariant, endianness: Endianness) -> crate::Result<()> {
        // Single complete type signature of the contained value.
        let dbus_signature = DBusSignature {
            vec: vec![t.variant.signature()],
        };

        // Variant signature, then the value, which aligns itself.
        self.marshal(&dbus_signature, endianness)?;
        self.marshal(&*t.variant, endianness)?;

        Ok(())
    }
}

impl Marshal<DBusArray> for Encoder {
    fn marshal(&mut self, t: &DBusArray, endianness: Endianness) -> crate::Result<()> {
        // The array is length-value encoded, and the length is 4-aligned.
        self.align(4);

        // Reserve 4 bytes for the length. We don't know it yet.
        let specify_length = self.reserve_n_bytes::<4>();

        // Padding between the length and the first item does not count
        // towards the array length; padding between items does.
        self.align(t.item_type.marshalling_boundary());

        let offset_first_item = self.buf.len();

        for item in &t.items {
            debug_assert_eq!(item.signature(), t.item_type, "item matches the array type");
            self.marshal(item, endianness)?;
        }

        let array_data_length = u32::try_from(self.buf.len() - offset_first_item)?;
        let length_bytes = match endianness {
            Endianness::BigEndian => array_data_length.to_be_bytes(),
            Endianness::LittleEndian => array_data_length.to_le_bytes(),
        };
        specify_length(self, length_bytes);

        Ok(())
    }
}

impl Marshal<DBusStruct> for Encoder {
    fn marshal(&mut self, t: &DBusStruct, endianness: Endianness) -> crate::Result<()> {
        // Structs start on an 8-byte boundary regardless of their fields.
        self.align(8);

        for field in &t.fields {
            self.marshal(field, endianness)?;
        }

        Ok(())
    }
}

impl Marshal<DBusDictEntry> for Encoder {
    fn marshal(&mut self, t: &DBusDictEntry, endianness: Endianness) -> crate::Result<()> {
        // Like a two-field struct: 8-aligned, key then value.
        self.align(8);

        self.marshal(&t.key, endianness)?;
        self.marshal(&*t.value, endianness)?;

        Ok(())
    }
}
