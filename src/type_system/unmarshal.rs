//! Unmarshalling of wire bytes back into values.
//!
//! Decoding is driven by a [SingleCompleteTypeSignature]: the wire format
//! is not self-describing except inside variants, so the caller supplies
//! the expected type (from the SIGNATURE header field, or from the
//! enclosing container).

pub mod decoder;

use self::decoder::Decoder;
use super::signature::parse_signature;
use super::signature::SignatureError;
use super::signature::SingleCompleteTypeSignature;
use super::types::*;

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum UnmarshalError {
    /// The input ended in the middle of a value. When the input is a
    /// complete frame this is fatal; the frame codec turns short *frames*
    /// into [UnmarshalError::TruncatedHeaderFields] /
    /// [UnmarshalError::TruncatedBody] instead, which are recoverable.
    #[error("unexpected end of input")]
    EarlyEof,

    #[error("invalid byte order marker: {0:#04x}")]
    InvalidByteOrder(u8),

    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("malformed message header")]
    InvalidHeader,

    #[error("header fields extend past the available bytes")]
    TruncatedHeaderFields,

    #[error("body extends past the available bytes")]
    TruncatedBody,

    #[error("alignment padding contains non-null bytes")]
    InvalidPadding,

    #[error("boolean value is not 0 or 1: {0}")]
    InvalidBoolean(u32),

    #[error("array contents do not match the declared length")]
    ArrayLengthMismatch,

    #[error("body contents do not match the declared length")]
    BodyLengthMismatch,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed string payload")]
    InvalidString,

    #[error("type code is not decodable in this position: {0:#04x}")]
    UnsupportedType(u8),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl Type {
    /// Decode one value of the given type.
    pub fn unmarshal(
        decoder: &mut Decoder<'_>,
        signature: &SingleCompleteTypeSignature,
    ) -> Result<Self, UnmarshalError> {
        let value = match signature {
            SingleCompleteTypeSignature::DBusByte => DBusByte::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusBoolean => {
                DBusBoolean::unmarshal(decoder)?.into()
            }
            SingleCompleteTypeSignature::DBusInt16 => DBusInt16::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusUint16 => DBusUint16::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusInt32 => DBusInt32::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusUint32 => DBusUint32::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusInt64 => DBusInt64::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusUint64 => DBusUint64::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusDouble => DBusDouble::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusString => DBusString::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusObjectPath => {
                DBusObjectPath::unmarshal(decoder)?.into()
            }
            SingleCompleteTypeSignature::DBusSignature => {
                DBusSignature::unmarshal(decoder)?.into()
            }
            SingleCompleteTypeSignature::DBusUnixFileDescriptor => {
                DBusUnixFileDescriptor::unmarshal(decoder)?.into()
            }
            SingleCompleteTypeSignature::DBusVariant => DBusVariant::unmarshal(decoder)?.into(),
            SingleCompleteTypeSignature::DBusArray(item_type) => {
                DBusArray::unmarshal(decoder, item_type)?.into()
            }
            SingleCompleteTypeSignature::DBusStruct { fields } => {
                DBusStruct::unmarshal(decoder, fields)?.into()
            }
            // A dict entry cannot stand on its own; it is decoded by its
            // enclosing array.
            SingleCompleteTypeSignature::DBusDictEntry { .. } => {
                return Err(UnmarshalError::UnsupportedType(b'{'))
            }
        };

        Ok(value)
    }
}

impl DBusByte {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        Ok(Self {
            u8: decoder.read_u8()?,
        })
    }
}

impl DBusBoolean {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;

        // The boolean is contained in a u32, but only 0 or 1 are valid.
        let bool = match decoder.read_u32()? {
            0 => false,
            1 => true,
            other => return Err(UnmarshalError::InvalidBoolean(other)),
        };

        Ok(Self { bool })
    }
}

impl DBusInt16 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(2)?;
        Ok(Self {
            i16: decoder.read_i16()?,
        })
    }
}

impl DBusUint16 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(2)?;
        Ok(Self {
            u16: decoder.read_u16()?,
        })
    }
}

impl DBusInt32 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;
        Ok(Self {
            i32: decoder.read_i32()?,
        })
    }
}

impl DBusUint32 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;
        Ok(Self {
            u32: decoder.read_u32()?,
        })
    }
}

impl DBusInt64 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(8)?;
        Ok(Self {
            i64: decoder.read_i64()?,
        })
    }
}

impl DBusUint64 {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(8)?;
        Ok(Self {
            u64: decoder.read_u64()?,
        })
    }
}

impl DBusDouble {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(8)?;
        Ok(Self {
            f64: decoder.read_f64()?,
        })
    }
}

impl DBusString {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;

        // Four bytes of length, excluding the terminating null.
        let length = decoder.read_u32()? as usize;

        let bytes = decoder.take(length)?;
        let string = std::str::from_utf8(bytes).map_err(|_| UnmarshalError::InvalidUtf8)?;

        // A length-bounded read can still smuggle a NUL in.
        if string.contains('\u{0}') {
            return Err(UnmarshalError::InvalidString);
        }

        // The string must be followed by a null byte.
        if decoder.read_u8()? != 0 {
            return Err(UnmarshalError::InvalidString);
        }

        Ok(Self {
            string: String::from(string),
        })
    }
}

impl DBusObjectPath {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        // Marshalled the same way as DBusString, but the payload must be a
        // well-formed object path.
        let dbus_string = DBusString::unmarshal(decoder)?;

        if !is_valid_object_path(&dbus_string.string) {
            return Err(UnmarshalError::InvalidString);
        }

        Ok(Self { dbus_string })
    }
}

impl DBusSignature {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        // Single byte of length, no alignment.
        let length = decoder.read_u8()? as usize;

        let bytes = decoder.take(length)?;
        let string = std::str::from_utf8(bytes).map_err(|_| UnmarshalError::InvalidUtf8)?;

        if decoder.read_u8()? != 0 {
            return Err(UnmarshalError::InvalidString);
        }

        let vec = parse_signature(string)?;

        Ok(Self { vec })
    }
}

impl DBusUnixFileDescriptor {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;
        Ok(Self {
            index: decoder.read_u32()?,
        })
    }
}

impl DBusVariant {
    pub(crate) fn unmarshal(decoder: &mut Decoder<'_>) -> Result<Self, UnmarshalError> {
        // The embedded signature must hold exactly one single complete
        // type; the value follows, aligned for itself.
        let signature = DBusSignature::unmarshal(decoder)?;

        let single = match signature.vec.as_slice() {
            [single] => single.clone(),
            [] => return Err(UnmarshalError::Signature(SignatureError::UnexpectedEnd)),
            _ => return Err(UnmarshalError::Signature(SignatureError::ExtraCharacters)),
        };

        let value = Type::unmarshal(decoder, &single)?;

        Ok(Self {
            variant: Box::new(value),
        })
    }
}

impl DBusArray {
    pub(crate) fn unmarshal(
        decoder: &mut Decoder<'_>,
        item_type: &SingleCompleteTypeSignature,
    ) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(4)?;
        let length = decoder.read_u32()? as usize;

        // Padding up to the first item is not part of the length.
        decoder.advance_to_boundary(item_type.marshalling_boundary())?;
        let end = decoder.position() + length;

        let mut array = Self::new(item_type.clone());
        while decoder.position() < end {
            let item = match item_type {
                SingleCompleteTypeSignature::DBusDictEntry { key, value } => {
                    Type::from(DBusDictEntry::unmarshal(decoder, key, value)?)
                }
                other => Type::unmarshal(decoder, other)?,
            };
            array.items.push(item);
        }

        // Each item consumes what its type says; ending anywhere else
        // means the declared length was wrong.
        if decoder.position() != end {
            return Err(UnmarshalError::ArrayLengthMismatch);
        }

        Ok(array)
    }
}

impl DBusStruct {
    pub(crate) fn unmarshal(
        decoder: &mut Decoder<'_>,
        field_types: &[SingleCompleteTypeSignature],
    ) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(8)?;

        let mut fields = Vec::with_capacity(field_types.len());
        for field_type in field_types {
            fields.push(Type::unmarshal(decoder, field_type)?);
        }

        Ok(Self { fields })
    }
}

impl DBusDictEntry {
    pub(crate) fn unmarshal(
        decoder: &mut Decoder<'_>,
        key_type: &SingleCompleteTypeSignature,
        value_type: &SingleCompleteTypeSignature,
    ) -> Result<Self, UnmarshalError> {
        decoder.advance_to_boundary(8)?;

        let key = match Type::unmarshal(decoder, key_type)? {
            Type::Basic(basic) => basic,
            Type::Container(_) => {
                return Err(UnmarshalError::Signature(SignatureError::InvalidDictKey))
            }
        };

        let value = Type::unmarshal(decoder, value_type)?;

        Ok(Self {
            key,
            value: Box::new(value),
        })
    }
}
