use super::MessageType;
use crate::type_system::unmarshal::UnmarshalError;
use crate::type_system::Endianness;

pub mod header_field;

/// Bytes of the fixed message header, through the length word of the
/// header-fields array.
pub const FIXED_HEADER_LENGTH: usize = 16;

pub const FLAG_NO_REPLY_EXPECTED: u8 = 0x1;
pub const FLAG_NO_AUTO_START: u8 = 0x2;
pub const FLAG_ALLOW_INTERACTIVE_AUTHORIZATION: u8 = 0x4;

/// The fixed part of a message header.
///
/// Twelve bytes (byte order, message type, flags, protocol version, body
/// length, serial) plus the length word of the header-fields array. From
/// these the total frame extent is known, which is what the connection
/// uses to decide whether a frame is complete before parsing it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FixedHeader {
    pub endianness: Endianness,
    pub message_type: MessageType,
    pub flag_no_reply_expected: bool,
    pub flag_no_auto_start: bool,
    pub flag_allow_interactive_authorization: bool,
    pub body_length: u32,
    pub serial: u32,
    pub header_fields_length: u32,
}

/// Round up to the next multiple of 8.
pub(crate) fn pad_to_8(len: usize) -> usize {
    (len + 7) & !7
}

impl FixedHeader {
    /// Parse the fixed header from the front of `buf`.
    ///
    /// The fatal malformations (bad byte-order marker, bad message type,
    /// wrong protocol version) are reported as soon as their byte is
    /// available; only after that does a short buffer count as truncation.
    pub fn unmarshal(buf: &[u8]) -> Result<Self, UnmarshalError> {
        if let Some(&marker) = buf.get(0) {
            if Endianness::from_ascii_code(marker).is_none() {
                return Err(UnmarshalError::InvalidByteOrder(marker));
            }
        }

        if let Some(&message_type) = buf.get(1) {
            MessageType::from_decimal(message_type)?;
        }

        if let Some(&version) = buf.get(3) {
            if version != crate::MAJOR_PROTOCOL_VERSION {
                return Err(UnmarshalError::InvalidHeader);
            }
        }

        if buf.len() < FIXED_HEADER_LENGTH {
            return Err(UnmarshalError::TruncatedHeaderFields);
        }

        // The checks above make these infallible.
        let endianness = Endianness::from_ascii_code(buf[0])
            .ok_or(UnmarshalError::InvalidByteOrder(buf[0]))?;
        let message_type = MessageType::from_decimal(buf[1])?;

        let flags = buf[2];

        let word = |bytes: [u8; 4]| match endianness {
            Endianness::BigEndian => u32::from_be_bytes(bytes),
            Endianness::LittleEndian => u32::from_le_bytes(bytes),
        };

        let mut body_length = [0u8; 4];
        body_length.copy_from_slice(&buf[4..8]);
        let mut serial = [0u8; 4];
        serial.copy_from_slice(&buf[8..12]);
        let mut header_fields_length = [0u8; 4];
        header_fields_length.copy_from_slice(&buf[12..16]);

        Ok(Self {
            endianness,
            message_type,
            flag_no_reply_expected: flags & FLAG_NO_REPLY_EXPECTED != 0,
            flag_no_auto_start: flags & FLAG_NO_AUTO_START != 0,
            flag_allow_interactive_authorization: flags
                & FLAG_ALLOW_INTERACTIVE_AUTHORIZATION
                != 0,
            body_length: word(body_length),
            serial: word(serial),
            header_fields_length: word(header_fields_length),
        })
    }

    /// Offset of the body: fixed header, fields array, padding to 8.
    pub fn header_length(&self) -> usize {
        pad_to_8(FIXED_HEADER_LENGTH + self.header_fields_length as usize)
    }

    /// Total extent of the frame in the byte stream.
    pub fn frame_length(&self) -> usize {
        self.header_length() + self.body_length as usize
    }
}
