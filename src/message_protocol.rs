//! Messages and the frame codec.
//!
//! A message is the fixed header, an array of `(code, variant)` header
//! fields, and a body of values described by the SIGNATURE header field.
//! Everything here works on complete frames; deciding whether a frame is
//! complete is the connection's job, via [header::FixedHeader].

pub mod body;
pub mod header;

use std::convert::TryFrom;
use std::num::NonZeroU32;

pub use self::body::Body;
pub use self::header::header_field::HeaderField;
pub use self::header::FixedHeader;

use crate::type_system::marshal::Encoder;
use crate::type_system::marshal::Marshal;
use crate::type_system::signature::HEADER_FIELD_SIGNATURE;
use crate::type_system::types::*;
use crate::type_system::unmarshal::decoder::Decoder;
use crate::type_system::unmarshal::UnmarshalError;
use crate::type_system::Endianness;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MessageType {
    MethodCall,
    MethodReturn,
    Error,
    Signal,
}

impl MessageType {
    pub fn decimal_value(&self) -> u8 {
        match self {
            Self::MethodCall => 1,
            Self::MethodReturn => 2,
            Self::Error => 3,
            Self::Signal => 4,
        }
    }

    pub fn from_decimal(value: u8) -> Result<Self, UnmarshalError> {
        match value {
            1 => Ok(Self::MethodCall),
            2 => Ok(Self::MethodReturn),
            3 => Ok(Self::Error),
            4 => Ok(Self::Signal),
            other => Err(UnmarshalError::InvalidMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub endianness: Endianness,
    pub message_type: MessageType,

    pub flag_no_reply_expected: bool,
    pub flag_no_auto_start: bool,
    pub flag_allow_interactive_authorization: bool,

    /// The serial identifying this message, used as a cookie by the sender
    /// to correlate the reply with this request. Assigned by the
    /// connection for outgoing messages.
    pub serial: Option<NonZeroU32>,

    /// Routing and correlation metadata, in wire order. The SIGNATURE
    /// field is never kept here: it is derived from [Message::body] when
    /// marshalling and folded back into the body when unmarshalling.
    pub header_fields: Vec<HeaderField>,

    pub body: Body,
}

impl Message {
    fn new(message_type: MessageType, header_fields: Vec<HeaderField>, body: Body) -> Self {
        Self {
            endianness: Endianness::native(),
            message_type,
            flag_no_reply_expected: false,
            flag_no_auto_start: false,
            flag_allow_interactive_authorization: false,
            serial: None,
            header_fields,
            body,
        }
    }

    /// A METHOD_CALL for `member` on the object at `path`.
    pub fn method_call(
        destination: Option<&str>,
        path: &str,
        interface: Option<&str>,
        member: &str,
        body: Body,
    ) -> crate::Result<Self> {
        let mut header_fields = vec![
            HeaderField::Path(DBusObjectPath::new(path)?),
            HeaderField::Member(DBusString::new(validate_member_name(member)?)?),
        ];

        if let Some(interface) = interface {
            header_fields.push(HeaderField::Interface(DBusString::new(
                validate_interface_name(interface)?,
            )?));
        }

        if let Some(destination) = destination {
            header_fields.push(HeaderField::Destination(DBusString::new(
                validate_bus_name(destination)?,
            )?));
        }

        Ok(Self::new(MessageType::MethodCall, header_fields, body))
    }

    /// A METHOD_RETURN answering the message with serial `reply_serial`.
    pub fn method_return(
        reply_serial: NonZeroU32,
        destination: Option<&str>,
        body: Body,
    ) -> crate::Result<Self> {
        let mut header_fields = vec![HeaderField::ReplySerial(DBusUint32 {
            u32: reply_serial.get(),
        })];

        if let Some(destination) = destination {
            header_fields.push(HeaderField::Destination(DBusString::new(
                validate_bus_name(destination)?,
            )?));
        }

        Ok(Self::new(MessageType::MethodReturn, header_fields, body))
    }

    /// An ERROR answering the message with serial `reply_serial`.
    pub fn error(
        error_name: &str,
        reply_serial: NonZeroU32,
        destination: Option<&str>,
        body: Body,
    ) -> crate::Result<Self> {
        let mut header_fields = vec![
            HeaderField::ErrorName(DBusString::new(validate_error_name(error_name)?)?),
            HeaderField::ReplySerial(DBusUint32 {
                u32: reply_serial.get(),
            }),
        ];

        if let Some(destination) = destination {
            header_fields.push(HeaderField::Destination(DBusString::new(
                validate_bus_name(destination)?,
            )?));
        }

        Ok(Self::new(MessageType::Error, header_fields, body))
    }

    /// A SIGNAL emitted from `path` as `interface`.`member`.
    pub fn signal(path: &str, interface: &str, member: &str, body: Body) -> crate::Result<Self> {
        let header_fields = vec![
            HeaderField::Path(DBusObjectPath::new(path)?),
            HeaderField::Interface(DBusString::new(validate_interface_name(interface)?)?),
            HeaderField::Member(DBusString::new(validate_member_name(member)?)?),
        ];

        Ok(Self::new(MessageType::Signal, header_fields, body))
    }

    pub fn path(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::Path(inner) => Some(inner.as_str()),
            _ => None,
        })
    }

    pub fn interface(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::Interface(inner) => Some(inner.string.as_str()),
            _ => None,
        })
    }

    pub fn member(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::Member(inner) => Some(inner.string.as_str()),
            _ => None,
        })
    }

    pub fn error_name(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::ErrorName(inner) => Some(inner.string.as_str()),
            _ => None,
        })
    }

    /// The serial of the message this one replies to.
    pub fn reply_serial(&self) -> Option<u32> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::ReplySerial(inner) => Some(inner.u32),
            _ => None,
        })
    }

    pub fn destination(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::Destination(inner) => Some(inner.string.as_str()),
            _ => None,
        })
    }

    pub fn sender(&self) -> Option<&str> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::Sender(inner) => Some(inner.string.as_str()),
            _ => None,
        })
    }

    pub fn unix_fds(&self) -> Option<u32> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::UnixFds(inner) => Some(inner.u32),
            _ => None,
        })
    }

    /// Marshal the complete frame.
    pub fn marshal(&self) -> crate::Result<Vec<u8>> {
        let serial = self.serial.ok_or(crate::Error::MissingSerial)?;
        let endianness = self.endianness;

        let marshalled_body = self.body.marshal(endianness)?;

        let mut encoder = Encoder::default();

        // 1st byte: endianness marker.
        encoder.buf.push(endianness.ascii_code());

        // 2nd byte: message type.
        encoder.buf.push(self.message_type.decimal_value());

        // 3rd byte: bitwise OR of the flags.
        let mut flags = 0;
        if self.flag_no_reply_expected {
            flags |= header::FLAG_NO_REPLY_EXPECTED;
        }
        if self.flag_no_auto_start {
            flags |= header::FLAG_NO_AUTO_START;
        }
        if self.flag_allow_interactive_authorization {
            flags |= header::FLAG_ALLOW_INTERACTIVE_AUTHORIZATION;
        }
        encoder.buf.push(flags);

        // 4th byte: major protocol version.
        encoder.buf.push(crate::MAJOR_PROTOCOL_VERSION);

        // 5th to 8th byte: length in bytes of the message body.
        encoder.push_u32(u32::try_from(marshalled_body.len())?, endianness);

        // 9th to 12th byte: serial.
        encoder.push_u32(serial.get(), endianness);

        // Header fields, as an array of struct (byte, variant). The
        // SIGNATURE field is derived from the body and omitted when the
        // body is empty.
        let mut header_fields: Vec<HeaderField> = self
            .header_fields
            .iter()
            .filter(|field| !matches!(field, HeaderField::Signature(_)))
            .cloned()
            .collect();

        if !self.body.is_empty() {
            header_fields.push(HeaderField::Signature(DBusSignature {
                vec: self.body.signature(),
            }));
        }

        encoder.marshal(&prepare_header_fields(header_fields), endianness)?;

        // The body begins on an 8-byte boundary.
        encoder.align(8);

        let mut frame = encoder.finish();
        frame.extend(marshalled_body);
        Ok(frame)
    }

    /// Parse one complete frame from the front of `buf`.
    ///
    /// Returns the message and the number of bytes it occupied. If `buf`
    /// does not yet hold the whole frame this fails with
    /// [UnmarshalError::TruncatedHeaderFields] or
    /// [UnmarshalError::TruncatedBody] without consuming anything; the
    /// caller retries once more bytes have arrived.
    pub fn unmarshal(buf: &[u8]) -> Result<(Self, usize), UnmarshalError> {
        let fixed = FixedHeader::unmarshal(buf)?;

        if buf.len() < fixed.header_length() {
            return Err(UnmarshalError::TruncatedHeaderFields);
        }
        if buf.len() < fixed.frame_length() {
            return Err(UnmarshalError::TruncatedBody);
        }

        let frame = &buf[..fixed.frame_length()];
        let mut decoder = Decoder::new(frame, fixed.endianness);

        // The fixed part is already parsed; position the reader on the
        // header-fields array, whose length word sits at offset 12.
        decoder.take(12).map_err(|_| UnmarshalError::InvalidHeader)?;

        let fields_array = DBusArray::unmarshal(&mut decoder, &HEADER_FIELD_SIGNATURE)
            .map_err(promote_eof_to_invalid_header)?;

        let mut header_fields = Vec::new();
        let mut signature: Option<DBusSignature> = None;

        for entry in fields_array.items {
            let (code, variant) = match entry {
                Type::Container(ContainerType::DBusStruct(DBusStruct { fields })) => {
                    let mut fields = fields.into_iter();
                    match (fields.next(), fields.next(), fields.next()) {
                        (
                            Some(Type::Basic(BasicType::DBusByte(code))),
                            Some(Type::Container(ContainerType::DBusVariant(variant))),
                            None,
                        ) => (code.u8, variant),
                        _ => return Err(UnmarshalError::InvalidHeader),
                    }
                }
                _ => return Err(UnmarshalError::InvalidHeader),
            };

            match HeaderField::from_code_and_variant(code, variant)? {
                Some(HeaderField::Signature(inner)) => signature = Some(inner),
                Some(field) => header_fields.push(field),
                // Unknown field code: tolerated and dropped.
                None => {}
            }
        }

        decoder
            .advance_to_boundary(8)
            .map_err(promote_eof_to_invalid_header)?;
        if decoder.position() != fixed.header_length() {
            return Err(UnmarshalError::InvalidHeader);
        }

        // The body is described by the SIGNATURE field. For an empty body
        // the field may be absent or present as the empty signature.
        let body_signature = signature.map(|inner| inner.vec).unwrap_or_default();
        if fixed.body_length == 0 && !body_signature.is_empty() {
            return Err(UnmarshalError::BodyLengthMismatch);
        }
        if fixed.body_length > 0 && body_signature.is_empty() {
            return Err(UnmarshalError::InvalidHeader);
        }

        let body = match Body::unmarshal(&mut decoder, &body_signature) {
            Ok(body) => body,
            // The frame is complete, so running out of bytes means the
            // declared body length was too short for its signature.
            Err(UnmarshalError::EarlyEof) => return Err(UnmarshalError::BodyLengthMismatch),
            Err(error) => return Err(error),
        };
        if decoder.position() != fixed.frame_length() {
            return Err(UnmarshalError::BodyLengthMismatch);
        }

        let serial = NonZeroU32::new(fixed.serial).ok_or(UnmarshalError::InvalidHeader)?;

        let message = Message {
            endianness: fixed.endianness,
            message_type: fixed.message_type,
            flag_no_reply_expected: fixed.flag_no_reply_expected,
            flag_no_auto_start: fixed.flag_no_auto_start,
            flag_allow_interactive_authorization: fixed.flag_allow_interactive_authorization,
            serial: Some(serial),
            header_fields,
            body,
        };

        Ok((message, fixed.frame_length()))
    }
}

/// Inside a complete frame, running out of bytes means the declared
/// lengths were inconsistent, not that more input is coming.
fn promote_eof_to_invalid_header(error: UnmarshalError) -> UnmarshalError {
    match error {
        UnmarshalError::EarlyEof => UnmarshalError::InvalidHeader,
        other => other,
    }
}

/// Prepare header fields to be marshalled: an array of struct
/// (byte, variant).
fn prepare_header_fields<T: IntoIterator<Item = HeaderField>>(header_fields: T) -> DBusArray {
    let mut array = DBusArray::new(HEADER_FIELD_SIGNATURE.clone());

    for header_field in header_fields {
        let code = DBusByte {
            u8: header_field.decimal_code(),
        };
        let variant = header_field.into_variant();
        let entry = DBusStruct::new(vec![code.into(), variant.into()]);

        array.push(entry);
    }

    array
}

/// Interface names: at least two nonempty `.`-separated elements of
/// `[A-Za-z_][A-Za-z0-9_]*`, at most 255 bytes.
pub fn validate_interface_name(name: &str) -> crate::Result<&str> {
    let elements: Vec<&str> = name.split('.').collect();

    let valid = name.len() <= 255
        && elements.len() >= 2
        && elements.iter().all(|element| is_valid_name_element(element, false));

    if valid {
        Ok(name)
    } else {
        Err(crate::Error::InvalidName(name.to_string()))
    }
}

/// Error names share the interface name grammar.
pub fn validate_error_name(name: &str) -> crate::Result<&str> {
    validate_interface_name(name).map_err(|_| crate::Error::InvalidName(name.to_string()))
}

/// Member names: one element, no periods, `[A-Za-z_][A-Za-z0-9_]*`, at
/// most 255 bytes.
pub fn validate_member_name(name: &str) -> crate::Result<&str> {
    if name.len() <= 255 && is_valid_name_element(name, false) {
        Ok(name)
    } else {
        Err(crate::Error::InvalidName(name.to_string()))
    }
}

/// Bus names: unique names start with `:` and may use digits anywhere;
/// well-known names follow the interface grammar with `-` also allowed.
pub fn validate_bus_name(name: &str) -> crate::Result<&str> {
    let (unique, rest) = match name.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let elements: Vec<&str> = rest.split('.').collect();

    let valid = name.len() <= 255
        && elements.len() >= 2
        && elements
            .iter()
            .all(|element| is_valid_bus_name_element(element, unique));

    if valid {
        Ok(name)
    } else {
        Err(crate::Error::InvalidName(name.to_string()))
    }
}

fn is_valid_name_element(element: &str, allow_leading_digit: bool) -> bool {
    let mut bytes = element.bytes();

    let leading_ok = match bytes.next() {
        Some(b) => b.is_ascii_alphabetic() || b == b'_' || (allow_leading_digit && b.is_ascii_digit()),
        None => false,
    };

    leading_ok && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_valid_bus_name_element(element: &str, allow_leading_digit: bool) -> bool {
    let mut bytes = element.bytes();

    let leading_ok = match bytes.next() {
        Some(b) => {
            b.is_ascii_alphabetic()
                || b == b'_'
                || b == b'-'
                || (allow_leading_digit && b.is_ascii_digit())
        }
        None => false,
    };

    leading_ok && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_system::signature::SingleCompleteTypeSignature;

    fn hello() -> Message {
        let mut message = Message::method_call(
            Some("org.freedesktop.DBus"),
            "/org/freedesktop/DBus",
            Some("org.freedesktop.DBus"),
            "Hello",
            Body::new(),
        )
        .unwrap();
        message.endianness = Endianness::LittleEndian;
        message.serial = NonZeroU32::new(1);
        message
    }

    #[test]
    fn hello_fixed_header_bytes() {
        let marshalled = hello().marshal().unwrap();

        // order=l, type=1, flags=0, ver=1, body-len=0, serial=1.
        assert_eq!(
            &marshalled[..12],
            &[0x6C, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
        // The whole frame is 8-aligned: the body is empty.
        assert_eq!(marshalled.len() % 8, 0);
    }

    #[test]
    fn hello_round_trips() {
        let message = hello();
        let marshalled = message.marshal().unwrap();
        let (decoded, consumed) = Message::unmarshal(&marshalled).unwrap();

        assert_eq!(consumed, marshalled.len());
        assert_eq!(decoded, message);

        assert_eq!(decoded.destination(), Some("org.freedesktop.DBus"));
        assert_eq!(decoded.path(), Some("/org/freedesktop/DBus"));
        assert_eq!(decoded.interface(), Some("org.freedesktop.DBus"));
        assert_eq!(decoded.member(), Some("Hello"));
    }

    #[test]
    fn message_with_body_round_trips() {
        for &endianness in &[Endianness::LittleEndian, Endianness::BigEndian] {
            let mut body = Body::new();
            body.push(DBusString::new("dbus-wire").unwrap());
            body.push(42u32);
            body.push(DBusVariant::new(true));

            let mut message = Message::method_call(
                Some("org.example.Peer"),
                "/org/example/Peer",
                None,
                "Configure",
                body,
            )
            .unwrap();
            message.endianness = endianness;
            message.serial = NonZeroU32::new(7);
            message.flag_no_auto_start = true;

            let marshalled = message.marshal().unwrap();
            let (decoded, consumed) = Message::unmarshal(&marshalled).unwrap();

            assert_eq!(consumed, marshalled.len());
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn empty_byte_array_body_is_four_null_bytes() {
        let mut body = Body::new();
        body.push(DBusArray::new(SingleCompleteTypeSignature::DBusByte));

        let mut message =
            Message::method_call(None, "/org/example", None, "TakeBytes", body).unwrap();
        message.endianness = Endianness::LittleEndian;
        message.serial = NonZeroU32::new(2);

        let marshalled = message.marshal().unwrap();
        let fixed = FixedHeader::unmarshal(&marshalled).unwrap();

        assert_eq!(fixed.body_length, 4);
        assert_eq!(&marshalled[fixed.header_length()..], &[0, 0, 0, 0]);

        let (decoded, _) = Message::unmarshal(&marshalled).unwrap();
        match &decoded.body.arguments[..] {
            [Type::Container(ContainerType::DBusArray(array))] => {
                assert_eq!(array.item_type, SingleCompleteTypeSignature::DBusByte);
                assert!(array.items.is_empty());
            }
            other => panic!("expected a single empty array, got {:?}", other),
        }
    }

    #[test]
    fn signature_field_is_omitted_for_an_empty_body() {
        let marshalled = hello().marshal().unwrap();
        let fixed = FixedHeader::unmarshal(&marshalled).unwrap();

        let frame = &marshalled[..fixed.frame_length()];
        let mut decoder = Decoder::new(frame, fixed.endianness);
        decoder.take(12).unwrap();
        let fields_array = DBusArray::unmarshal(&mut decoder, &HEADER_FIELD_SIGNATURE).unwrap();

        for entry in fields_array.items {
            if let Type::Container(ContainerType::DBusStruct(DBusStruct { fields })) = entry {
                if let Type::Basic(BasicType::DBusByte(code)) = &fields[0] {
                    assert_ne!(code.u8, 8, "no SIGNATURE field for an empty body");
                }
            }
        }
    }

    #[test]
    fn empty_signature_field_is_accepted_for_an_empty_body() {
        // Hand-build a frame that carries SIGNATURE present-but-empty.
        let mut encoder = Encoder::default();
        encoder.buf.push(Endianness::LittleEndian.ascii_code());
        encoder.buf.push(MessageType::MethodReturn.decimal_value());
        encoder.buf.push(0);
        encoder.buf.push(crate::MAJOR_PROTOCOL_VERSION);
        encoder.push_u32(0, Endianness::LittleEndian);
        encoder.push_u32(9, Endianness::LittleEndian);

        let fields = vec![
            HeaderField::ReplySerial(DBusUint32 { u32: 4 }),
            HeaderField::Signature(DBusSignature { vec: vec![] }),
        ];
        encoder
            .marshal(&prepare_header_fields(fields), Endianness::LittleEndian)
            .unwrap();
        encoder.align(8);
        let frame = encoder.finish();

        let (decoded, consumed) = Message::unmarshal(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded.message_type, MessageType::MethodReturn);
        assert_eq!(decoded.reply_serial(), Some(4));
        assert!(decoded.body.is_empty());
        // The empty field is not kept around.
        assert_eq!(decoded.header_fields.len(), 1);
    }

    #[test]
    fn short_buffers_ask_for_more_bytes() {
        let message = hello();
        let marshalled = message.marshal().unwrap();

        for len in 0..16 {
            assert_eq!(
                Message::unmarshal(&marshalled[..len]),
                Err(UnmarshalError::TruncatedHeaderFields),
                "prefix of {} bytes",
                len
            );
        }

        // Enough for the fixed header but not the fields array.
        assert_eq!(
            Message::unmarshal(&marshalled[..20]),
            Err(UnmarshalError::TruncatedHeaderFields)
        );

        // Everything except the last byte.
        assert_eq!(
            Message::unmarshal(&marshalled[..marshalled.len() - 1]),
            Err(UnmarshalError::TruncatedHeaderFields)
        );
    }

    #[test]
    fn truncated_body_is_reported_as_such() {
        let mut body = Body::new();
        body.push(1u32);
        let mut message =
            Message::method_call(None, "/org/example", None, "Poke", body).unwrap();
        message.endianness = Endianness::LittleEndian;
        message.serial = NonZeroU32::new(3);

        let marshalled = message.marshal().unwrap();
        let fixed = FixedHeader::unmarshal(&marshalled).unwrap();

        assert_eq!(
            Message::unmarshal(&marshalled[..fixed.header_length()]),
            Err(UnmarshalError::TruncatedBody)
        );
    }

    #[test]
    fn unknown_header_fields_are_skipped() {
        let mut encoder = Encoder::default();
        encoder.buf.push(Endianness::LittleEndian.ascii_code());
        encoder.buf.push(MessageType::Signal.decimal_value());
        encoder.buf.push(0);
        encoder.buf.push(crate::MAJOR_PROTOCOL_VERSION);
        encoder.push_u32(0, Endianness::LittleEndian);
        encoder.push_u32(5, Endianness::LittleEndian);

        // A made-up field code 200 next to real ones.
        let mut array = DBusArray::new(HEADER_FIELD_SIGNATURE.clone());
        array.push(DBusStruct::new(vec![
            DBusByte { u8: 200 }.into(),
            DBusVariant::new(99u32).into(),
        ]));
        array.push(DBusStruct::new(vec![
            DBusByte { u8: 3 }.into(),
            DBusVariant::new(DBusString::new("Ping").unwrap()).into(),
        ]));
        encoder.marshal(&array, Endianness::LittleEndian).unwrap();
        encoder.align(8);
        let frame = encoder.finish();

        let (decoded, _) = Message::unmarshal(&frame).unwrap();
        assert_eq!(decoded.member(), Some("Ping"));
        assert_eq!(decoded.header_fields.len(), 1);
    }

    #[test]
    fn serial_is_required_to_marshal() {
        let message = Message::method_call(None, "/org/example", None, "Poke", Body::new())
            .unwrap();
        assert!(matches!(
            message.marshal(),
            Err(crate::Error::MissingSerial)
        ));
    }

    #[test]
    fn zero_serial_is_rejected_on_decode() {
        let mut marshalled = hello().marshal().unwrap();
        // Zero out the serial word.
        for byte in &mut marshalled[8..12] {
            *byte = 0;
        }
        assert_eq!(
            Message::unmarshal(&marshalled),
            Err(UnmarshalError::InvalidHeader)
        );
    }

    #[test]
    fn name_validation() {
        assert!(validate_interface_name("org.freedesktop.DBus").is_ok());
        assert!(validate_interface_name("single").is_err());
        assert!(validate_interface_name("org..empty").is_err());
        assert!(validate_interface_name("org.9digit").is_err());
        assert!(validate_interface_name("org.with-dash").is_err());

        assert!(validate_member_name("Hello").is_ok());
        assert!(validate_member_name("With.Period").is_err());
        assert!(validate_member_name("9Lives").is_err());
        assert!(validate_member_name("").is_err());

        assert!(validate_bus_name("org.freedesktop.DBus").is_ok());
        assert!(validate_bus_name(":1.42").is_ok());
        assert!(validate_bus_name("com.example-corp.Service").is_ok());
        assert!(validate_bus_name("org.9digit").is_err());
        assert!(validate_bus_name("nodots").is_err());

        assert!(validate_error_name("org.freedesktop.DBus.Error.Failed").is_ok());
    }
}
