use crate::type_system::types::*;
use crate::type_system::unmarshal::UnmarshalError;

/// One `(code, variant)` entry of the header-fields array.
///
/// The variant's inner type is fixed per code; a mismatch on the wire is a
/// malformed header.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum HeaderField {
    Path(DBusObjectPath),
    Interface(DBusString),
    Member(DBusString),
    ErrorName(DBusString),
    ReplySerial(DBusUint32),
    Destination(DBusString),
    Sender(DBusString),
    Signature(DBusSignature),
    UnixFds(DBusUint32),
}

impl HeaderField {
    pub fn decimal_code(&self) -> u8 {
        match self {
            Self::Path(_) => 1,
            Self::Interface(_) => 2,
            Self::Member(_) => 3,
            Self::ErrorName(_) => 4,
            Self::ReplySerial(_) => 5,
            Self::Destination(_) => 6,
            Self::Sender(_) => 7,
            Self::Signature(_) => 8,
            Self::UnixFds(_) => 9,
        }
    }

    pub(crate) fn into_variant(self) -> DBusVariant {
        match self {
            Self::Path(inner) => DBusVariant::new(inner),
            Self::Interface(inner) => DBusVariant::new(inner),
            Self::Member(inner) => DBusVariant::new(inner),
            Self::ErrorName(inner) => DBusVariant::new(inner),
            Self::ReplySerial(inner) => DBusVariant::new(inner),
            Self::Destination(inner) => DBusVariant::new(inner),
            Self::Sender(inner) => DBusVariant::new(inner),
            Self::Signature(inner) => DBusVariant::new(inner),
            Self::UnixFds(inner) => DBusVariant::new(inner),
        }
    }

    /// Rebuild a typed field from a decoded `(code, variant)` entry.
    ///
    /// Codes this implementation does not know yield `Ok(None)`: their
    /// self-describing variant has already been consumed, and a client
    /// must tolerate fields added by future protocol revisions. Code 0 is
    /// explicitly invalid.
    pub(crate) fn from_code_and_variant(
        code: u8,
        variant: DBusVariant,
    ) -> Result<Option<Self>, UnmarshalError> {
        let value = *variant.variant;

        let field = match (code, value) {
            (1, Type::Basic(BasicType::DBusObjectPath(inner))) => Self::Path(inner),
            (2, Type::Basic(BasicType::DBusString(inner))) => Self::Interface(inner),
            (3, Type::Basic(BasicType::DBusString(inner))) => Self::Member(inner),
            (4, Type::Basic(BasicType::DBusString(inner))) => Self::ErrorName(inner),
            (5, Type::Basic(BasicType::DBusUint32(inner))) => Self::ReplySerial(inner),
            (6, Type::Basic(BasicType::DBusString(inner))) => Self::Destination(inner),
            (7, Type::Basic(BasicType::DBusString(inner))) => Self::Sender(inner),
            (8, Type::Basic(BasicType::DBusSignature(inner))) => Self::Signature(inner),
            (9, Type::Basic(BasicType::DBusUint32(inner))) => Self::UnixFds(inner),
            (1..=9, _) | (0, _) => return Err(UnmarshalError::InvalidHeader),
            (_, _) => return Ok(None),
        };

        Ok(Some(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        let field = HeaderField::ReplySerial(DBusUint32 { u32: 77 });
        assert_eq!(field.decimal_code(), 5);

        let rebuilt =
            HeaderField::from_code_and_variant(5, field.clone().into_variant()).unwrap();
        assert_eq!(rebuilt, Some(field));
    }

    #[test]
    fn mismatched_variant_type_is_invalid() {
        // PATH with a plain string inside the variant.
        let variant = DBusVariant::new(DBusString::new("/not/typed/as/path").unwrap());
        assert_eq!(
            HeaderField::from_code_and_variant(1, variant),
            Err(UnmarshalError::InvalidHeader)
        );
    }

    #[test]
    fn unknown_codes_are_skipped() {
        let variant = DBusVariant::new(1u32);
        assert_eq!(HeaderField::from_code_and_variant(42, variant), Ok(None));
    }

    #[test]
    fn code_zero_is_invalid() {
        let variant = DBusVariant::new(1u32);
        assert_eq!(
            HeaderField::from_code_and_variant(0, variant),
            Err(UnmarshalError::InvalidHeader)
        );
    }
}
