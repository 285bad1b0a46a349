//! Type signatures.
//!
//! A signature is a string over the type-code alphabet describing a
//! sequence of values. Each element of that sequence is a "single complete
//! type": one of the basic codes, `v`, `a` followed by the element type,
//! a parenthesized struct, or `a{..}` for an array of dict entries.

pub mod signature_trait;

pub use signature_trait::Signature;

/// A signature may not be longer than 255 bytes.
pub const MAX_SIGNATURE_LENGTH: usize = 255;

/// Arrays may not be nested deeper than 32 levels.
pub const MAX_ARRAY_DEPTH: usize = 32;

/// Structs (and dict entries) may not be nested deeper than 32 levels.
pub const MAX_STRUCT_DEPTH: usize = 32;

lazy_static::lazy_static! {
    /// Element type of the header-fields array: a struct of a byte (the
    /// field code) and a variant (the field value).
    pub static ref HEADER_FIELD_SIGNATURE: SingleCompleteTypeSignature =
        SingleCompleteTypeSignature::DBusStruct {
            fields: vec![
                SingleCompleteTypeSignature::DBusByte,
                SingleCompleteTypeSignature::DBusVariant,
            ],
        };
}

/// Signature for a "Single Complete Type".
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum SingleCompleteTypeSignature {
    DBusByte,
    DBusBoolean,
    DBusInt16,
    DBusUint16,
    DBusInt32,
    DBusUint32,
    DBusInt64,
    DBusUint64,
    DBusDouble,
    DBusString,
    DBusObjectPath,
    DBusSignature,
    DBusUnixFileDescriptor,
    DBusVariant,
    DBusArray(Box<SingleCompleteTypeSignature>),
    DBusStruct {
        /// May not be empty.
        fields: Vec<SingleCompleteTypeSignature>,
    },
    DBusDictEntry {
        /// Must be a basic type, not a container type.
        key: Box<SingleCompleteTypeSignature>,
        value: Box<SingleCompleteTypeSignature>,
    },
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum SignatureError {
    #[error("signature ended in the middle of a type")]
    UnexpectedEnd,

    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,

    #[error("unmatched brace")]
    UnmatchedBrace,

    #[error("invalid type character: {0:?}")]
    InvalidTypeChar(char),

    #[error("extra characters after a single complete type")]
    ExtraCharacters,

    #[error("signature longer than {} bytes", MAX_SIGNATURE_LENGTH)]
    TooLong,

    #[error("container nesting deeper than {} levels", MAX_ARRAY_DEPTH)]
    TooDeep,

    #[error("empty struct")]
    EmptyStruct,

    #[error("dict entry key must be a basic type")]
    InvalidDictKey,
}

impl SingleCompleteTypeSignature {
    /// The leading type code.
    pub fn code(&self) -> u8 {
        match self {
            Self::DBusByte => b'y',
            Self::DBusBoolean => b'b',
            Self::DBusInt16 => b'n',
            Self::DBusUint16 => b'q',
            Self::DBusInt32 => b'i',
            Self::DBusUint32 => b'u',
            Self::DBusInt64 => b'x',
            Self::DBusUint64 => b't',
            Self::DBusDouble => b'd',
            Self::DBusString => b's',
            Self::DBusObjectPath => b'o',
            Self::DBusSignature => b'g',
            Self::DBusUnixFileDescriptor => b'h',
            Self::DBusVariant => b'v',
            Self::DBusArray(_) => b'a',
            Self::DBusStruct { .. } => b'(',
            Self::DBusDictEntry { .. } => b'{',
        }
    }

    /// Boundary this type is aligned to when marshalled.
    ///
    /// For arrays this is the boundary of the length prefix; the elements
    /// have their own alignment.
    pub fn marshalling_boundary(&self) -> usize {
        match self {
            Self::DBusByte => 1,
            Self::DBusBoolean => 4,
            Self::DBusInt16 => 2,
            Self::DBusUint16 => 2,
            Self::DBusInt32 => 4,
            Self::DBusUint32 => 4,
            Self::DBusInt64 => 8,
            Self::DBusUint64 => 8,
            Self::DBusDouble => 8,
            Self::DBusString => 4,
            Self::DBusObjectPath => 4,
            Self::DBusSignature => 1,
            Self::DBusUnixFileDescriptor => 4,
            Self::DBusVariant => 1,
            Self::DBusArray(_) => 4,
            Self::DBusStruct { .. } => 8,
            Self::DBusDictEntry { .. } => 8,
        }
    }

    /// Whether this is a basic (non-container) type.
    ///
    /// Only basic types may be dict entry keys.
    pub fn is_basic(&self) -> bool {
        !matches!(
            self,
            Self::DBusVariant
                | Self::DBusArray(_)
                | Self::DBusStruct { .. }
                | Self::DBusDictEntry { .. }
        )
    }

    /// The signature as ASCII bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::DBusArray(element) => {
                out.push(b'a');
                element.serialize_into(out);
            }
            Self::DBusStruct { fields } => {
                out.push(b'(');
                for field in fields {
                    field.serialize_into(out);
                }
                out.push(b')');
            }
            Self::DBusDictEntry { key, value } => {
                out.push(b'{');
                key.serialize_into(out);
                value.serialize_into(out);
                out.push(b'}');
            }
            basic => out.push(basic.code()),
        }
    }
}

/// Render a sequence of single complete types back into a signature string.
pub fn serialize_signature(signature: &[SingleCompleteTypeSignature]) -> String {
    let mut out = Vec::new();
    for single in signature {
        single.serialize_into(&mut out);
    }
    // The alphabet is ASCII.
    String::from_utf8(out).expect("signature is ASCII")
}

/// Parse a signature string into its sequence of single complete types.
pub fn parse_signature(
    input: &str,
) -> Result<Vec<SingleCompleteTypeSignature>, SignatureError> {
    if input.len() > MAX_SIGNATURE_LENGTH {
        return Err(SignatureError::TooLong);
    }

    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };

    let mut out = Vec::new();
    while parser.peek().is_some() {
        out.push(parser.parse_single(0, 0)?);
    }

    Ok(out)
}

/// Parse a signature that must contain exactly one single complete type,
/// as found inside a variant.
pub fn parse_single_signature(
    input: &str,
) -> Result<SingleCompleteTypeSignature, SignatureError> {
    if input.len() > MAX_SIGNATURE_LENGTH {
        return Err(SignatureError::TooLong);
    }

    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };

    let single = parser.parse_single(0, 0)?;

    if parser.peek().is_some() {
        return Err(SignatureError::ExtraCharacters);
    }

    Ok(single)
}

/// Character-by-character recursive descent over the signature alphabet,
/// tracking array and struct nesting.
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<u8, SignatureError> {
        let byte = self.peek().ok_or(SignatureError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }

    fn parse_single(
        &mut self,
        array_depth: usize,
        struct_depth: usize,
    ) -> Result<SingleCompleteTypeSignature, SignatureError> {
        match self.next()? {
            b'y' => Ok(SingleCompleteTypeSignature::DBusByte),
            b'b' => Ok(SingleCompleteTypeSignature::DBusBoolean),
            b'n' => Ok(SingleCompleteTypeSignature::DBusInt16),
            b'q' => Ok(SingleCompleteTypeSignature::DBusUint16),
            b'i' => Ok(SingleCompleteTypeSignature::DBusInt32),
            b'u' => Ok(SingleCompleteTypeSignature::DBusUint32),
            b'x' => Ok(SingleCompleteTypeSignature::DBusInt64),
            b't' => Ok(SingleCompleteTypeSignature::DBusUint64),
            b'd' => Ok(SingleCompleteTypeSignature::DBusDouble),
            b's' => Ok(SingleCompleteTypeSignature::DBusString),
            b'o' => Ok(SingleCompleteTypeSignature::DBusObjectPath),
            b'g' => Ok(SingleCompleteTypeSignature::DBusSignature),
            b'h' => Ok(SingleCompleteTypeSignature::DBusUnixFileDescriptor),
            b'v' => Ok(SingleCompleteTypeSignature::DBusVariant),
            b'a' => {
                if array_depth + 1 > MAX_ARRAY_DEPTH {
                    return Err(SignatureError::TooDeep);
                }

                if self.peek() == Some(b'{') {
                    self.pos += 1;
                    self.parse_dict_entry(array_depth + 1, struct_depth)
                } else {
                    let element = self.parse_single(array_depth + 1, struct_depth)?;
                    Ok(SingleCompleteTypeSignature::DBusArray(Box::new(element)))
                }
            }
            b'(' => {
                if struct_depth + 1 > MAX_STRUCT_DEPTH {
                    return Err(SignatureError::TooDeep);
                }

                let mut fields = Vec::new();
                loop {
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => {
                            fields.push(self.parse_single(array_depth, struct_depth + 1)?)
                        }
                        None => return Err(SignatureError::UnexpectedEnd),
                    }
                }

                if fields.is_empty() {
                    return Err(SignatureError::EmptyStruct);
                }

                Ok(SingleCompleteTypeSignature::DBusStruct { fields })
            }
            b')' => Err(SignatureError::UnmatchedParenthesis),
            // A dict entry is only legal directly under an array, where it
            // is consumed as part of the `a{` prefix above.
            b'{' | b'}' => Err(SignatureError::UnmatchedBrace),
            other => Err(SignatureError::InvalidTypeChar(other as char)),
        }
    }

    /// The `a{` prefix has been consumed; parse `basic type '}'`.
    fn parse_dict_entry(
        &mut self,
        array_depth: usize,
        struct_depth: usize,
    ) -> Result<SingleCompleteTypeSignature, SignatureError> {
        // Dict entries count towards the struct nesting limit.
        if struct_depth + 1 > MAX_STRUCT_DEPTH {
            return Err(SignatureError::TooDeep);
        }

        let key = self.parse_single(array_depth, struct_depth + 1)?;
        if !key.is_basic() {
            return Err(SignatureError::InvalidDictKey);
        }

        let value = self.parse_single(array_depth, struct_depth + 1)?;

        match self.next()? {
            b'}' => {}
            _ => return Err(SignatureError::UnmatchedBrace),
        }

        Ok(SingleCompleteTypeSignature::DBusArray(Box::new(
            SingleCompleteTypeSignature::DBusDictEntry {
                key: Box::new(key),
                value: Box::new(value),
            },
        )))
    }
}
