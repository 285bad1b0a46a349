use crate::type_system::marshal::Encoder;
use crate::type_system::marshal::Marshal;
use crate::type_system::signature::Signature;
use crate::type_system::signature::SingleCompleteTypeSignature;
use crate::type_system::types::Type;
use crate::type_system::unmarshal::decoder::Decoder;
use crate::type_system::unmarshal::UnmarshalError;
use crate::type_system::Endianness;

/// The payload of a message: zero or more single complete values whose
/// joined signatures form the SIGNATURE header field.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Body {
    pub arguments: Vec<Type>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T>(&mut self, argument: T)
    where
        T: Into<Type>,
    {
        self.arguments.push(argument.into());
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn signature(&self) -> Vec<SingleCompleteTypeSignature> {
        self.arguments.iter().map(|arg| arg.signature()).collect()
    }

    /// Marshal into a fresh buffer. Bodies begin on an 8-byte boundary of
    /// the frame, so a fresh buffer keeps the alignment arithmetic right.
    pub fn marshal(&self, endianness: Endianness) -> crate::Result<Vec<u8>> {
        let mut encoder = Encoder::default();
        for argument in &self.arguments {
            encoder.marshal(argument, endianness)?;
        }
        Ok(encoder.finish())
    }

    pub(crate) fn unmarshal(
        decoder: &mut Decoder<'_>,
        signature: &[SingleCompleteTypeSignature],
    ) -> Result<Self, UnmarshalError> {
        let mut arguments = Vec::with_capacity(signature.len());
        for single in signature {
            arguments.push(Type::unmarshal(decoder, single)?);
        }
        Ok(Self { arguments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_system::types::DBusString;

    #[test]
    fn signature_joins_arguments() {
        let mut body = Body::new();
        body.push(DBusString::new("name").unwrap());
        body.push(7u32);

        assert_eq!(
            body.signature(),
            vec![
                SingleCompleteTypeSignature::DBusString,
                SingleCompleteTypeSignature::DBusUint32,
            ]
        );
    }

    #[test]
    fn round_trip() {
        let mut body = Body::new();
        body.push(1u8);
        body.push(2u64);

        let bytes = body.marshal(Endianness::LittleEndian).unwrap();
        let mut decoder = Decoder::new(&bytes, Endianness::LittleEndian);
        let decoded = Body::unmarshal(&mut decoder, &body.signature()).unwrap();

        assert_eq!(decoded, body);
        assert_eq!(decoder.remaining(), 0);
    }
}
