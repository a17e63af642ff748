use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Codes of the built-in serializers as carried in `serializer_code`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum SerializerCode {
    Bitcode = 1,
    Json = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializerError {
    /// The frame names a serializer this side does not have.
    #[error("unknown serializer")]
    UnknownSerializer(u8),

    #[error("serialize failed: {0}")]
    Encode(String),

    #[error("deserialize failed: {0}")]
    Decode(String),
}

/// Turns typed values into payload bytes and back.
///
/// Not object-safe: servers that accept several encodings hold them in a
/// [`SerializerSet`] instead of a trait object.
pub trait Serializer: Clone + Default + Send + Sync + 'static {
    fn code(&self) -> u8;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BitcodeSerializer;

impl Serializer for BitcodeSerializer {
    fn code(&self) -> u8 {
        SerializerCode::Bitcode.into()
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        bitcode::serialize(value).map_err(|e| SerializerError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        bitcode::deserialize(bytes).map_err(|e| SerializerError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn code(&self) -> u8 {
        SerializerCode::Json.into()
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        serde_json::to_vec(value).map_err(|e| SerializerError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        serde_json::from_slice(bytes).map_err(|e| SerializerError::Decode(e.to_string()))
    }
}

/// A fixed group of serializers selected by code at dispatch time.
///
/// Implemented for tuples of up to three [`Serializer`]s. When two members
/// share a code the first one wins.
pub trait SerializerSet: Clone + Default + Send + Sync + 'static {
    fn encode_with<T: Serialize>(&self, code: u8, value: &T) -> Result<Vec<u8>, SerializerError>;

    fn decode_with<T: DeserializeOwned>(&self, code: u8, bytes: &[u8])
    -> Result<T, SerializerError>;

    fn supports(&self, code: u8) -> bool;
}

macro_rules! impl_serializer_set {
    ($($idx:tt => $ser:ident),+) => {
        impl<$($ser: Serializer),+> SerializerSet for ($($ser,)+) {
            fn encode_with<T: Serialize>(
                &self,
                code: u8,
                value: &T,
            ) -> Result<Vec<u8>, SerializerError> {
                $(
                    if self.$idx.code() == code {
                        return self.$idx.encode(value);
                    }
                )+
                Err(SerializerError::UnknownSerializer(code))
            }

            fn decode_with<T: DeserializeOwned>(
                &self,
                code: u8,
                bytes: &[u8],
            ) -> Result<T, SerializerError> {
                $(
                    if self.$idx.code() == code {
                        return self.$idx.decode(bytes);
                    }
                )+
                Err(SerializerError::UnknownSerializer(code))
            }

            fn supports(&self, code: u8) -> bool {
                false $(|| self.$idx.code() == code)+
            }
        }
    };
}

impl_serializer_set!(0 => A);
impl_serializer_set!(0 => A, 1 => B);
impl_serializer_set!(0 => A, 1 => B, 2 => C);

/// The serializers a server accepts unless told otherwise.
pub type DefaultSerializers = (BitcodeSerializer, JsonSerializer);
