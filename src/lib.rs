//! Pure-Rust client side of the D-Bus wire protocol.
//!
//! DBus Specification:
//! https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling
//!
//! Three pieces make up the crate:
//!
//! - [type_system]: the D-Bus type system, with marshalling and
//!   unmarshalling of values against the alignment rules.
//! - [message_protocol]: messages (header, header fields, body) and the
//!   frame codec.
//! - [connection]: the SASL-style authentication handshake and the
//!   connection that multiplexes method calls, replies and signals over
//!   one stream transport.

pub mod connection;
pub mod message_protocol;
pub mod type_system;

pub use connection::auth::AuthMechanism;
pub use connection::Config;
pub use connection::Connection;
pub use connection::Handle;
pub use connection::Replies;
pub use message_protocol::Body;
pub use message_protocol::Message;
pub use message_protocol::MessageType;
pub use type_system::signature::SignatureError;
pub use type_system::unmarshal::UnmarshalError;
pub use type_system::Endianness;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A length did not fit the width its wire representation gives it.
    #[error(transparent)]
    TryFromIntError(#[from] std::num::TryFromIntError),

    #[error(transparent)]
    Signature(#[from] type_system::signature::SignatureError),

    #[error(transparent)]
    Unmarshal(#[from] type_system::unmarshal::UnmarshalError),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("message has no serial")]
    MissingSerial,

    #[error("failed AUTH: {0}")]
    InvalidAuthCommand(String),

    #[error("not connected")]
    NotConnected,

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

pub const MAJOR_PROTOCOL_VERSION: u8 = 1;
