//! The D-Bus value model.
//!
//! One newtype per wire type, grouped into [BasicType] and
//! [ContainerType]. Values are plain owned data; equality and hashing are
//! structural, with doubles compared by IEEE-754 bit pattern so that e.g.
//! NaN payloads survive a round trip comparison.

use std::hash::Hash;
use std::hash::Hasher;

use super::signature::SingleCompleteTypeSignature;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Basic(BasicType),
    Container(ContainerType),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BasicType {
    DBusByte(DBusByte),
    DBusBoolean(DBusBoolean),
    DBusInt16(DBusInt16),
    DBusUint16(DBusUint16),
    DBusInt32(DBusInt32),
    DBusUint32(DBusUint32),
    DBusInt64(DBusInt64),
    DBusUint64(DBusUint64),
    DBusDouble(DBusDouble),
    DBusString(DBusString),
    DBusObjectPath(DBusObjectPath),
    DBusSignature(DBusSignature),
    DBusUnixFileDescriptor(DBusUnixFileDescriptor),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ContainerType {
    DBusArray(DBusArray),
    DBusStruct(DBusStruct),
    DBusVariant(DBusVariant),
    DBusDictEntry(DBusDictEntry),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusByte {
    pub u8: u8,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusBoolean {
    pub bool: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusInt16 {
    pub i16: i16,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusUint16 {
    pub u16: u16,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusInt32 {
    pub i32: i32,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusUint32 {
    pub u32: u32,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusInt64 {
    pub i64: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusUint64 {
    pub u64: u64,
}

#[derive(Debug, Clone)]
pub struct DBusDouble {
    pub f64: f64,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusString {
    pub string: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusObjectPath {
    pub dbus_string: DBusString,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusSignature {
    pub vec: Vec<SingleCompleteTypeSignature>,
}

/// An index into the out-of-band file descriptor list of a message.
///
/// Only the index is part of the wire format; descriptor transfer itself
/// happens outside of it and is not handled here.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusUnixFileDescriptor {
    pub index: u32,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusArray {
    pub item_type: SingleCompleteTypeSignature,
    pub items: Vec<Type>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusStruct {
    pub fields: Vec<Type>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusVariant {
    pub variant: Box<Type>,
}

/// A key-value pair, only legal as the element of an array. An array of
/// dict entries forms a mapping, in wire order.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DBusDictEntry {
    /// Must be a basic type, not a container type.
    pub key: BasicType,
    pub value: Box<Type>,
}

// Doubles compare and hash by bit pattern. This is what makes the rest of
// the value model derivable as Eq/Hash.
impl PartialEq for DBusDouble {
    fn eq(&self, other: &Self) -> bool {
        self.f64.to_bits() == other.f64.to_bits()
    }
}

impl Eq for DBusDouble {}

impl Hash for DBusDouble {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.f64.to_bits().hash(state);
    }
}

impl DBusString {
    pub fn new<T>(t: T) -> crate::Result<Self>
    where
        T: Into<String>,
    {
        let string = t.into();

        // Strings are length-prefixed but still NUL-terminated on the
        // wire, so an interior NUL cannot be represented.
        if string.contains('\u{0}') {
            return Err(crate::Error::InvalidName(string));
        }

        Ok(Self { string })
    }
}

impl DBusObjectPath {
    pub fn new<T>(t: T) -> crate::Result<Self>
    where
        T: Into<String>,
    {
        let string = t.into();

        if !is_valid_object_path(&string) {
            return Err(crate::Error::InvalidName(string));
        }

        Ok(Self {
            dbus_string: DBusString { string },
        })
    }

    pub fn as_str(&self) -> &str {
        &self.dbus_string.string
    }
}

/// Object paths: `/`, or `/`-separated nonempty elements of
/// `[A-Za-z0-9_]`, not ending in a slash.
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    if !path.starts_with('/') || path.ends_with('/') {
        return false;
    }

    path[1..].split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

impl DBusArray {
    pub fn new(item_type: SingleCompleteTypeSignature) -> Self {
        Self {
            item_type,
            items: Vec::new(),
        }
    }

    pub fn push<T>(&mut self, item: T)
    where
        T: Into<Type>,
    {
        self.items.push(item.into());
    }

    /// View a dict-entry array as its key-value pairs, in wire order.
    ///
    /// `None` when this is not an array of dict entries.
    pub fn pairs(&self) -> Option<Vec<(&BasicType, &Type)>> {
        if !matches!(
            self.item_type,
            SingleCompleteTypeSignature::DBusDictEntry { .. }
        ) {
            return None;
        }

        let mut pairs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                Type::Container(ContainerType::DBusDictEntry(entry)) => {
                    pairs.push((&entry.key, &*entry.value));
                }
                _ => return None,
            }
        }

        Some(pairs)
    }
}

impl DBusStruct {
    pub fn new(fields: Vec<Type>) -> Self {
        Self { fields }
    }
}

impl DBusVariant {
    pub fn new<T>(t: T) -> Self
    where
        T: Into<Type>,
    {
        Self {
            variant: Box::new(t.into()),
        }
    }
}

impl DBusDictEntry {
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<BasicType>,
        V: Into<Type>,
    {
        Self {
            key: key.into(),
            value: Box::new(value.into()),
        }
    }
}

impl From<BasicType> for Type {
    fn from(inner: BasicType) -> Self {
        Type::Basic(inner)
    }
}

impl From<ContainerType> for Type {
    fn from(inner: ContainerType) -> Self {
        Type::Container(inner)
    }
}

/// Conversions: Rust primitive -> newtype -> [BasicType] -> [Type].
macro_rules! impl_basic_conversions {
    ($name:ident, $rust:ty, $field:ident) => {
        impl From<$rust> for $name {
            fn from($field: $rust) -> Self {
                Self { $field }
            }
        }

        impl From<$rust> for Type {
            fn from(value: $rust) -> Self {
                Type::Basic(BasicType::$name($name::from(value)))
            }
        }

        impl From<$name> for BasicType {
            fn from(inner: $name) -> Self {
                BasicType::$name(inner)
            }
        }

        impl From<$name> for Type {
            fn from(inner: $name) -> Self {
                Type::Basic(BasicType::$name(inner))
            }
        }
    };
}

impl_basic_conversions!(DBusByte, u8, u8);
impl_basic_conversions!(DBusBoolean, bool, bool);
impl_basic_conversions!(DBusInt16, i16, i16);
impl_basic_conversions!(DBusUint16, u16, u16);
impl_basic_conversions!(DBusInt32, i32, i32);
impl_basic_conversions!(DBusUint32, u32, u32);
impl_basic_conversions!(DBusInt64, i64, i64);
impl_basic_conversions!(DBusUint64, u64, u64);
impl_basic_conversions!(DBusDouble, f64, f64);

/// Conversions for the basic newtypes without a blanket primitive source.
macro_rules! impl_basic_wrapping {
    ($name:ident) => {
        impl From<$name> for BasicType {
            fn from(inner: $name) -> Self {
                BasicType::$name(inner)
            }
        }

        impl From<$name> for Type {
            fn from(inner: $name) -> Self {
                Type::Basic(BasicType::$name(inner))
            }
        }
    };
}

impl_basic_wrapping!(DBusString);
impl_basic_wrapping!(DBusObjectPath);
impl_basic_wrapping!(DBusSignature);
impl_basic_wrapping!(DBusUnixFileDescriptor);

macro_rules! impl_container_wrapping {
    ($name:ident) => {
        impl From<$name> for ContainerType {
            fn from(inner: $name) -> Self {
                ContainerType::$name(inner)
            }
        }

        impl From<$name> for Type {
            fn from(inner: $name) -> Self {
                Type::Container(ContainerType::$name(inner))
            }
        }
    };
}

impl_container_wrapping!(DBusArray);
impl_container_wrapping!(DBusStruct);
impl_container_wrapping!(DBusVariant);
impl_container_wrapping!(DBusDictEntry);
