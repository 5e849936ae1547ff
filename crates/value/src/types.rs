// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The type model (§3.1): a tagged union plus an optional name and attribute set, with a
//! stable content-hash fingerprint identifying a type across processes.

use std::collections::BTreeMap;
use std::sync::Arc;

/// A compiled regular expression with its matching options, used by the `pattern` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternOptions {
    /// The raw regex source.
    pub source: String,
    /// Case-insensitive matching.
    pub case_insensitive: bool,
}

/// A dense, unique mapping from enumerator name to ordinal, used by the `enumeration` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Enumerator name, indexed by ordinal.
    names: Vec<String>,
}

impl Enumeration {
    /// Builds an enumeration from a dense, zero-based name list.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Returns the name for a given ordinal, if in range.
    #[must_use]
    pub fn name(&self, ordinal: u32) -> Option<&str> {
        self.names.get(ordinal as usize).map(String::as_str)
    }

    /// Returns the ordinal for a given name, if present.
    #[must_use]
    pub fn ordinal(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Number of enumerators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether this enumeration has no enumerators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One named field of a `record` type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: Type,
}

impl Field {
    /// Creates a new field.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The tagged union of scalar and compound types (§3.1).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool,
    /// A signed 64-bit integer.
    Int64,
    /// An unsigned 64-bit integer.
    Uint64,
    /// An IEEE-754 double.
    Double,
    /// A signed duration, in nanoseconds.
    Duration,
    /// A point in time, in UTC nanoseconds since the epoch.
    Time,
    /// A UTF-8 string.
    String,
    /// A compiled regular expression.
    Pattern(PatternOptions),
    /// An IPv4 or IPv6 address.
    Ip,
    /// An IPv4 or IPv6 network.
    Subnet,
    /// An opaque byte blob.
    Blob,
    /// A string that must be redacted from diagnostics and logs.
    Secret,
    /// A dense named-integer enumeration.
    Enumeration(Enumeration),
    /// A homogeneous, non-null-typed list.
    List(Arc<Type>),
    /// A homogeneous-keyed map with non-null-typed keys and values.
    Map(Arc<Type>, Arc<Type>),
    /// An ordered record of named fields.
    Record(Arc<Vec<Field>>),
}

/// A type: a `TypeKind` plus an optional stable name and string attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    /// The underlying tagged union.
    pub kind: TypeKind,
    /// Optional name (schema-level type alias).
    pub name: Option<String>,
    /// String attributes, e.g. `internal`.
    pub attributes: BTreeMap<String, Option<String>>,
}

impl Type {
    /// Creates an unnamed type with no attributes.
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns a copy of this type with the given name attached.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns a copy of this type with an attribute set (value `None` for a bare flag).
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        let _ = self.attributes.insert(key.into(), value);
        self
    }

    /// Whether this type carries the given attribute.
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Record field accessor; `None` if this is not a record type.
    #[must_use]
    pub fn as_record_fields(&self) -> Option<&[Field]> {
        match &self.kind {
            TypeKind::Record(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }

    /// Returns a stable content-hash fingerprint, independent of process or run, that
    /// identifies this type. Two structurally equal types always fingerprint the same.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        fingerprint_into(self, &mut hasher);
        let digest = hasher.finalize();
        let bytes: [u8; 8] = digest.as_bytes()[0..8].try_into().expect("8 bytes");
        u64::from_le_bytes(bytes)
    }

    /// Shorthand constructors for the common scalar types.
    #[must_use]
    pub fn null() -> Self {
        Self::new(TypeKind::Null)
    }
    /// Boolean type.
    #[must_use]
    pub fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }
    /// Signed 64-bit integer type.
    #[must_use]
    pub fn int64() -> Self {
        Self::new(TypeKind::Int64)
    }
    /// Unsigned 64-bit integer type.
    #[must_use]
    pub fn uint64() -> Self {
        Self::new(TypeKind::Uint64)
    }
    /// Double type.
    #[must_use]
    pub fn double() -> Self {
        Self::new(TypeKind::Double)
    }
    /// Duration type.
    #[must_use]
    pub fn duration() -> Self {
        Self::new(TypeKind::Duration)
    }
    /// Time type.
    #[must_use]
    pub fn time() -> Self {
        Self::new(TypeKind::Time)
    }
    /// String type.
    #[must_use]
    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }
    /// IP address type.
    #[must_use]
    pub fn ip() -> Self {
        Self::new(TypeKind::Ip)
    }
    /// Subnet type.
    #[must_use]
    pub fn subnet() -> Self {
        Self::new(TypeKind::Subnet)
    }
    /// Blob type.
    #[must_use]
    pub fn blob() -> Self {
        Self::new(TypeKind::Blob)
    }
    /// Secret string type.
    #[must_use]
    pub fn secret() -> Self {
        Self::new(TypeKind::Secret)
    }
    /// List type over a non-null element type.
    #[must_use]
    pub fn list(element: Type) -> Self {
        Self::new(TypeKind::List(Arc::new(element)))
    }
    /// Map type over non-null key and value types.
    #[must_use]
    pub fn map(key: Type, value: Type) -> Self {
        Self::new(TypeKind::Map(Arc::new(key), Arc::new(value)))
    }
    /// Record type over an ordered field list. Field names must be unique (§3.1 invariant).
    #[must_use]
    pub fn record(fields: Vec<Field>) -> Self {
        Self::new(TypeKind::Record(Arc::new(fields)))
    }
}

fn fingerprint_into(ty: &Type, hasher: &mut blake3::Hasher) {
    if let Some(name) = &ty.name {
        hasher.update(b"name:");
        hasher.update(name.as_bytes());
    }
    for (key, value) in &ty.attributes {
        hasher.update(b"attr:");
        hasher.update(key.as_bytes());
        if let Some(value) = value {
            hasher.update(value.as_bytes());
        }
    }
    match &ty.kind {
        TypeKind::Null => hasher.update(b"null"),
        TypeKind::Bool => hasher.update(b"bool"),
        TypeKind::Int64 => hasher.update(b"int64"),
        TypeKind::Uint64 => hasher.update(b"uint64"),
        TypeKind::Double => hasher.update(b"double"),
        TypeKind::Duration => hasher.update(b"duration"),
        TypeKind::Time => hasher.update(b"time"),
        TypeKind::String => hasher.update(b"string"),
        TypeKind::Pattern(opts) => hasher
            .update(b"pattern:")
            .update(opts.source.as_bytes())
            .update(&[opts.case_insensitive as u8]),
        TypeKind::Ip => hasher.update(b"ip"),
        TypeKind::Subnet => hasher.update(b"subnet"),
        TypeKind::Blob => hasher.update(b"blob"),
        TypeKind::Secret => hasher.update(b"secret"),
        TypeKind::Enumeration(e) => {
            hasher.update(b"enum:");
            for name in &e.names {
                hasher.update(name.as_bytes());
                hasher.update(b",");
            }
            hasher
        }
        TypeKind::List(elem) => {
            hasher.update(b"list:");
            fingerprint_into(elem, hasher);
            hasher
        }
        TypeKind::Map(key, value) => {
            hasher.update(b"map:");
            fingerprint_into(key, hasher);
            fingerprint_into(value, hasher);
            hasher
        }
        TypeKind::Record(fields) => {
            hasher.update(b"record:");
            for field in fields.iter() {
                hasher.update(field.name.as_bytes());
                hasher.update(b":");
                fingerprint_into(&field.ty, hasher);
            }
            hasher
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_equal_types_fingerprint_equal() {
        let a = Type::record(vec![Field::new("x", Type::int64())]);
        let b = Type::record(vec![Field::new("x", Type::int64())]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn differing_field_names_fingerprint_differently() {
        let a = Type::record(vec![Field::new("x", Type::int64())]);
        let b = Type::record(vec![Field::new("y", Type::int64())]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn name_participates_in_fingerprint() {
        let a = Type::string();
        let b = Type::string().named("hostname");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn enumeration_roundtrip() {
        let e = Enumeration::new(vec!["a".into(), "b".into()]);
        assert_eq!(e.ordinal("b"), Some(1));
        assert_eq!(e.name(1), Some("b"));
        assert_eq!(e.name(2), None);
    }
}
