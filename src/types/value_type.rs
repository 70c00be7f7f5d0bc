use std::fmt;

use super::record::RecordType;

/// Declared type of a member, as seen by the rule compiler.
///
/// This is the compile-time half of the data model: member paths are
/// resolved against `ValueType`s, literals are coerced to them, and the
/// [`describe`](crate::describe) catalog is derived from them.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Decimal,
    String,
    DateTime,
    Guid,
    Enum(&'static EnumType),
    Nullable(Box<ValueType>),
    Array(Box<ValueType>),
    List(Box<ValueType>),
    Map(Box<ValueType>, Box<ValueType>),
    Record(RecordRef),
    /// A string-keyed row whose columns are only typed by the rule itself.
    Row,
    /// Unknown at compile time; checks happen against the runtime value.
    Any,
}

static ANY: ValueType = ValueType::Any;

/// A closed set of named variants. Values compare by declaration order.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumType {
    name: &'static str,
    variants: &'static [&'static str],
}

impl EnumType {
    #[must_use]
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn variants(&self) -> &'static [&'static str] {
        self.variants
    }

    /// Case-sensitive lookup of a variant's ordinal.
    #[must_use]
    pub fn ordinal(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == variant)
    }
}

/// Lazily dereferenced handle to a [`RecordType`].
///
/// Holding a function instead of the descriptor itself lets record types
/// refer to each other (or to themselves) without initialization cycles.
#[derive(Clone, Copy)]
pub struct RecordRef(fn() -> &'static RecordType);

impl RecordRef {
    #[must_use]
    pub const fn new(get: fn() -> &'static RecordType) -> Self {
        Self(get)
    }

    #[must_use]
    pub fn get(&self) -> &'static RecordType {
        (self.0)()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.get(), other.get())
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordRef({})", self.get().name())
    }
}

impl ValueType {
    #[must_use]
    pub fn nullable(inner: ValueType) -> Self {
        ValueType::Nullable(Box::new(inner))
    }

    #[must_use]
    pub fn list(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    #[must_use]
    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    #[must_use]
    pub fn map(key: ValueType, value: ValueType) -> Self {
        ValueType::Map(Box::new(key), Box::new(value))
    }

    #[must_use]
    pub fn record(get: fn() -> &'static RecordType) -> Self {
        ValueType::Record(RecordRef::new(get))
    }

    /// The type with any `Nullable` wrapper removed.
    #[must_use]
    pub fn underlying(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    /// Element type of an array or list.
    #[must_use]
    pub fn element(&self) -> Option<&ValueType> {
        match self.underlying() {
            ValueType::Array(e) | ValueType::List(e) => Some(e),
            ValueType::Any => Some(&ANY),
            _ => None,
        }
    }

    /// Scalars: everything that compares directly against a literal.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        matches!(
            self.underlying(),
            ValueType::Bool
                | ValueType::Int
                | ValueType::Float
                | ValueType::Decimal
                | ValueType::String
                | ValueType::DateTime
                | ValueType::Guid
                | ValueType::Enum(_)
        )
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.underlying(),
            ValueType::Int | ValueType::Float | ValueType::Decimal | ValueType::Any
        )
    }

    /// Parse a declared column type name.
    ///
    /// Accepts Rust spellings (`i64`, `String`, `Option<f64>`), CLR spellings
    /// (`System.Int32`, ``System.Nullable`1[System.Int32]``) and short aliases
    /// (`int`, `string`, `decimal?`). Matching is case-insensitive.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<ValueType> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix('?') {
            return Self::from_type_name(inner).map(ValueType::nullable);
        }
        if let Some(inner) = name
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Self::from_type_name(inner).map(ValueType::nullable);
        }
        if let Some(inner) = name
            .strip_prefix("System.Nullable`1[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            // Assembly-qualified arguments look like `[System.Int32, mscorlib, ...]`.
            let inner = inner.trim_start_matches('[');
            let inner = inner.split(',').next().unwrap_or(inner);
            return Self::from_type_name(inner).map(ValueType::nullable);
        }

        let lower = name.to_ascii_lowercase();
        let short = lower.strip_prefix("system.").unwrap_or(&lower);
        let ty = match short {
            "bool" | "boolean" => ValueType::Bool,
            "int" | "long" | "short" | "byte" | "sbyte" | "uint" | "ulong" | "ushort"
            | "int16" | "int32" | "int64" | "uint16" | "uint32" | "uint64" | "i8" | "i16"
            | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" => ValueType::Int,
            "float" | "double" | "single" | "f32" | "f64" => ValueType::Float,
            "decimal" => ValueType::Decimal,
            "string" | "str" | "&str" => ValueType::String,
            "datetime" | "naivedatetime" => ValueType::DateTime,
            "guid" | "uuid" => ValueType::Guid,
            "object" | "any" => ValueType::Any,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::String => write!(f, "string"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Guid => write!(f, "guid"),
            ValueType::Enum(e) => write!(f, "{}", e.name()),
            ValueType::Nullable(inner) => write!(f, "{inner}?"),
            ValueType::Array(e) => write!(f, "{e}[]"),
            ValueType::List(e) => write!(f, "List<{e}>"),
            ValueType::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            ValueType::Record(r) => write!(f, "{}", r.get().name()),
            ValueType::Row => write!(f, "DataRow"),
            ValueType::Any => write!(f, "any"),
        }
    }
}
