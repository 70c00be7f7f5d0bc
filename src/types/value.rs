use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::operator::CompareOp;
use super::record::Record;
use super::value_type::EnumType;

/// A runtime value read from an instance while a predicate evaluates.
///
/// `Value` borrows from the instance it was read from, so reading a string
/// member or walking into a child record never clones the underlying data.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// An explicit null: `None`, a null reference, or a null row cell.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(Cow<'a, str>),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    Enum(EnumValue),
    Record(&'a dyn Record),
    List(Vec<Value<'a>>),
    Map(Vec<(Value<'a>, Value<'a>)>),
}

/// One variant of an [`EnumType`].
#[derive(Debug, Clone, Copy)]
pub struct EnumValue {
    ty: &'static EnumType,
    ordinal: usize,
}

impl EnumValue {
    #[must_use]
    pub fn new(ty: &'static EnumType, ordinal: usize) -> Self {
        Self { ty, ordinal }
    }

    /// Look a variant up by its exact name.
    #[must_use]
    pub fn named(ty: &'static EnumType, variant: &str) -> Option<Self> {
        ty.ordinal(variant).map(|ordinal| Self { ty, ordinal })
    }

    #[must_use]
    pub fn enum_type(&self) -> &'static EnumType {
        self.ty
    }

    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.ty.variants().get(self.ordinal).copied().unwrap_or("?")
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ty, other.ty) && self.ordinal == other.ordinal
    }
}

impl<'a> Value<'a> {
    /// Wrap a slice of records as a list value.
    #[must_use]
    pub fn records<T: Record>(items: &'a [T]) -> Self {
        Value::List(items.iter().map(|item| Value::Record(item)).collect())
    }

    /// Build a list value from anything convertible into values.
    #[must_use]
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value<'a>>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Detach this value from the instance it was borrowed from.
    ///
    /// Returns `None` for record references, which cannot outlive their owner.
    #[must_use]
    pub fn into_owned(self) -> Option<Value<'static>> {
        Some(match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(v),
            Value::Int(v) => Value::Int(v),
            Value::Float(v) => Value::Float(v),
            Value::Decimal(v) => Value::Decimal(v),
            Value::String(v) => Value::String(Cow::Owned(v.into_owned())),
            Value::DateTime(v) => Value::DateTime(v),
            Value::Guid(v) => Value::Guid(v),
            Value::Enum(v) => Value::Enum(v),
            Value::Record(_) => return None,
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::into_owned)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Some((k.into_owned()?, v.into_owned()?)))
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// Compare this value to another using the given operator.
    ///
    /// Null compares equal only to null and is never ordered against anything.
    /// Returns `None` for incompatible types or unsupported operations
    /// (ordering bools or GUIDs, comparing records).
    #[must_use]
    pub fn compare(&self, op: CompareOp, other: &Value<'_>) -> Option<bool> {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Some(op == CompareOp::Eq),
            (true, false) | (false, true) => return Some(op == CompareOp::Neq),
            (false, false) => {}
        }
        if op.is_ordering() && !self.is_ordered() {
            return None;
        }
        let ord = self.partial_cmp_value(other)?;
        Some(match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        })
    }

    /// Equality used for keyed lookups and `Contains`.
    pub(crate) fn loosely_eq(&self, other: &Value<'_>) -> bool {
        self.compare(CompareOp::Eq, other).unwrap_or(false)
    }

    fn is_ordered(&self) -> bool {
        !matches!(self, Value::Bool(_) | Value::Guid(_))
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn partial_cmp_value(&self, other: &Value<'_>) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Int(b)) => a.partial_cmp(&Decimal::from(*b)),
            (Value::Int(a), Value::Decimal(b)) => Decimal::from(*a).partial_cmp(b),
            (Value::Decimal(a), Value::Float(b)) => a.to_f64()?.partial_cmp(b),
            (Value::Float(a), Value::Decimal(b)) => a.partial_cmp(&b.to_f64()?),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.as_ref().partial_cmp(b.as_ref()),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.partial_cmp(b),
            (Value::Enum(a), Value::Enum(b)) if std::ptr::eq(a.ty, b.ty) => {
                a.ordinal.partial_cmp(&b.ordinal)
            }
            _ => None,
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Record(a), Value::Record(b)) => {
                std::ptr::addr_eq(*a as *const dyn Record, *b as *const dyn Record)
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (a, b) => {
                std::mem::discriminant(a) == std::mem::discriminant(b)
                    && a.partial_cmp_value(b) == Some(Ordering::Equal)
            }
        }
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Decimal> for Value<'_> {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value<'_> {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value<'_> {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<EnumValue> for Value<'_> {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::String(Cow::Borrowed(v))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(v: &'a String) -> Self {
        Value::String(Cow::Borrowed(v.as_str()))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::String(Cow::Owned(v))
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Guid(v) => write!(f, "{v}"),
            Value::Enum(v) => write!(f, "{}.{}", v.ty.name(), v.name()),
            Value::Record(r) => write!(f, "{r:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
