use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::parse::{self, TimeOffset, TimeUnit, NOW_PREFIX};
use crate::resolve::{self, MemberPath};
use crate::types::EnumValue;
use crate::{Literal, RuleError, Value, ValueType};

/// Prefix marking a target value as a path into the same root instance.
pub(crate) const SELF_PREFIX: &str = "*.";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Constant(Value<'static>),
    /// Re-read from the root instance on every evaluation.
    Reference(MemberPath),
}

/// Turn a rule's target value into an operand for a member of type `ty`.
pub(crate) fn operand(
    literal: &Literal,
    ty: &ValueType,
    root: &ValueType,
    now: NaiveDateTime,
) -> Result<Operand, RuleError> {
    if let Some(path) = literal.as_str().and_then(|s| s.strip_prefix(SELF_PREFIX)) {
        return resolve::resolve(root, Some(path)).map(Operand::Reference);
    }
    coerce(literal, ty, now).map(Operand::Constant)
}

/// Convert a literal into a value of type `ty`.
pub(crate) fn coerce(
    literal: &Literal,
    ty: &ValueType,
    now: NaiveDateTime,
) -> Result<Value<'static>, RuleError> {
    if literal.is_null()
        || literal
            .as_str()
            .is_some_and(|s| s.eq_ignore_ascii_case("null"))
    {
        return Ok(Value::Null);
    }
    let target = ty.underlying();
    if let Some(text) = literal.as_str().filter(|s| s.starts_with(NOW_PREFIX)) {
        return relative_time(text, target, now);
    }
    if let ValueType::Enum(enum_type) = target {
        let parsed = match literal {
            Literal::String(name) => EnumValue::named(enum_type, name),
            Literal::Int(ordinal) => usize::try_from(*ordinal)
                .ok()
                .filter(|o| *o < enum_type.variants().len())
                .map(|o| EnumValue::new(enum_type, o)),
            _ => None,
        };
        return parsed
            .map(Value::Enum)
            .ok_or_else(|| RuleError::EnumParseError {
                value: literal.text().into_owned(),
                enum_name: enum_type.name().to_owned(),
            });
    }
    convert(literal, target).ok_or_else(|| RuleError::TypeConversionError {
        value: literal.text().into_owned(),
        target: ty.to_string(),
    })
}

fn relative_time(
    text: &str,
    target: &ValueType,
    now: NaiveDateTime,
) -> Result<Value<'static>, RuleError> {
    let bad = |reason: String| RuleError::BadTimeLiteral {
        literal: text.to_owned(),
        reason,
    };
    if !matches!(target, ValueType::DateTime | ValueType::Any) {
        return Err(bad(format!("{target} is not a date/time type")));
    }
    let offset = parse::parse_relative_time(text).map_err(|e| bad(e.message().to_owned()))?;
    shift(now, offset)
        .map(Value::DateTime)
        .ok_or_else(|| bad("result is out of range".to_owned()))
}

/// Apply a relative time offset to `now`.
pub(crate) fn shift(now: NaiveDateTime, offset: TimeOffset) -> Option<NaiveDateTime> {
    let amount = i64::from(offset.amount);
    let delta = match offset.unit {
        TimeUnit::Seconds => TimeDelta::try_seconds(amount)?,
        TimeUnit::Minutes => TimeDelta::try_minutes(amount)?,
        TimeUnit::Hours => TimeDelta::try_hours(amount)?,
        TimeUnit::Days => TimeDelta::try_days(amount)?,
        TimeUnit::Years => {
            let months = Months::new(offset.amount.checked_mul(12)?);
            return if offset.negative {
                now.checked_sub_months(months)
            } else {
                now.checked_add_months(months)
            };
        }
    };
    if offset.negative {
        now.checked_sub_signed(delta)
    } else {
        now.checked_add_signed(delta)
    }
}

/// General literal conversion. `None` when the literal has no sensible
/// reading as `target`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(crate) fn convert(literal: &Literal, target: &ValueType) -> Option<Value<'static>> {
    match (target, literal) {
        (_, Literal::Null) => Some(Value::Null),
        (ValueType::Any, Literal::Bool(v)) => Some(Value::Bool(*v)),
        (ValueType::Any, Literal::Int(v)) => Some(Value::Int(*v)),
        (ValueType::Any, Literal::Float(v)) => Some(Value::Float(*v)),
        (ValueType::Bool, Literal::Bool(v)) => Some(Value::Bool(*v)),
        (ValueType::Bool, Literal::Int(v)) => Some(Value::Bool(*v != 0)),
        (ValueType::Int, Literal::Int(v)) => Some(Value::Int(*v)),
        (ValueType::Int, Literal::Bool(v)) => Some(Value::Int(i64::from(*v))),
        (ValueType::Int, Literal::Float(v)) if v.fract() == 0.0 && v.abs() < 9.0e18 => {
            Some(Value::Int(*v as i64))
        }
        (ValueType::Float, Literal::Int(v)) => Some(Value::Float(*v as f64)),
        (ValueType::Float, Literal::Float(v)) => Some(Value::Float(*v)),
        (ValueType::Decimal, Literal::Int(v)) => Some(Value::Decimal(Decimal::from(*v))),
        (ValueType::Decimal, Literal::Float(v)) => parse_decimal(&v.to_string()).map(Value::Decimal),
        (ValueType::String, Literal::Bool(_) | Literal::Int(_) | Literal::Float(_)) => {
            Some(Value::String(Cow::Owned(literal.text().into_owned())))
        }
        (target, Literal::String(text)) => convert_text(text, target),
        _ => None,
    }
}

/// Parse text as a value of `target`.
pub(crate) fn convert_text(text: &str, target: &ValueType) -> Option<Value<'static>> {
    let trimmed = text.trim();
    match target.underlying() {
        ValueType::String | ValueType::Any => Some(Value::String(Cow::Owned(text.to_owned()))),
        ValueType::Bool => parse_bool(trimmed).map(Value::Bool),
        ValueType::Int => trimmed.parse().ok().map(Value::Int),
        ValueType::Float => trimmed.parse().ok().map(Value::Float),
        ValueType::Decimal => parse_decimal(trimmed).map(Value::Decimal),
        ValueType::DateTime => parse_datetime(trimmed).map(Value::DateTime),
        ValueType::Guid => Uuid::parse_str(trimmed).ok().map(Value::Guid),
        ValueType::Enum(enum_type) => EnumValue::named(enum_type, trimmed).map(Value::Enum),
        _ => None,
    }
}

/// Bring a value read at runtime (a row cell) in line with its declared type.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn conform<'a>(value: Value<'a>, ty: &ValueType) -> Option<Value<'a>> {
    match (ty.underlying(), value) {
        (_, Value::Null) => Some(Value::Null),
        (ValueType::Any, v)
        | (ValueType::Bool, v @ Value::Bool(_))
        | (ValueType::Int, v @ Value::Int(_))
        | (ValueType::Float, v @ Value::Float(_))
        | (ValueType::Decimal, v @ Value::Decimal(_))
        | (ValueType::String, v @ Value::String(_))
        | (ValueType::DateTime, v @ Value::DateTime(_))
        | (ValueType::Guid, v @ Value::Guid(_)) => Some(v),
        (ValueType::Enum(e), Value::Enum(v)) if std::ptr::eq(v.enum_type(), *e) => {
            Some(Value::Enum(v))
        }
        (ValueType::Float, Value::Int(v)) => Some(Value::Float(v as f64)),
        (ValueType::Decimal, Value::Int(v)) => Some(Value::Decimal(Decimal::from(v))),
        (ValueType::Decimal, Value::Float(v)) => parse_decimal(&v.to_string()).map(Value::Decimal),
        (ValueType::String, Value::Int(v)) => Some(Value::String(Cow::Owned(v.to_string()))),
        (target, Value::String(text)) => convert_text(&text, target),
        _ => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
