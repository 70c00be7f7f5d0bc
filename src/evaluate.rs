use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::coerce::{self, Operand};
use crate::compile::{Aggregate, Node, Source};
use crate::methods;
use crate::resolve::{MemberPath, Step};
use crate::types::{Quantifier, Reducer};
use crate::{NumericKind, Value};

/// Evaluate a compiled tree against `root`.
pub(crate) fn evaluate(node: &Node, root: &Value<'_>) -> bool {
    eval(node, root, root)
}

fn eval<'a>(node: &Node, root: &Value<'a>, current: &Value<'a>) -> bool {
    match node {
        Node::All {
            children,
            short_circuit: true,
        } => children.iter().all(|c| eval(c, root, current)),
        Node::All {
            children,
            short_circuit: false,
        } => children
            .iter()
            .fold(true, |acc, c| eval(c, root, current) & acc),
        Node::Any {
            children,
            short_circuit: true,
        } => children.iter().any(|c| eval(c, root, current)),
        Node::Any {
            children,
            short_circuit: false,
        } => children
            .iter()
            .fold(false, |acc, c| eval(c, root, current) | acc),
        Node::Compare {
            source,
            op,
            operand,
        } => {
            let left = match source {
                Source::Path(path) => read(path, current),
                Source::Aggregate(aggregate) => reduce(aggregate, root, current),
            };
            let Some(left) = left else {
                return false;
            };
            match operand {
                Operand::Constant(right) => left.compare(*op, right),
                Operand::Reference(path) => {
                    read(path, root).and_then(|right| left.compare(*op, &right))
                }
            }
            .unwrap_or(false)
        }
        Node::Regex { path, regex } => read(path, current)
            .as_ref()
            .and_then(text)
            .is_some_and(|t| regex.is_match(&t)),
        Node::Probe { path, kind } => read(path, current)
            .as_ref()
            .and_then(text)
            .is_some_and(|t| probe(*kind, &t)),
        Node::Quantified {
            path,
            quantifier,
            predicate,
        } => {
            let Some(Value::List(items)) = read(path, current) else {
                return false;
            };
            match (quantifier, predicate) {
                (_, None) => !items.is_empty(),
                (Quantifier::Any, Some(p)) => items.iter().any(|item| eval(p, root, item)),
                (Quantifier::All, Some(p)) => items.iter().all(|item| eval(p, root, item)),
            }
        }
        Node::Method { path, method } => {
            read(path, current).is_some_and(|receiver| methods::call(method, &receiver))
        }
    }
}

/// Walk `path` from `start`. `None` when the path breaks: a null or
/// missing parent, an absent member, or an index out of range.
pub(crate) fn read<'a>(path: &MemberPath, start: &Value<'a>) -> Option<Value<'a>> {
    let mut value = start.clone();
    for step in &path.steps {
        value = match (step, value) {
            (_, Value::Null) => return None,
            (Step::Member(name), Value::Record(record)) => record.member(name)?,
            (Step::Column { name, ty }, Value::Record(record)) => {
                coerce::conform(record.member(name)?, ty)?
            }
            (Step::Position(i), Value::List(items)) => items.into_iter().nth(*i)?,
            (Step::Position(i), Value::Map(entries)) => {
                let key = Value::Int(i64::try_from(*i).ok()?);
                lookup(entries, &key)?
            }
            (Step::Key(key), Value::Map(entries)) => lookup(entries, key)?,
            _ => return None,
        };
    }
    Some(value)
}

fn lookup<'a>(entries: Vec<(Value<'a>, Value<'a>)>, key: &Value<'_>) -> Option<Value<'a>> {
    entries
        .into_iter()
        .find(|(k, _)| k.loosely_eq(key))
        .map(|(_, v)| v)
}

/// String form used by `IsMatch` and the numeric probes.
fn text<'v>(value: &'v Value<'_>) -> Option<Cow<'v, str>> {
    match value {
        Value::Null | Value::Record(_) | Value::List(_) | Value::Map(_) => None,
        Value::String(s) => Some(Cow::Borrowed(&**s)),
        Value::Enum(e) => Some(Cow::Borrowed(e.name())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn probe(kind: NumericKind, text: &str) -> bool {
    let text = text.trim();
    match kind {
        NumericKind::Integer => text.parse::<i32>().is_ok(),
        NumericKind::Single => {
            ungrouped(text).is_some_and(|t| is_finite_spelling(&t) && t.parse::<f32>().is_ok())
        }
        NumericKind::Double => {
            ungrouped(text).is_some_and(|t| is_finite_spelling(&t) && t.parse::<f64>().is_ok())
        }
        // Plain positional notation only, no exponent.
        NumericKind::Decimal => ungrouped(text).is_some_and(|t| Decimal::from_str(&t).is_ok()),
    }
}

/// Strip `,` group separators from the integral digits. A separator in
/// the fraction or leading the number rejects the text, as does `_`.
fn ungrouped(text: &str) -> Option<Cow<'_, str>> {
    if text.contains('_') {
        return None;
    }
    if !text.contains(',') {
        return Some(Cow::Borrowed(text));
    }
    let (integral, fraction) = text.split_once('.').unwrap_or((text, ""));
    let digits = integral.trim_start_matches(['+', '-']);
    if fraction.contains(',') || digits.starts_with(',') {
        return None;
    }
    Some(Cow::Owned(text.replace(',', "")))
}

/// Rust's float parser also takes `inf`, `infinity` and `nan`.
fn is_finite_spelling(text: &str) -> bool {
    !text
        .trim_start_matches(['+', '-'])
        .starts_with(|c: char| c.is_ascii_alphabetic())
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

fn reduce<'a>(aggregate: &Aggregate, root: &Value<'a>, current: &Value<'a>) -> Option<Value<'a>> {
    let Value::List(items) = read(&aggregate.collection, current)? else {
        return None;
    };
    let selected = items.into_iter().filter(|item| {
        aggregate
            .filter
            .as_ref()
            .map_or(true, |f| eval(f, root, item))
    });
    if aggregate.reducer == Reducer::Count {
        return i64::try_from(selected.count()).ok().map(Value::Int);
    }
    let values: Vec<Value<'a>> = selected
        .filter_map(|item| read(&aggregate.projection, &item))
        .filter(|v| !v.is_null())
        .collect();
    match aggregate.reducer {
        Reducer::Count => None,
        Reducer::Sum => sum(&values),
        Reducer::Average => average(&values),
        Reducer::Min => extreme(values, Ordering::Less),
        Reducer::Max => extreme(values, Ordering::Greater),
    }
}

fn sum(values: &[Value<'_>]) -> Option<Value<'static>> {
    values
        .iter()
        .try_fold(Value::Int(0), |total, v| add(&total, v))
}

#[allow(clippy::cast_precision_loss)]
fn average(values: &[Value<'_>]) -> Option<Value<'static>> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    match sum(values)? {
        Value::Decimal(total) => total
            .checked_div(Decimal::from(count))
            .map(Value::Decimal),
        total => Some(Value::Float(as_f64(&total)? / count as f64)),
    }
}

fn add(a: &Value<'_>, b: &Value<'_>) -> Option<Value<'static>> {
    Some(match (a, b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(x.checked_add(*y)?),
        (Value::Decimal(x), Value::Decimal(y)) => Value::Decimal(x.checked_add(*y)?),
        (Value::Decimal(x), Value::Int(y)) | (Value::Int(y), Value::Decimal(x)) => {
            Value::Decimal(x.checked_add(Decimal::from(*y))?)
        }
        (x, y) => Value::Float(as_f64(x)? + as_f64(y)?),
    })
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value<'_>) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Decimal(v) => v.to_f64(),
        Value::String(s) => f64::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn extreme<'a>(values: Vec<Value<'a>>, keep: Ordering) -> Option<Value<'a>> {
    let mut values = values.into_iter();
    let mut best = values.next()?;
    for value in values {
        if value.partial_cmp_value(&best)? == keep {
            best = value;
        }
    }
    Some(best)
}
