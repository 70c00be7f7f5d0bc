use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDateTime;

use crate::coerce;
use crate::{Literal, MethodInfo, RuleError, Value, ValueType};

/// Methods available on primitive receivers without a [`Record`](crate::Record) impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    StartsWith,
    EndsWith,
    Contains,
    Equals,
    IsEmpty,
    ListContains,
    ContainsKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    Text,
    Sequence,
    Map,
}

#[derive(Debug)]
struct Entry {
    builtin: Builtin,
    receiver: Receiver,
    arity: usize,
}

static BUILTINS: LazyLock<HashMap<&'static str, Vec<Entry>>> = LazyLock::new(|| {
    let entries = [
        ("StartsWith", Builtin::StartsWith, Receiver::Text, 1),
        ("EndsWith", Builtin::EndsWith, Receiver::Text, 1),
        ("Contains", Builtin::Contains, Receiver::Text, 1),
        ("Equals", Builtin::Equals, Receiver::Text, 1),
        ("IsEmpty", Builtin::IsEmpty, Receiver::Text, 0),
        ("Contains", Builtin::ListContains, Receiver::Sequence, 1),
        ("ContainsKey", Builtin::ContainsKey, Receiver::Map, 1),
    ];
    let mut table: HashMap<&'static str, Vec<Entry>> = HashMap::new();
    for (name, builtin, receiver, arity) in entries {
        table.entry(name).or_default().push(Entry {
            builtin,
            receiver,
            arity,
        });
    }
    table
});

#[derive(Debug, Clone)]
pub(crate) enum MethodTarget {
    Builtin(Builtin),
    /// Declared on a record type, dispatched through `Record::invoke`.
    Record(String),
    /// Receiver type unknown until evaluation.
    Dynamic(String),
}

/// A method resolved against its receiver type, with coerced arguments.
#[derive(Debug, Clone)]
pub(crate) struct BoundMethod {
    pub(crate) target: MethodTarget,
    pub(crate) args: Vec<Value<'static>>,
}

fn receiver_kind(ty: &ValueType) -> Option<Receiver> {
    match ty.underlying() {
        ValueType::String => Some(Receiver::Text),
        ValueType::Array(_) | ValueType::List(_) => Some(Receiver::Sequence),
        ValueType::Map(..) => Some(Receiver::Map),
        _ => None,
    }
}

fn builtin_info(name: &str, entry: &Entry, receiver: &ValueType) -> MethodInfo {
    let params = match (entry.receiver, receiver.underlying()) {
        (_, _) if entry.arity == 0 => Vec::new(),
        (Receiver::Sequence, ty) => vec![ty.element().cloned().unwrap_or(ValueType::Any)],
        (Receiver::Map, ValueType::Map(key, _)) => vec![(**key).clone()],
        _ => vec![ValueType::String],
    };
    MethodInfo {
        name: name.to_owned(),
        params,
        returns: ValueType::Bool,
    }
}

/// Every method callable on a value of type `ty`.
fn candidates(ty: &ValueType) -> Vec<(MethodTarget, MethodInfo)> {
    if let ValueType::Record(record) = ty.underlying() {
        return record
            .get()
            .methods()
            .map(|m| (MethodTarget::Record(m.name.clone()), m.clone()))
            .collect();
    }
    let Some(kind) = receiver_kind(ty) else {
        return Vec::new();
    };
    let mut found: Vec<_> = BUILTINS
        .iter()
        .flat_map(|(name, entries)| entries.iter().map(move |e| (*name, e)))
        .filter(|(_, e)| e.receiver == kind)
        .map(|(name, e)| (MethodTarget::Builtin(e.builtin), builtin_info(name, e, ty)))
        .collect();
    found.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    found
}

/// Method signatures offered on `ty`, for the member catalog.
pub(crate) fn catalog(ty: &ValueType) -> Vec<MethodInfo> {
    candidates(ty).into_iter().map(|(_, info)| info).collect()
}

/// Pick the overload of `name` on `receiver` matching `inputs` and coerce
/// the inputs to its parameter types.
pub(crate) fn resolve_method(
    receiver: &ValueType,
    name: &str,
    inputs: &[Literal],
    now: NaiveDateTime,
) -> Result<BoundMethod, RuleError> {
    if matches!(receiver.underlying(), ValueType::Any) {
        let args = inputs
            .iter()
            .map(|lit| coerce::coerce(lit, &ValueType::Any, now))
            .collect::<Result<_, _>>()?;
        return Ok(BoundMethod {
            target: MethodTarget::Dynamic(name.to_owned()),
            args,
        });
    }

    let not_found = || RuleError::MethodNotFound {
        method: name.to_owned(),
        type_name: receiver.to_string(),
    };
    let (exact, loose): (Vec<_>, Vec<_>) = candidates(receiver)
        .into_iter()
        .filter(|(_, info)| info.name == name && info.params.len() == inputs.len())
        .partition(|(_, info)| exact_match(&info.params, inputs));

    let mut first_error = None;
    for (target, info) in exact.into_iter().chain(loose) {
        let args: Result<Vec<_>, _> = info
            .params
            .iter()
            .zip(inputs)
            .map(|(ty, lit)| coerce::coerce(lit, ty, now))
            .collect();
        match args {
            Ok(args) => {
                if info.returns.underlying() != &ValueType::Bool {
                    return Err(RuleError::shape(format!(
                        "method '{name}' on '{receiver}' returns {} rather than bool",
                        info.returns
                    )));
                }
                return Ok(BoundMethod { target, args });
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or_else(not_found))
}

fn exact_match(params: &[ValueType], inputs: &[Literal]) -> bool {
    params.iter().zip(inputs).all(|(ty, lit)| {
        matches!(
            (ty.underlying(), lit),
            (ValueType::String, Literal::String(_))
                | (ValueType::Int, Literal::Int(_))
                | (ValueType::Float, Literal::Float(_))
                | (ValueType::Bool, Literal::Bool(_))
                | (ValueType::Any, _)
        ) || (lit.is_null() && matches!(ty, ValueType::Nullable(_)))
    })
}

/// Invoke a bound method. Anything other than a `true` result is `false`.
pub(crate) fn call(method: &BoundMethod, receiver: &Value<'_>) -> bool {
    match (&method.target, receiver) {
        (_, Value::Null) => false,
        (MethodTarget::Builtin(builtin), value) => apply(*builtin, value, &method.args),
        (MethodTarget::Record(name) | MethodTarget::Dynamic(name), Value::Record(record)) => {
            matches!(record.invoke(name, &method.args), Some(Value::Bool(true)))
        }
        (MethodTarget::Dynamic(name), value) => {
            runtime_builtin(name, value, method.args.len())
                .is_some_and(|builtin| apply(builtin, value, &method.args))
        }
        (MethodTarget::Record(_), _) => false,
    }
}

fn runtime_builtin(name: &str, value: &Value<'_>, arity: usize) -> Option<Builtin> {
    let kind = match value {
        Value::String(_) => Receiver::Text,
        Value::List(_) => Receiver::Sequence,
        Value::Map(_) => Receiver::Map,
        _ => return None,
    };
    BUILTINS
        .get(name)?
        .iter()
        .find(|e| e.receiver == kind && e.arity == arity)
        .map(|e| e.builtin)
}

fn apply(builtin: Builtin, receiver: &Value<'_>, args: &[Value<'_>]) -> bool {
    match (builtin, receiver, args) {
        (Builtin::StartsWith, Value::String(s), [Value::String(p)]) => s.starts_with(&**p),
        (Builtin::EndsWith, Value::String(s), [Value::String(p)]) => s.ends_with(&**p),
        (Builtin::Contains, Value::String(s), [Value::String(p)]) => s.contains(&**p),
        (Builtin::Equals, Value::String(s), [Value::String(p)]) => s == p,
        (Builtin::IsEmpty, Value::String(s), []) => s.is_empty(),
        (Builtin::ListContains, Value::List(items), [needle]) => {
            items.iter().any(|item| item.loosely_eq(needle))
        }
        (Builtin::ContainsKey, Value::Map(entries), [key]) => {
            entries.iter().any(|(k, _)| k.loosely_eq(key))
        }
        _ => false,
    }
}
