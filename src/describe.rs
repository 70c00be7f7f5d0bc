//! Catalog of the member paths and operators a rule may use on a type.
//!
//! Rule-building tools call [`describe`] to offer only paths that resolve and
//! operators that compile.

use serde::{Deserialize, Serialize};

use crate::methods;
use crate::types::{CompareOp, Logical, NumericKind, Quantifier};
use crate::{Record, ValueType};

/// One reachable member path and the operators usable on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDescriptor {
    /// Path as written in `memberName`; empty for the root.
    pub path: String,
    pub declared_type: String,
    pub operators: Vec<OperatorDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDescriptor {
    pub name: String,
    pub kind: OperatorKind,
    /// Number of `inputs` (methods) or child rules (quantifiers) expected.
    pub arity: usize,
    /// Every parameter is a scalar, so a UI can offer plain input boxes.
    pub simple_inputs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Logic,
    Comparison,
    InternalString,
    Quantifier,
    ObjectMethod,
}

impl OperatorDescriptor {
    fn new(name: &str, kind: OperatorKind, arity: usize) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            arity,
            simple_inputs: true,
        }
    }
}

/// Describe every member path reachable from `T`.
#[must_use]
pub fn describe<T: Record>() -> Vec<MemberDescriptor> {
    describe_type(&T::value_type())
}

/// Describe every member path reachable from `root`.
///
/// The first entry is the root itself (empty path) and carries the logical
/// combinators. Lists are entered through `name[0]`, maps through
/// `name['key']`. A record type already on the current path is listed but
/// not expanded again.
#[must_use]
pub fn describe_type(root: &ValueType) -> Vec<MemberDescriptor> {
    let mut root_ops: Vec<_> = Logical::ALL
        .iter()
        .map(|l| OperatorDescriptor::new(l.name(), OperatorKind::Logic, 0))
        .collect();
    root_ops.extend(operators(root));

    let mut out = vec![MemberDescriptor {
        path: String::new(),
        declared_type: root.to_string(),
        operators: root_ops,
    }];
    let mut stack = Vec::new();
    expand(root, "", &mut stack, &mut out);
    out
}

fn expand(ty: &ValueType, prefix: &str, stack: &mut Vec<&'static str>, out: &mut Vec<MemberDescriptor>) {
    let ValueType::Record(record) = ty.underlying() else {
        return;
    };
    let record = record.get();
    if stack.contains(&record.name()) {
        return;
    }
    stack.push(record.name());
    for (name, field) in record.fields() {
        let path = if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{prefix}.{name}")
        };
        visit(path, field, stack, out);
    }
    stack.pop();
}

fn visit(path: String, ty: &ValueType, stack: &mut Vec<&'static str>, out: &mut Vec<MemberDescriptor>) {
    out.push(MemberDescriptor {
        path: path.clone(),
        declared_type: ty.to_string(),
        operators: operators(ty),
    });
    match ty.underlying() {
        ValueType::Record(_) => expand(ty, &path, stack, out),
        ValueType::Array(element) | ValueType::List(element) => {
            visit(format!("{path}[0]"), element, stack, out);
        }
        ValueType::Map(_, value) => visit(format!("{path}['key']"), value, stack, out),
        _ => {}
    }
}

fn operators(ty: &ValueType) -> Vec<OperatorDescriptor> {
    let mut ops = Vec::new();
    if ty.is_simple() {
        ops.extend(
            CompareOp::ALL
                .iter()
                .map(|op| OperatorDescriptor::new(op.name(), OperatorKind::Comparison, 1)),
        );
    }
    if ty.underlying() == &ValueType::String {
        ops.push(OperatorDescriptor::new("IsMatch", OperatorKind::InternalString, 1));
        ops.extend(
            NumericKind::ALL
                .iter()
                .map(|k| OperatorDescriptor::new(k.name(), OperatorKind::InternalString, 0)),
        );
    }
    if matches!(ty.underlying(), ValueType::Array(_) | ValueType::List(_)) {
        ops.extend(
            [Quantifier::Any, Quantifier::All]
                .iter()
                .map(|q| OperatorDescriptor::new(q.name(), OperatorKind::Quantifier, 1)),
        );
    }

    let mut methods: Vec<OperatorDescriptor> = Vec::new();
    for info in methods::catalog(ty) {
        if info.returns.underlying() != &ValueType::Bool {
            continue;
        }
        let op = OperatorDescriptor {
            simple_inputs: info.params.iter().all(ValueType::is_simple),
            ..OperatorDescriptor::new(&info.name, OperatorKind::ObjectMethod, info.params.len())
        };
        match methods.iter_mut().find(|m| m.name == op.name) {
            Some(existing) if existing.arity > op.arity => *existing = op,
            Some(_) => {}
            None => methods.push(op),
        }
    }
    ops.extend(methods);
    ops
}
