use crate::coerce;
use crate::parse::{self, PathIndex};
use crate::{RuleError, Value, ValueType};

/// One access step of a resolved member path.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Field or property by name.
    Member(String),
    /// Element of an array or list.
    Position(usize),
    /// Keyed lookup in a map.
    Key(Value<'static>),
    /// Row cell, converted to the declared column type.
    Column { name: String, ty: ValueType },
}

/// An access plan from some starting value to a nested member, plus the
/// member's declared type.
#[derive(Debug, Clone)]
pub(crate) struct MemberPath {
    pub(crate) steps: Vec<Step>,
    pub(crate) ty: ValueType,
}

impl MemberPath {
    pub(crate) fn identity(ty: &ValueType) -> Self {
        Self {
            steps: Vec::new(),
            ty: ty.clone(),
        }
    }
}

/// Resolve a dotted/indexed path against `root`. An absent or empty path is
/// the identity.
pub(crate) fn resolve(root: &ValueType, path: Option<&str>) -> Result<MemberPath, RuleError> {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Ok(MemberPath::identity(root));
    };
    if matches!(root.underlying(), ValueType::Row) {
        return Err(RuleError::shape(format!(
            "'{path}' is read from a DataRow and needs a declared column type"
        )));
    }
    let segments = parse::parse_path(path).map_err(|e| RuleError::PathSyntax {
        path: path.to_owned(),
        reason: e.message().to_owned(),
    })?;

    let mut steps = Vec::new();
    let mut ty = root.clone();
    for segment in segments {
        ty = member_type(&ty, &segment.name, path)?;
        steps.push(Step::Member(segment.name.clone()));
        for index in &segment.indexes {
            let (step, element) = index_step(&ty, index, &segment.name)?;
            steps.push(step);
            ty = element;
        }
    }
    Ok(MemberPath { steps, ty })
}

/// Resolve a row column with an explicit declared type.
pub(crate) fn resolve_column(column: Option<&str>, declared: &str) -> Result<MemberPath, RuleError> {
    let Some(name) = column.filter(|c| !c.is_empty()) else {
        return Err(RuleError::shape("a data rule needs a column name"));
    };
    let ty = ValueType::from_type_name(declared).ok_or_else(|| {
        RuleError::shape(format!("unknown declared type '{declared}' for column '{name}'"))
    })?;
    Ok(MemberPath {
        steps: vec![Step::Column {
            name: name.to_owned(),
            ty: ty.clone(),
        }],
        ty,
    })
}

fn member_type(ty: &ValueType, name: &str, path: &str) -> Result<ValueType, RuleError> {
    match ty.underlying() {
        ValueType::Record(record) => record.get().field(name).cloned().ok_or_else(|| {
            RuleError::MemberNotFound {
                member: name.to_owned(),
                type_name: record.get().name().to_owned(),
                path: path.to_owned(),
            }
        }),
        ValueType::Any => Ok(ValueType::Any),
        other => Err(RuleError::MemberNotFound {
            member: name.to_owned(),
            type_name: other.to_string(),
            path: path.to_owned(),
        }),
    }
}

fn index_step(
    ty: &ValueType,
    index: &PathIndex,
    member: &str,
) -> Result<(Step, ValueType), RuleError> {
    let not_indexable = || RuleError::NotIndexable {
        member: member.to_owned(),
        type_name: ty.to_string(),
    };
    match (ty.underlying(), index) {
        (ValueType::Array(element) | ValueType::List(element), PathIndex::Position(i)) => {
            Ok((Step::Position(*i), (**element).clone()))
        }
        (ValueType::Map(key, value), PathIndex::Key(text)) => {
            let key = coerce::convert_text(text, key.underlying()).ok_or_else(|| {
                RuleError::TypeConversionError {
                    value: text.clone(),
                    target: key.to_string(),
                }
            })?;
            Ok((Step::Key(key), (**value).clone()))
        }
        (ValueType::Map(key, value), PathIndex::Position(i)) if key.is_numeric() => {
            let i = i64::try_from(*i).map_err(|_| not_indexable())?;
            Ok((Step::Key(Value::Int(i)), (**value).clone()))
        }
        (ValueType::Any, PathIndex::Position(i)) => Ok((Step::Position(*i), ValueType::Any)),
        (ValueType::Any, PathIndex::Key(text)) => Ok((
            Step::Key(Value::String(text.clone().into())),
            ValueType::Any,
        )),
        _ => Err(not_indexable()),
    }
}
