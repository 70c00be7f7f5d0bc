use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use super::operator::{CompareOp, Logical, NumericKind, Quantifier, Reducer};

/// One node of a serializable predicate tree.
///
/// A rule is either a combinator (`And`, `AndAlso`, `Or`, `OrElse` with
/// child `rules`) or a leaf that inspects the value at `member_name`. Leaves
/// compare against `target_value`, call a method with `inputs`, quantify
/// over a collection with one child rule, or reduce a collection through an
/// aggregate selector before comparing.
///
/// The JSON shape uses camelCase keys and omits empty fields:
///
/// ```
/// use rulekit::Rule;
///
/// let rule = Rule::create("Customer.Country.CountryCode", "Equal", "AUS");
/// assert_eq!(
///     rule.to_json().unwrap(),
///     r#"{"memberName":"Customer.Country.CountryCode","operator":"Equal","targetValue":"AUS"}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Literal::is_null")]
    pub target_value: Literal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerable_filter: Option<Box<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerable_value_expression: Option<Selector>,
    /// Declared column type. Only meaningful for rules over [`DataRow`](crate::DataRow).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
}

/// Projection and reduction applied to a collection by an aggregate rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub operator: String,
}

/// A plain literal carried by a rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used when a literal has to be parsed as another type.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Literal::Null => Cow::Borrowed("null"),
            Literal::Bool(v) => Cow::Owned(v.to_string()),
            Literal::Int(v) => Cow::Owned(v.to_string()),
            Literal::Float(v) => Cow::Owned(v.to_string()),
            Literal::String(v) => Cow::Borrowed(v),
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Null => {}
            Literal::Bool(v) => v.hash(state),
            Literal::Int(v) => v.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
            Literal::String(v) => v.hash(state),
        }
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_owned())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(i64::from(v))
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(v: Option<T>) -> Self {
        v.map_or(Literal::Null, Into::into)
    }
}

fn member(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_owned())
}

impl Rule {
    /// A leaf: `member operator target`.
    #[must_use]
    pub fn create(member_name: &str, operator: &str, target: impl Into<Literal>) -> Rule {
        Rule {
            member_name: member(member_name),
            operator: operator.to_owned(),
            target_value: target.into(),
            ..Rule::default()
        }
    }

    /// A comparison leaf built from a typed operator.
    #[must_use]
    pub fn compare(member_name: &str, op: CompareOp, target: impl Into<Literal>) -> Rule {
        Rule::create(member_name, op.name(), target)
    }

    /// A leaf over a [`DataRow`](crate::DataRow) column of the given declared type.
    #[must_use]
    pub fn data_rule(
        column: &str,
        operator: &str,
        target: impl Into<Literal>,
        declared_type: &str,
    ) -> Rule {
        Rule {
            declared_type: Some(declared_type.to_owned()),
            ..Rule::create(column, operator, target)
        }
    }

    /// Call a method on the root value.
    #[must_use]
    pub fn method(name: &str, inputs: impl IntoIterator<Item = impl Into<Literal>>) -> Rule {
        Rule::method_on_child("", name, inputs)
    }

    /// Call a method on the value at `member_name`.
    #[must_use]
    pub fn method_on_child(
        member_name: &str,
        name: &str,
        inputs: impl IntoIterator<Item = impl Into<Literal>>,
    ) -> Rule {
        Rule {
            member_name: member(member_name),
            operator: name.to_owned(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Rule::default()
        }
    }

    /// True when at least one element of the collection satisfies `rule`.
    #[must_use]
    pub fn any(member_name: &str, rule: Rule) -> Rule {
        Rule::quantified(member_name, Quantifier::Any, rule)
    }

    /// True when every element of the collection satisfies `rule`.
    #[must_use]
    pub fn all(member_name: &str, rule: Rule) -> Rule {
        Rule::quantified(member_name, Quantifier::All, rule)
    }

    fn quantified(member_name: &str, q: Quantifier, rule: Rule) -> Rule {
        Rule {
            member_name: member(member_name),
            operator: q.name().to_owned(),
            rules: vec![rule],
            ..Rule::default()
        }
    }

    /// Case-insensitive regular expression match.
    #[must_use]
    pub fn is_match(member_name: &str, pattern: &str) -> Rule {
        Rule::create(member_name, "IsMatch", pattern)
    }

    #[must_use]
    pub fn is_integer(member_name: &str) -> Rule {
        Rule::probe(member_name, NumericKind::Integer)
    }

    #[must_use]
    pub fn is_float(member_name: &str) -> Rule {
        Rule::probe(member_name, NumericKind::Single)
    }

    #[must_use]
    pub fn is_double(member_name: &str) -> Rule {
        Rule::probe(member_name, NumericKind::Double)
    }

    #[must_use]
    pub fn is_decimal(member_name: &str) -> Rule {
        Rule::probe(member_name, NumericKind::Decimal)
    }

    fn probe(member_name: &str, kind: NumericKind) -> Rule {
        Rule {
            member_name: member(member_name),
            operator: kind.name().to_owned(),
            ..Rule::default()
        }
    }

    /// Reduce the collection at `member_name` through `selector`, then
    /// compare the result with `op target`.
    #[must_use]
    pub fn aggregate(
        member_name: &str,
        selector: Selector,
        op: CompareOp,
        target: impl Into<Literal>,
    ) -> Rule {
        Rule {
            enumerable_value_expression: Some(selector),
            ..Rule::compare(member_name, op, target)
        }
    }

    /// Only elements matching `filter` take part in the aggregate.
    #[must_use]
    pub fn with_filter(mut self, filter: Rule) -> Rule {
        self.enumerable_filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn combine(op: Logical, rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule {
            operator: op.name().to_owned(),
            rules: rules.into_iter().collect(),
            ..Rule::default()
        }
    }

    #[must_use]
    pub fn and(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::combine(Logical::And, rules)
    }

    #[must_use]
    pub fn and_also(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::combine(Logical::AndAlso, rules)
    }

    #[must_use]
    pub fn or(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::combine(Logical::Or, rules)
    }

    #[must_use]
    pub fn or_else(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::combine(Logical::OrElse, rules)
    }

    /// Combine two rules, splicing the children of either operand that
    /// already uses `op` instead of nesting it.
    #[must_use]
    pub fn merge(op: Logical, lhs: Rule, rhs: Rule) -> Rule {
        let mut rules = Vec::new();
        for side in [lhs, rhs] {
            if side.is_combinator(op) {
                rules.extend(side.rules);
            } else {
                rules.push(side);
            }
        }
        Rule::combine(op, rules)
    }

    fn is_combinator(&self, op: Logical) -> bool {
        self.operator == op.name() && !self.rules.is_empty()
    }

    /// Whether any target value or input in this tree is a `#NOW` literal.
    #[must_use]
    pub fn has_relative_time(&self) -> bool {
        let is_now = |lit: &Literal| lit.as_str().is_some_and(|s| s.starts_with("#NOW"));
        is_now(&self.target_value)
            || self.inputs.iter().any(is_now)
            || self.rules.iter().any(Rule::has_relative_time)
            || self
                .enumerable_filter
                .as_deref()
                .is_some_and(Rule::has_relative_time)
    }

    /// Parse a rule from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the input is not a valid rule document.
    pub fn from_json(json: &str) -> Result<Rule, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Render this rule as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Selector {
    #[must_use]
    pub fn new(member_name: &str, reducer: Reducer) -> Selector {
        Selector {
            member_name: member(member_name),
            operator: reducer.name().to_owned(),
        }
    }

    #[must_use]
    pub fn count() -> Selector {
        Selector::new("", Reducer::Count)
    }

    #[must_use]
    pub fn sum(member_name: &str) -> Selector {
        Selector::new(member_name, Reducer::Sum)
    }
}

impl BitAnd for Rule {
    type Output = Rule;

    fn bitand(self, rhs: Rule) -> Rule {
        Rule::merge(Logical::AndAlso, self, rhs)
    }
}

impl BitOr for Rule {
    type Output = Rule;

    fn bitor(self, rhs: Rule) -> Rule {
        Rule::merge(Logical::OrElse, self, rhs)
    }
}
