use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};

use crate::coerce::{self, Operand};
use crate::methods::{self, BoundMethod};
use crate::resolve::{self, MemberPath};
use crate::types::{Logical, Operator, Quantifier, Reducer};
use crate::{CompareOp, NumericKind, Rule, RuleError, Selector, ValueType};

/// A compiled predicate tree, evaluated against one root instance.
#[derive(Debug)]
pub(crate) enum Node {
    All {
        children: Vec<Node>,
        short_circuit: bool,
    },
    Any {
        children: Vec<Node>,
        short_circuit: bool,
    },
    Compare {
        source: Source,
        op: CompareOp,
        operand: Operand,
    },
    Regex {
        path: MemberPath,
        regex: Regex,
    },
    Probe {
        path: MemberPath,
        kind: NumericKind,
    },
    Quantified {
        path: MemberPath,
        quantifier: Quantifier,
        /// `None` only for `Any` without a child rule: "has any element".
        predicate: Option<Box<Node>>,
    },
    Method {
        path: MemberPath,
        method: BoundMethod,
    },
}

/// Left-hand side of a comparison.
#[derive(Debug)]
pub(crate) enum Source {
    Path(MemberPath),
    Aggregate(Aggregate),
}

#[derive(Debug)]
pub(crate) struct Aggregate {
    pub(crate) collection: MemberPath,
    pub(crate) filter: Option<Box<Node>>,
    pub(crate) projection: MemberPath,
    pub(crate) reducer: Reducer,
}

impl Node {
    /// Number of nodes in this tree.
    pub(crate) fn size(&self) -> usize {
        match self {
            Node::All { children, .. } | Node::Any { children, .. } => {
                1 + children.iter().map(Node::size).sum::<usize>()
            }
            Node::Quantified { predicate, .. } => 1 + predicate.as_ref().map_or(0, |p| p.size()),
            Node::Compare {
                source: Source::Aggregate(aggregate),
                ..
            } => 1 + aggregate.filter.as_ref().map_or(0, |f| f.size()),
            _ => 1,
        }
    }
}

/// Knobs that shape compilation, copied out of the compiler per call.
#[derive(Debug, Clone)]
pub(crate) struct Options {
    pub(crate) regex_size_limit: usize,
    pub(crate) max_depth: usize,
    /// Instant `#NOW` literals are computed from.
    pub(crate) now: NaiveDateTime,
}

/// Compile `rule` against instances of type `root`.
pub(crate) fn compile(rule: &Rule, root: &ValueType, options: &Options) -> Result<Node, RuleError> {
    Lowering { root, options }.node(rule, root, 0)
}

/// Declared type of the member `rule` reads, resolved from `root`.
pub(crate) fn member_type(
    rule: &Rule,
    root: &ValueType,
    options: &Options,
) -> Result<ValueType, RuleError> {
    Ok(Lowering { root, options }.member(rule, root)?.ty)
}

struct Lowering<'a> {
    root: &'a ValueType,
    options: &'a Options,
}

impl Lowering<'_> {
    /// Lower `rule` with member paths resolved against `ty`: the root type at
    /// the top, the element type under a quantifier or aggregate filter.
    fn node(&self, rule: &Rule, ty: &ValueType, depth: usize) -> Result<Node, RuleError> {
        if depth > self.options.max_depth {
            return Err(RuleError::shape(format!(
                "rule nesting exceeds {} levels",
                self.options.max_depth
            )));
        }
        match Operator::parse(&rule.operator) {
            Operator::Logical(op) => self.combinator(op, &rule.rules, ty, depth),
            Operator::Compare(op) => {
                let path = self.member(rule, ty)?;
                match &rule.enumerable_value_expression {
                    Some(selector) => self.aggregate(rule, selector, op, path, depth),
                    None => {
                        let operand = coerce::operand(
                            &rule.target_value,
                            &path.ty,
                            self.root,
                            self.options.now,
                        )?;
                        Ok(Node::Compare {
                            source: Source::Path(path),
                            op,
                            operand,
                        })
                    }
                }
            }
            op if rule.enumerable_value_expression.is_some() => Err(RuleError::shape(format!(
                "an aggregate selector needs a comparison operator, not '{op}'"
            ))),
            Operator::IsMatch => self.pattern(rule, self.member(rule, ty)?),
            Operator::Probe(kind) => {
                let path = self.member(rule, ty)?;
                expect_scalar(&path, kind.name())?;
                Ok(Node::Probe { path, kind })
            }
            Operator::Quantifier(q) => self.quantified(rule, q, self.member(rule, ty)?, depth),
            Operator::Method(name) => {
                let path = self.member(rule, ty)?;
                let method =
                    methods::resolve_method(&path.ty, &name, &rule.inputs, self.options.now)?;
                Ok(Node::Method { path, method })
            }
        }
    }

    fn member(&self, rule: &Rule, ty: &ValueType) -> Result<MemberPath, RuleError> {
        let member = rule.member_name.as_deref();
        match rule.declared_type.as_deref() {
            Some(declared) => {
                if !matches!(ty.underlying(), ValueType::Row) {
                    return Err(RuleError::shape(format!(
                        "a data rule on '{}' needs a DataRow input, not '{ty}'",
                        member.unwrap_or_default()
                    )));
                }
                resolve::resolve_column(member, declared)
            }
            None => resolve::resolve(ty, member),
        }
    }

    fn combinator(
        &self,
        op: Logical,
        rules: &[Rule],
        ty: &ValueType,
        depth: usize,
    ) -> Result<Node, RuleError> {
        if rules.is_empty() {
            return Err(RuleError::shape(format!(
                "'{}' needs at least one child rule",
                op.name()
            )));
        }
        let mut children = rules
            .iter()
            .map(|r| self.node(r, ty, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return Ok(only);
            }
        }
        let short_circuit = op.short_circuits();
        Ok(if op.is_conjunction() {
            Node::All {
                children,
                short_circuit,
            }
        } else {
            Node::Any {
                children,
                short_circuit,
            }
        })
    }

    fn pattern(&self, rule: &Rule, path: MemberPath) -> Result<Node, RuleError> {
        expect_scalar(&path, "IsMatch")?;
        let pattern = rule
            .target_value
            .as_str()
            .ok_or_else(|| RuleError::shape("'IsMatch' needs a string pattern"))?;
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(self.options.regex_size_limit)
            .build()
            .map_err(|e| RuleError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Node::Regex { path, regex })
    }

    fn quantified(
        &self,
        rule: &Rule,
        quantifier: Quantifier,
        path: MemberPath,
        depth: usize,
    ) -> Result<Node, RuleError> {
        let element = collection_element(&path, quantifier.name())?;
        let predicate = match rule.rules.as_slice() {
            [] if quantifier == Quantifier::Any => None,
            [] => {
                return Err(RuleError::shape(format!(
                    "'{}' needs a child rule",
                    quantifier.name()
                )))
            }
            [only] => Some(self.node(only, &element, depth + 1)?),
            many => Some(Node::All {
                children: many
                    .iter()
                    .map(|r| self.node(r, &element, depth + 1))
                    .collect::<Result<_, _>>()?,
                short_circuit: true,
            }),
        };
        Ok(Node::Quantified {
            path,
            quantifier,
            predicate: predicate.map(Box::new),
        })
    }

    fn aggregate(
        &self,
        rule: &Rule,
        selector: &Selector,
        op: CompareOp,
        collection: MemberPath,
        depth: usize,
    ) -> Result<Node, RuleError> {
        let reducer = Reducer::parse(&selector.operator).ok_or_else(|| {
            RuleError::shape(format!("unknown selector operator '{}'", selector.operator))
        })?;
        let element = collection_element(&collection, reducer.name())?;
        let filter = rule
            .enumerable_filter
            .as_deref()
            .map(|f| self.node(f, &element, depth + 1))
            .transpose()?
            .map(Box::new);
        let projection = resolve::resolve(&element, selector.member_name.as_deref())?;

        let result = match reducer {
            Reducer::Count => ValueType::Int,
            Reducer::Sum | Reducer::Average if !projection.ty.is_numeric() => {
                return Err(RuleError::shape(format!(
                    "cannot {} values of type '{}'",
                    reducer.name(),
                    projection.ty
                )))
            }
            Reducer::Min | Reducer::Max
                if !projection.ty.is_simple() && projection.ty.underlying() != &ValueType::Any =>
            {
                return Err(RuleError::shape(format!(
                    "cannot take the {} of values of type '{}'",
                    reducer.name(),
                    projection.ty
                )))
            }
            Reducer::Average if projection.ty.underlying() == &ValueType::Decimal => {
                ValueType::Decimal
            }
            Reducer::Average => ValueType::Float,
            Reducer::Sum | Reducer::Min | Reducer::Max => projection.ty.clone(),
        };
        let operand = coerce::operand(&rule.target_value, &result, self.root, self.options.now)?;
        Ok(Node::Compare {
            source: Source::Aggregate(Aggregate {
                collection,
                filter,
                projection,
                reducer,
            }),
            op,
            operand,
        })
    }
}

fn collection_element(path: &MemberPath, op: &str) -> Result<ValueType, RuleError> {
    path.ty.element().cloned().ok_or_else(|| {
        RuleError::shape(format!("'{op}' needs a collection, not '{}'", path.ty))
    })
}

fn expect_scalar(path: &MemberPath, op: &str) -> Result<(), RuleError> {
    if path.ty.is_simple() || path.ty.underlying() == &ValueType::Any {
        Ok(())
    } else {
        Err(RuleError::shape(format!(
            "'{op}' applies to scalar members, not '{}'",
            path.ty
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Order;
    use crate::{Literal, Record, Selector};

    fn options() -> Options {
        Options {
            regex_size_limit: 1 << 20,
            max_depth: 8,
            now: chrono::NaiveDate::default().and_time(chrono::NaiveTime::MIN),
        }
    }

    fn lower(rule: &Rule) -> Result<Node, RuleError> {
        compile(rule, &Order::value_type(), &options())
    }

    #[test]
    fn combinator_children_are_lowered_in_order() {
        let rule = Rule::or([
            Rule::create("OrderId", "Equal", 1),
            Rule::create("OrderId", "Equal", 2),
        ]);
        match lower(&rule).unwrap() {
            Node::Any {
                children,
                short_circuit,
            } => {
                assert_eq!(children.len(), 2);
                assert!(!short_circuit);
            }
            other => panic!("expected Any, got {other:?}"),
        }
    }

    #[test]
    fn single_child_combinator_collapses() {
        let rule = Rule::and_also([Rule::create("OrderId", "Equal", 1)]);
        assert!(matches!(lower(&rule).unwrap(), Node::Compare { .. }));
    }

    #[test]
    fn empty_combinator_is_bad_shape() {
        let err = lower(&Rule::and_also([])).unwrap_err();
        assert!(matches!(err, RuleError::BadRuleShape { .. }));
    }

    #[test]
    fn depth_limit() {
        let mut rule = Rule::create("OrderId", "Equal", 1);
        for _ in 0..10 {
            rule = Rule {
                operator: "And".into(),
                rules: vec![rule],
                ..Rule::default()
            };
        }
        let err = lower(&rule).unwrap_err();
        assert_eq!(err.to_string(), "bad rule: rule nesting exceeds 8 levels");
    }

    #[test]
    fn data_rule_on_record_is_bad_shape() {
        let err = lower(&Rule::data_rule("OrderId", "Equal", 1, "int")).unwrap_err();
        assert!(matches!(err, RuleError::BadRuleShape { .. }));
    }

    #[test]
    fn invalid_regex() {
        let err = lower(&Rule::is_match("Customer.FirstName", "([a-z")).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn quantifier_needs_collection() {
        let rule = Rule::any("OrderId", Rule::create("", "Equal", 1));
        assert!(matches!(lower(&rule).unwrap_err(), RuleError::BadRuleShape { .. }));
    }

    #[test]
    fn bare_any_means_non_empty() {
        let rule = Rule {
            member_name: Some("Items".into()),
            operator: "any".into(),
            ..Rule::default()
        };
        assert!(matches!(
            lower(&rule).unwrap(),
            Node::Quantified {
                predicate: None,
                ..
            }
        ));
        let rule = Rule {
            operator: "All".into(),
            ..rule
        };
        assert!(lower(&rule).is_err());
    }

    #[test]
    fn aggregate_sum_of_strings_is_rejected() {
        let rule = Rule::aggregate("Items", Selector::sum("ItemCode"), CompareOp::Gt, 1);
        assert!(matches!(lower(&rule).unwrap_err(), RuleError::BadRuleShape { .. }));
    }

    #[test]
    fn selector_requires_comparison() {
        let mut rule = Rule::aggregate("Items", Selector::count(), CompareOp::Gt, 1);
        rule.operator = "IsInteger".into();
        assert!(matches!(lower(&rule).unwrap_err(), RuleError::BadRuleShape { .. }));
    }

    #[test]
    fn self_reference_becomes_path_operand() {
        let rule = Rule::create("Customer.FirstName", "Equal", "*.Customer.LastName");
        match lower(&rule).unwrap() {
            Node::Compare {
                operand: Operand::Reference(path),
                ..
            } => assert_eq!(path.ty, ValueType::String),
            other => panic!("expected a reference operand, got {other:?}"),
        }
    }

    #[test]
    fn node_size_counts_nested_filters() {
        let rule = Rule::aggregate("Items", Selector::count(), CompareOp::Gt, 0)
            .with_filter(Rule::create("ItemCode", "StartsWith", Literal::Null));
        let err = lower(&rule).unwrap_err();
        assert!(matches!(err, RuleError::MethodNotFound { .. }));

        let rule = Rule::aggregate("Items", Selector::count(), CompareOp::Gt, 0)
            .with_filter(Rule::method_on_child("ItemCode", "StartsWith", ["M"]));
        assert_eq!(lower(&rule).unwrap().size(), 2);
    }
}
