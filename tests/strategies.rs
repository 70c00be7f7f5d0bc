#![allow(dead_code)]

use std::sync::OnceLock;

use proptest::prelude::*;
use rulekit::{CompareOp, Literal, Logical, Record, RecordType, Rule, Value, ValueType};

// --- Fixed record schema ---
// X       : int (-50..=50)
// Y       : int (-50..=50)
// Name    : string, one of NAMES
// Flag    : bool
// Inner.Z : int, Inner may be null
// Values  : List<int>

const NAMES: &[&str] = &["alpha", "beta", "gamma", "delta"];

#[derive(Debug, Clone)]
pub struct Inner {
    pub z: i64,
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub x: i64,
    pub y: i64,
    pub name: String,
    pub flag: bool,
    pub inner: Option<Inner>,
    pub values: Vec<i64>,
}

impl Record for Inner {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| RecordType::builder("Inner").field("Z", ValueType::Int).build())
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        (name == "Z").then_some(Value::Int(self.z))
    }
}

impl Record for Sample {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Sample")
                .field("X", ValueType::Int)
                .field("Y", ValueType::Int)
                .field("Name", ValueType::String)
                .field("Flag", ValueType::Bool)
                .field("Inner", ValueType::nullable(Inner::value_type()))
                .field("Values", ValueType::list(ValueType::Int))
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        Some(match name {
            "X" => Value::Int(self.x),
            "Y" => Value::Int(self.y),
            "Name" => Value::from(&self.name),
            "Flag" => Value::Bool(self.flag),
            "Inner" => self
                .inner
                .as_ref()
                .map_or(Value::Null, |i| Value::Record(i)),
            "Values" => Value::list(self.values.iter().copied()),
            _ => return None,
        })
    }
}

/// Generate an instance of the fixed schema.
pub fn arb_sample() -> impl Strategy<Value = Sample> {
    (
        -50_i64..=50,
        -50_i64..=50,
        prop::sample::select(NAMES),
        any::<bool>(),
        prop::option::of(-50_i64..=50),
        prop::collection::vec(-50_i64..=50, 0..6),
    )
        .prop_map(|(x, y, name, flag, z, values)| Sample {
            x,
            y,
            name: name.to_owned(),
            flag,
            inner: z.map(|z| Inner { z }),
            values,
        })
}

fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
    prop::sample::select(&CompareOp::ALL[..])
}

fn arb_equality_op() -> impl Strategy<Value = CompareOp> {
    prop::sample::select(&[CompareOp::Eq, CompareOp::Neq][..])
}

/// Generate a comparison leaf on a random member of the schema.
pub fn arb_leaf() -> impl Strategy<Value = Rule> {
    prop_oneof![
        (
            prop::sample::select(&["X", "Y", "Inner.Z"][..]),
            arb_compare_op(),
            -50_i64..=50,
        )
            .prop_map(|(member, op, v)| Rule::compare(member, op, v)),
        (arb_equality_op(), prop::sample::select(NAMES))
            .prop_map(|(op, v)| Rule::compare("Name", op, v)),
        (arb_equality_op(), any::<bool>()).prop_map(|(op, v)| Rule::compare("Flag", op, v)),
    ]
}

/// Generate a combinator tree of comparison leaves, bounded depth.
pub fn arb_rule(max_depth: u32) -> impl Strategy<Value = Rule> {
    arb_leaf().prop_recursive(max_depth, 32, 4, |inner| {
        (
            prop::sample::select(&Logical::ALL[..]),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(op, rules)| Rule::combine(op, rules))
    })
}

// --- Reference evaluation in plain Rust ---

fn holds<T: PartialOrd + ?Sized>(op: CompareOp, left: &T, right: &T) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Neq => left != right,
        CompareOp::Gt => left > right,
        CompareOp::Gte => left >= right,
        CompareOp::Lt => left < right,
        CompareOp::Lte => left <= right,
    }
}

fn int(literal: &Literal) -> i64 {
    match literal {
        Literal::Int(v) => *v,
        other => panic!("generated int leaf carries {other:?}"),
    }
}

/// Evaluate a generated rule directly against a sample.
pub fn expected(rule: &Rule, sample: &Sample) -> bool {
    if let Some(op) = Logical::parse(&rule.operator) {
        let mut results = rule.rules.iter().map(|r| expected(r, sample));
        return if op.is_conjunction() {
            results.all(|b| b)
        } else {
            results.any(|b| b)
        };
    }
    let op = CompareOp::parse(&rule.operator).expect("generated leaf is a comparison");
    let target = &rule.target_value;
    match rule.member_name.as_deref() {
        Some("X") => holds(op, &sample.x, &int(target)),
        Some("Y") => holds(op, &sample.y, &int(target)),
        Some("Inner.Z") => sample
            .inner
            .as_ref()
            .is_some_and(|inner| holds(op, &inner.z, &int(target))),
        Some("Name") => holds(op, sample.name.as_str(), target.as_str().unwrap_or_default()),
        Some("Flag") => match target {
            Literal::Bool(v) => holds(op, &sample.flag, v),
            other => panic!("generated bool leaf carries {other:?}"),
        },
        other => panic!("unexpected member {other:?}"),
    }
}
