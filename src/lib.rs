//! Compile serializable rule trees into predicates over your own types.
//!
//! A [`Rule`] names members by path (`Customer.Country.CountryCode`,
//! `Items[0].Cost`, `Attributes['channel']`), compares them with literals,
//! calls boolean methods, quantifies over collections and aggregates them.
//! [`compile()`] checks the rule against a [`Record`] type once and returns a
//! [`Predicate`] that is cheap to clone and safe to share across threads.
//!
//! ```
//! # use std::sync::OnceLock;
//! # use rulekit::{Record, RecordType, Value, ValueType};
//! # #[derive(Debug)]
//! # struct Order { id: i64 }
//! # impl Record for Order {
//! #     fn record_type() -> &'static RecordType {
//! #         static TYPE: OnceLock<RecordType> = OnceLock::new();
//! #         TYPE.get_or_init(|| RecordType::builder("Order").field("OrderId", ValueType::Int).build())
//! #     }
//! #     fn member(&self, name: &str) -> Option<Value<'_>> {
//! #         (name == "OrderId").then(|| self.id.into())
//! #     }
//! # }
//! use rulekit::Rule;
//!
//! let rule = Rule::create("OrderId", "GreaterThan", 1);
//! let predicate = rulekit::compile::<Order>(&rule).unwrap();
//! assert!(predicate.evaluate(&Order { id: 2 }));
//! assert!(!predicate.evaluate(&Order { id: 1 }));
//! ```

mod coerce;
mod compile;
mod describe;
mod error;
mod evaluate;
mod methods;
pub mod parse;
mod resolve;
#[cfg(feature = "binary")]
mod serial;
mod types;

#[cfg(test)]
mod fixtures;

pub use describe::{describe, describe_type, MemberDescriptor, OperatorDescriptor, OperatorKind};
pub use error::RulekitError;
#[cfg(feature = "binary")]
pub use serial::{DeserializeError, SerializeError};
pub use types::{
    compile, compile_dyn, compile_json, member_type, CompareOp, Compiler, CompilerBuilder,
    DataRow, DynPredicate, EnumType, EnumValue, Literal, Logical, MethodInfo, NumericKind,
    Operator, Predicate, Quantifier, Record, RecordRef, RecordType, RecordTypeBuilder, Reducer,
    Rule, RuleError, Selector, TypeHandle, Value, ValueType, DEFAULT_CACHE_CAPACITY,
    DEFAULT_MAX_DEPTH, DEFAULT_REGEX_SIZE_LIMIT,
};
