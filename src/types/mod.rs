mod compiler;
mod error;
mod operator;
mod record;
mod rule;
mod value;
mod value_type;

pub use compiler::{
    compile, compile_dyn, compile_json, member_type, Compiler, CompilerBuilder, DynPredicate,
    Predicate, TypeHandle, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_DEPTH, DEFAULT_REGEX_SIZE_LIMIT,
};
pub use error::RuleError;
pub use operator::{CompareOp, Logical, NumericKind, Operator, Quantifier, Reducer};
pub use record::{DataRow, MethodInfo, Record, RecordType, RecordTypeBuilder};
pub use rule::{Literal, Rule, Selector};
pub use value::{EnumValue, Value};
pub use value_type::{EnumType, RecordRef, ValueType};
