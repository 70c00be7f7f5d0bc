use thiserror::Error;

/// Errors raised while turning a [`Rule`](crate::Rule) into a predicate.
///
/// Every variant except [`RuleError::TypeMismatch`] is produced at compile
/// time. Problems tied to a particular instance (a null parent half way down
/// a member path, an index past the end of a list) never surface as errors;
/// the affected leaf simply evaluates to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("cannot find member '{member}' on type '{type_name}' (\"{path}\")")]
    MemberNotFound {
        member: String,
        type_name: String,
        path: String,
    },

    #[error("'{member}' ({type_name}) cannot be indexed")]
    NotIndexable { member: String, type_name: String },

    #[error("'{method}' is not a method of '{type_name}'")]
    MethodNotFound { method: String, type_name: String },

    #[error("'{value}' is not a member of enum '{enum_name}'")]
    EnumParseError { value: String, enum_name: String },

    #[error("cannot convert '{value}' to {target}")]
    TypeConversionError { value: String, target: String },

    #[error("bad relative time literal '{literal}': {reason}")]
    BadTimeLiteral { literal: String, reason: String },

    #[error("input is not an instance of '{expected}'")]
    TypeMismatch { expected: String },

    #[error("bad rule: {reason}")]
    BadRuleShape { reason: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("malformed member path '{path}': {reason}")]
    PathSyntax { path: String, reason: String },
}

impl RuleError {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        RuleError::BadRuleShape {
            reason: reason.into(),
        }
    }
}
