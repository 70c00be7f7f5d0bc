use std::fmt;

/// Logical combinators. `AndAlso`/`OrElse` short-circuit, `And`/`Or` evaluate
/// every operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logical {
    And,
    AndAlso,
    Or,
    OrElse,
}

/// Comparison operators supported in rule leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Numeric types a string member can be probed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Integer,
    Single,
    Double,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Any,
    All,
}

/// Reductions an aggregate selector can apply to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reducer {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

/// A rule's `operator` string, parsed once at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Logical(Logical),
    Compare(CompareOp),
    IsMatch,
    Probe(NumericKind),
    Quantifier(Quantifier),
    /// Anything else names a method on the resolved member.
    Method(String),
}

impl Operator {
    /// Classify an operator name. Never fails: unknown names become
    /// [`Operator::Method`] and are checked against the member's type later.
    #[must_use]
    pub fn parse(name: &str) -> Operator {
        if let Some(l) = Logical::parse(name) {
            return Operator::Logical(l);
        }
        if let Some(c) = CompareOp::parse(name) {
            return Operator::Compare(c);
        }
        match name {
            "IsMatch" => return Operator::IsMatch,
            "IsInteger" => return Operator::Probe(NumericKind::Integer),
            "IsSingle" => return Operator::Probe(NumericKind::Single),
            "IsDouble" => return Operator::Probe(NumericKind::Double),
            "IsDecimal" => return Operator::Probe(NumericKind::Decimal),
            _ => {}
        }
        if name.eq_ignore_ascii_case("any") {
            return Operator::Quantifier(Quantifier::Any);
        }
        if name.eq_ignore_ascii_case("all") {
            return Operator::Quantifier(Quantifier::All);
        }
        Operator::Method(name.to_owned())
    }
}

impl Logical {
    pub const ALL: [Logical; 4] = [Logical::And, Logical::AndAlso, Logical::Or, Logical::OrElse];

    #[must_use]
    pub fn parse(name: &str) -> Option<Logical> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Logical::And => "And",
            Logical::AndAlso => "AndAlso",
            Logical::Or => "Or",
            Logical::OrElse => "OrElse",
        }
    }

    #[must_use]
    pub fn is_conjunction(self) -> bool {
        matches!(self, Logical::And | Logical::AndAlso)
    }

    #[must_use]
    pub fn short_circuits(self) -> bool {
        matches!(self, Logical::AndAlso | Logical::OrElse)
    }
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Gt,
        CompareOp::Gte,
        CompareOp::Lt,
        CompareOp::Lte,
        CompareOp::Neq,
    ];

    #[must_use]
    pub fn parse(name: &str) -> Option<CompareOp> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Name used on the wire.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "Equal",
            CompareOp::Neq => "NotEqual",
            CompareOp::Gt => "GreaterThan",
            CompareOp::Gte => "GreaterThanOrEqual",
            CompareOp::Lt => "LessThan",
            CompareOp::Lte => "LessThanOrEqual",
        }
    }

    #[must_use]
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Neq)
    }
}

impl NumericKind {
    pub const ALL: [NumericKind; 4] = [
        NumericKind::Integer,
        NumericKind::Single,
        NumericKind::Double,
        NumericKind::Decimal,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NumericKind::Integer => "IsInteger",
            NumericKind::Single => "IsSingle",
            NumericKind::Double => "IsDouble",
            NumericKind::Decimal => "IsDecimal",
        }
    }
}

impl Quantifier {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Quantifier::Any => "Any",
            Quantifier::All => "All",
        }
    }
}

impl Reducer {
    /// Case-insensitive parse of a selector operator.
    #[must_use]
    pub fn parse(name: &str) -> Option<Reducer> {
        [
            Reducer::Count,
            Reducer::Sum,
            Reducer::Min,
            Reducer::Max,
            Reducer::Average,
        ]
        .into_iter()
        .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Reducer::Count => "Count",
            Reducer::Sum => "Sum",
            Reducer::Min => "Min",
            Reducer::Max => "Max",
            Reducer::Average => "Average",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Logical(l) => write!(f, "{}", l.name()),
            Operator::Compare(c) => write!(f, "{}", c.name()),
            Operator::IsMatch => write!(f, "IsMatch"),
            Operator::Probe(k) => write!(f, "{}", k.name()),
            Operator::Quantifier(q) => write!(f, "{}", q.name()),
            Operator::Method(name) => write!(f, "{name}"),
        }
    }
}
