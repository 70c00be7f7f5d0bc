/// One dotted segment of a member path: a name plus any bracketed indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub indexes: Vec<PathIndex>,
}

/// A bracketed index: `[0]` or `['key']` / `["key"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathIndex {
    Position(usize),
    Key(String),
}

/// A parsed `#NOW±<N><unit>` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOffset {
    pub negative: bool,
    pub amount: u32,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Years,
}
