mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::{PathIndex, PathSegment, TimeOffset, TimeUnit};

/// Prefix marking a relative time literal.
pub const NOW_PREFIX: &str = "#NOW";

/// Parse a dotted, optionally indexed member path such as
/// `Customer.Orders[0].Lines['sku']`.
///
/// # Errors
///
/// Returns [`ParseError`] if the path is empty or malformed.
pub fn parse_path(input: &str) -> Result<Vec<PathSegment>, ParseError> {
    use winnow::Parser;
    grammar::member_path
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}

/// Parse a `#NOW±<N><unit>` literal, unit one of `S`, `M`, `H`, `D`, `Y`
/// in either case.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a well-formed relative time.
pub fn parse_relative_time(input: &str) -> Result<TimeOffset, ParseError> {
    use winnow::Parser;
    grammar::relative_time
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
