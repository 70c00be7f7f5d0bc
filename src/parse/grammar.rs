use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, delimited, repeat, separated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use super::parser::{PathIndex, PathSegment, TimeOffset, TimeUnit};
use super::NOW_PREFIX;

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .context(StrContext::Expected(StrContextValue::Description(
            "member name",
        )))
        .parse_next(input)
}

// -- Indexes ----------------------------------------------------------------

fn position(input: &mut &str) -> ModalResult<PathIndex> {
    digit1
        .try_map(|s: &str| s.parse::<usize>())
        .map(PathIndex::Position)
        .parse_next(input)
}

fn quoted_key(input: &mut &str) -> ModalResult<PathIndex> {
    alt((
        delimited('\'', take_till(0.., '\''), '\''),
        delimited('"', take_till(0.., '"'), '"'),
    ))
    .map(|key: &str| PathIndex::Key(key.to_owned()))
    .parse_next(input)
}

fn index(input: &mut &str) -> ModalResult<PathIndex> {
    delimited(
        '[',
        cut_err(alt((position, quoted_key))).context(StrContext::Expected(
            StrContextValue::Description("index or quoted key"),
        )),
        cut_err(']').context(StrContext::Expected(StrContextValue::CharLiteral(']'))),
    )
    .parse_next(input)
}

// -- Member paths -----------------------------------------------------------

fn segment(input: &mut &str) -> ModalResult<PathSegment> {
    let name = ident.parse_next(input)?;
    let indexes: Vec<PathIndex> = repeat(0.., index).parse_next(input)?;
    Ok(PathSegment {
        name: name.to_owned(),
        indexes,
    })
}

pub(crate) fn member_path(input: &mut &str) -> ModalResult<Vec<PathSegment>> {
    separated(1.., segment, '.').parse_next(input)
}

// -- Relative time ----------------------------------------------------------

fn time_unit(input: &mut &str) -> ModalResult<TimeUnit> {
    alt((
        one_of(['S', 's']).value(TimeUnit::Seconds),
        one_of(['M', 'm']).value(TimeUnit::Minutes),
        one_of(['H', 'h']).value(TimeUnit::Hours),
        one_of(['D', 'd']).value(TimeUnit::Days),
        one_of(['Y', 'y']).value(TimeUnit::Years),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "time unit (S, M, H, D or Y)",
    )))
    .parse_next(input)
}

pub(crate) fn relative_time(input: &mut &str) -> ModalResult<TimeOffset> {
    NOW_PREFIX.parse_next(input)?;
    let negative = cut_err(alt(('+'.value(false), '-'.value(true))))
        .context(StrContext::Expected(StrContextValue::Description(
            "'+' or '-'",
        )))
        .parse_next(input)?;
    let amount = cut_err(digit1.try_map(|s: &str| s.parse::<u32>()))
        .context(StrContext::Expected(StrContextValue::Description("amount")))
        .parse_next(input)?;
    let unit = cut_err(time_unit).parse_next(input)?;
    Ok(TimeOffset {
        negative,
        amount,
        unit,
    })
}
