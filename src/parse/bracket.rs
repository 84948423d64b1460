//! Parser for the contents of a bracket atom, e.g. `13CH3+` or `nH:2`.

use crate::{Atom, Element};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_opt, map_res, opt, value},
    error::{Error, ErrorKind},
    multi::many1_count,
    sequence::{pair, preceded, tuple},
    IResult,
};

type Res<'a, T> = IResult<&'a str, T>;

fn number<T: std::str::FromStr>(input: &str) -> Res<T> {
    map_res(digit1, |digits: &str| digits.parse::<T>())(input)
}

/// Lowercase aromatic symbols allowed inside brackets.
fn aromatic_symbol(input: &str) -> Res<Element> {
    map_opt(
        alt((
            tag("se"),
            tag("as"),
            tag("te"),
            nom::combinator::recognize(one_of("bcnops")),
        )),
        Element::from_aromatic_symbol,
    )(input)
}

/// An uppercase element symbol, preferring the two letter form when it names
/// a known element.
fn element_symbol(input: &str) -> Res<Element> {
    let (rest, _) = satisfy(|c| c.is_ascii_uppercase())(input)?;
    if rest.starts_with(|c: char| c.is_ascii_lowercase()) {
        if let Some(element) = Element::from_symbol(&input[..2]) {
            return Ok((&rest[1..], element));
        }
    }
    match Element::from_symbol(&input[..1]) {
        Some(element) => Ok((rest, element)),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    }
}

/// Chirality is parsed so that it is accepted, and then discarded.
fn chirality(input: &str) -> Res<()> {
    value(
        (),
        tuple((
            char('@'),
            opt(char('@')),
            opt(pair(
                alt((tag("TH"), tag("AL"), tag("SP"), tag("TB"), tag("OH"))),
                digit1,
            )),
        )),
    )(input)
}

fn hydrogens(input: &str) -> Res<u8> {
    map(preceded(char('H'), opt(number::<u8>)), |count| {
        count.unwrap_or(1)
    })(input)
}

fn charge(input: &str) -> Res<i8> {
    alt((
        map(preceded(char('+'), number::<i8>), |n| n),
        map(preceded(char('-'), number::<i8>), |n| -n),
        map_opt(many1_count(char('+')), |n| i8::try_from(n).ok()),
        map_opt(many1_count(char('-')), |n| i8::try_from(n).ok().map(|n| -n)),
    ))(input)
}

fn bracket_atom(input: &str) -> Res<Atom> {
    let (rest, isotope) = opt(number::<u16>)(input)?;
    let (rest, (aromatic, element)) = alt((
        map(aromatic_symbol, |e| (true, e)),
        map(element_symbol, |e| (false, e)),
    ))(rest)?;
    let (rest, _) = opt(chirality)(rest)?;
    let (rest, h) = opt(hydrogens)(rest)?;
    let (rest, charge) = opt(charge)(rest)?;
    let (rest, class) = opt(preceded(char(':'), number::<u32>))(rest)?;
    Ok((
        rest,
        Atom {
            element,
            aromatic,
            charge: charge.unwrap_or(0),
            isotope,
            hydrogens: Some(h.unwrap_or(0)),
            class,
        },
    ))
}

/// Parses the text between `[` and `]`. Returns `None` when the content is not
/// a well-formed bracket atom.
pub(crate) fn parse_bracket_atom(content: &str) -> Option<Atom> {
    all_consuming(bracket_atom)(content)
        .ok()
        .map(|(_, atom)| atom)
}
