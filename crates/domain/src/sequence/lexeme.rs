//! Token-level grammar of the step language, built from `winnow` combinators.
//!
//! Conditions and actions are split on their operator at the string level
//! (one operator type per expression), then every token is parsed here as a
//! whole. A token that does not match is reported as `None` and the caller
//! degrades it instead of failing the entire step.

use winnow::ModalResult;
use winnow::Parser;
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt, preceded, terminated};

use super::action::{Directive, Mode};
use super::condition::Atom;
use crate::channel::Channel;

/// `DI<n>`, `DI<n>(EDGE)`, `DI<n>(ONCE)`, `DO<n>`, `DO<n>(ON)`, `DO<n>(OFF)`.
pub(super) fn parse_atom(token: &str) -> Option<Atom> {
    alt((input_atom, output_atom)).parse(token).ok()
}

/// `DO<n>`, `DO<n>(ON)`, `DO<n>(OFF)`, `DO<n>(BLINK)`.
pub(super) fn parse_directive(token: &str) -> Option<Directive> {
    directive.parse(token).ok()
}

/// `<n>s`.
pub(super) fn parse_seconds(token: &str) -> Option<u64> {
    seconds.parse(token).ok()
}

fn channel(input: &mut &str) -> ModalResult<Channel> {
    digit1
        .verify_map(|digits: &str| digits.parse::<u8>().ok().and_then(Channel::new))
        .parse_next(input)
}

fn seconds(input: &mut &str) -> ModalResult<u64> {
    terminated(
        digit1.verify_map(|digits: &str| digits.parse::<u64>().ok()),
        's',
    )
    .parse_next(input)
}

fn input_atom(input: &mut &str) -> ModalResult<Atom> {
    (
        preceded("DI", channel),
        opt(delimited('(', alt(("EDGE", "ONCE")), ')')),
    )
        .map(|(channel, edge)| match edge {
            Some(_) => Atom::Rising(channel),
            None => Atom::Input(channel),
        })
        .parse_next(input)
}

fn output_atom(input: &mut &str) -> ModalResult<Atom> {
    (
        preceded("DO", channel),
        opt(delimited(
            '(',
            alt(("ON".value(true), "OFF".value(false))),
            ')',
        )),
    )
        .map(|(channel, level)| match level {
            Some(on) => Atom::OutputIs { channel, on },
            None => Atom::Output(channel),
        })
        .parse_next(input)
}

fn directive(input: &mut &str) -> ModalResult<Directive> {
    (
        preceded("DO", channel),
        opt(delimited(
            '(',
            alt((
                "ON".value(Mode::On),
                "OFF".value(Mode::Off),
                "BLINK".value(Mode::Blink),
            )),
            ')',
        )),
    )
        .map(|(channel, mode)| Directive {
            channel,
            mode: mode.unwrap_or(Mode::On),
        })
        .parse_next(input)
}
