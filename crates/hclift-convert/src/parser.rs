//! Legacy call parser
//!
//! Parses fragments of the `{{ name arg* }}` mini-language into an AST using pest.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "calls.pest"]
struct CallParser;

/// Parser error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Pest(Box<pest::error::Error<Rule>>),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected rule: {0:?}")]
    UnexpectedRule(Rule),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse a fragment into an AST
pub fn parse(input: &str) -> Result<Fragment> {
    let mut elements = Vec::new();

    for pair in CallParser::parse(Rule::fragment, input)? {
        if pair.as_rule() != Rule::fragment {
            continue;
        }
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::raw_text => elements.push(Element::RawText(inner.as_str().to_string())),
                Rule::action => elements.push(parse_action(inner)?),
                Rule::EOI => {}
                other => return Err(ParseError::UnexpectedRule(other)),
            }
        }
    }

    Ok(Fragment { elements })
}

fn parse_action(pair: Pair<Rule>) -> Result<Element> {
    let span = pair.as_span().start()..pair.as_span().end();
    let body = pair
        .into_inner()
        .next()
        .ok_or(ParseError::UnexpectedRule(Rule::action))?;

    match body.as_rule() {
        Rule::field => {
            let name = body
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or(ParseError::UnexpectedRule(Rule::field))?;
            Ok(Element::Field { name, span })
        }
        Rule::call => {
            let mut name = String::new();
            let mut args = Vec::new();

            for inner in body.into_inner() {
                match inner.as_rule() {
                    Rule::identifier => name = inner.as_str().to_string(),
                    _ => args.push(parse_argument(inner)?),
                }
            }

            Ok(Element::Call(CallSite { name, args, span }))
        }
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

fn parse_argument(pair: Pair<Rule>) -> Result<Argument> {
    match pair.as_rule() {
        Rule::string | Rule::escaped_string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Argument::String(unescape(inner)))
        }
        Rule::raw_string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Argument::String(inner.to_string()))
        }
        Rule::number => {
            let text = pair.as_str();
            if text.contains('.') {
                text.parse()
                    .map(Argument::Float)
                    .map_err(|_| ParseError::InvalidNumber(text.to_string()))
            } else {
                text.parse()
                    .map(Argument::Int)
                    .map_err(|_| ParseError::InvalidNumber(text.to_string()))
            }
        }
        Rule::boolean => Ok(Argument::Bool(pair.as_str() == "true")),
        other => Err(ParseError::UnexpectedRule(other)),
    }
}

/// Process backslash escapes of a quoted argument
fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}
