//! AST for legacy template calls
//!
//! A fragment is raw text interleaved with `{{ ... }}` actions. Only two
//! action shapes exist: a call (`{{ user "name" }}`) and a field reference
//! (`{{ .HTTPIP }}`).

use std::fmt;
use std::ops::Range;

/// A parsed fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub elements: Vec<Element>,
}

impl Fragment {
    /// All call sites, in source order
    pub fn calls(&self) -> impl Iterator<Item = &CallSite> {
        self.elements.iter().filter_map(|e| match e {
            Element::Call(call) => Some(call),
            _ => None,
        })
    }
}

/// An element of a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Text outside `{{ }}`
    RawText(String),
    /// `{{ name arg* }}`
    Call(CallSite),
    /// `{{ .Name }}`
    Field { name: String, span: Range<usize> },
}

/// A located legacy call
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub name: String,
    pub args: Vec<Argument>,
    /// Byte range of the whole action, braces included
    pub span: Range<usize>,
}

/// A literal call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Argument {
    /// Kind name used in argument type errors
    pub fn kind(&self) -> &'static str {
        match self {
            Argument::String(_) => "string",
            Argument::Int(_) => "int",
            Argument::Float(_) => "float",
            Argument::Bool(_) => "bool",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::String(s) => write!(f, "{:?}", s),
            Argument::Int(n) => write!(f, "{}", n),
            Argument::Float(n) => write!(f, "{}", n),
            Argument::Bool(b) => write!(f, "{}", b),
        }
    }
}
