//! HCL body model and writer
//!
//! A [`Body`] is an ordered list of attributes and nested blocks. Rendering
//! produces HCL text with two-space indentation and `=` aligned across runs
//! of single-line attributes.

use hclift_core::{Mapping, Value};

const INDENT: &str = "  ";

/// Attribute right-hand side
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Value(Value),
    /// Expression written verbatim, e.g. the `string` type keyword
    Raw(String),
}

impl Expr {
    fn render(&self, indent: usize) -> String {
        match self {
            Expr::Value(value) => render_value(value, indent),
            Expr::Raw(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub expr: Expr,
}

/// A typed, optionally labeled block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Attribute(Attribute),
    Block(Block),
}

/// Ordered attributes and blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub items: Vec<Structure>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Append a literal attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.items.push(Structure::Attribute(Attribute {
            key: key.into(),
            expr: Expr::Value(value.into()),
        }));
    }

    /// Append an attribute whose expression is written verbatim
    pub fn set_raw(&mut self, key: impl Into<String>, raw: impl Into<String>) {
        self.items.push(Structure::Attribute(Attribute {
            key: key.into(),
            expr: Expr::Raw(raw.into()),
        }));
    }

    pub fn push_block(&mut self, block: Block) {
        self.items.push(Structure::Block(block));
    }

    /// Attribute lookup by key
    pub fn attribute(&self, key: &str) -> Option<&Expr> {
        self.items.iter().find_map(|item| match item {
            Structure::Attribute(attr) if attr.key == key => Some(&attr.expr),
            _ => None,
        })
    }

    /// Nested blocks of the given kind
    pub fn blocks<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.items.iter().filter_map(move |item| match item {
            Structure::Block(block) if block.kind == kind => Some(block),
            _ => None,
        })
    }

    /// Render at the given indentation level
    pub fn write(&self, out: &mut String, indent: usize) {
        let mut pending: Vec<(String, String)> = Vec::new();

        for item in &self.items {
            match item {
                Structure::Attribute(attr) => {
                    pending.push((attr.key.clone(), attr.expr.render(indent)));
                }
                Structure::Block(block) => {
                    write_assignments(&pending, out, indent);
                    pending.clear();
                    block.write(out, indent);
                }
            }
        }

        write_assignments(&pending, out, indent);
    }

    pub fn to_hcl(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }
}

impl Block {
    pub fn new(kind: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            labels,
            body: Body::new(),
        }
    }

    /// Render at the given indentation level, trailing newline included
    pub fn write(&self, out: &mut String, indent: usize) {
        pad(out, indent);
        out.push_str(&self.kind);
        for label in &self.labels {
            out.push(' ');
            out.push_str(&quote(label));
        }
        out.push_str(" {\n");
        self.body.write(out, indent + 1);
        pad(out, indent);
        out.push_str("}\n");
    }

    pub fn to_hcl(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

/// Write `key = value` lines, aligning `=` across consecutive single-line values
fn write_assignments(entries: &[(String, String)], out: &mut String, indent: usize) {
    let mut start = 0;

    while start < entries.len() {
        let run = entries[start..]
            .iter()
            .take_while(|(_, value)| !value.contains('\n'))
            .count()
            .max(1);
        let end = start + run;
        let width = entries[start..end]
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0);

        for (key, value) in &entries[start..end] {
            pad(out, indent);
            out.push_str(&format!("{:<width$} = {}\n", key, value, width = width));
        }

        start = end;
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// Render a value as an HCL expression
///
/// Continuation lines of multi-line values are indented relative to `indent`.
pub fn render_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Mapping(map) => render_object(map, indent),
        Value::Sequence(items) => render_tuple(items, indent),
    }
}

fn render_object(map: &Mapping, indent: usize) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let entries: Vec<(String, String)> = keys
        .into_iter()
        .map(|key| (object_key(key), render_value(&map[key.as_str()], indent + 1)))
        .collect();

    let mut out = String::from("{\n");
    write_assignments(&entries, &mut out, indent + 1);
    pad(&mut out, indent);
    out.push('}');
    out
}

fn render_tuple(items: &[Value], indent: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }

    let rendered: Vec<String> = items.iter().map(|v| render_value(v, indent + 1)).collect();
    let inline = items.iter().all(Value::is_scalar) && rendered.iter().all(|r| !r.contains('\n'));

    if inline {
        return format!("[{}]", rendered.join(", "));
    }

    let mut out = String::from("[\n");
    for item in rendered {
        pad(&mut out, indent + 1);
        out.push_str(&item);
        out.push_str(",\n");
    }
    pad(&mut out, indent);
    out.push(']');
    out
}

fn object_key(key: &str) -> String {
    if is_identifier(key) { key.to_string() } else { quote(key) }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Quote a string literal
///
/// Literal `${` and `%{` are escaped so they are not read as interpolation.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');

    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes_aligned() {
        let mut body = Body::new();
        body.set_attribute("image", "ubuntu");
        body.set_attribute("commit", true);
        body.set_attribute("ssh_timeout_long", "5m");

        assert_eq!(
            body.to_hcl(),
            "image            = \"ubuntu\"\ncommit           = true\nssh_timeout_long = \"5m\"\n"
        );
    }

    #[test]
    fn test_block_with_labels() {
        let mut block = Block::new("source", vec!["docker".into(), "web".into()]);
        block.body.set_attribute("image", "ubuntu");

        assert_eq!(
            block.to_hcl(),
            "source \"docker\" \"web\" {\n  image = \"ubuntu\"\n}\n"
        );
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(Block::new("filters", vec![]).to_hcl(), "filters {\n}\n");
    }

    #[test]
    fn test_nested_block_breaks_alignment() {
        let mut body = Body::new();
        body.set_attribute("a", "1");
        let mut inner = Block::new("inner", vec![]);
        inner.body.set_attribute("x", "y");
        body.push_block(inner);
        body.set_attribute("longer_key", "z");

        assert_eq!(
            body.to_hcl(),
            "a = \"1\"\ninner {\n  x = \"y\"\n}\nlonger_key = \"z\"\n"
        );
    }

    #[test]
    fn test_raw_expression() {
        let mut body = Body::new();
        body.set_raw("type", "string");
        assert_eq!(body.to_hcl(), "type = string\n");
        assert_eq!(body.attribute("type"), Some(&Expr::Raw("string".into())));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(quote("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(quote("a\\b"), r#""a\\b""#);
        assert_eq!(quote("line\nnext"), r#""line\nnext""#);
        assert_eq!(quote("echo ${HOME} %{x}"), r#""echo $${HOME} %%{x}""#);
        assert_eq!(quote("cost $5"), r#""cost $5""#);
        assert_eq!(quote("{{ user `x` }}"), "\"{{ user `x` }}\"");
    }

    #[test]
    fn test_object_attribute() {
        let mut body = Body::new();
        body.set_attribute("tags", Value::from(json!({"Name": "web", "Build-Env": "prod", "a b": 1})));

        assert_eq!(
            body.to_hcl(),
            "tags = {\n  Build-Env = \"prod\"\n  Name      = \"web\"\n  \"a b\"     = 1\n}\n"
        );
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(render_value(&Value::from(json!({})), 0), "{}");
        assert_eq!(render_value(&Value::from(json!([])), 0), "[]");
        assert_eq!(render_value(&Value::Null, 0), "null");
    }

    #[test]
    fn test_scalar_list_inline() {
        let value = Value::from(json!(["099720109477", 1, true]));
        assert_eq!(render_value(&value, 0), "[\"099720109477\", 1, true]");
    }

    #[test]
    fn test_list_of_objects_multiline() {
        let value = Value::from(json!([{"a": 1}, "x"]));
        assert_eq!(render_value(&value, 0), "[\n  {\n    a = 1\n  },\n  \"x\",\n]");
    }

    #[test]
    fn test_multiline_attribute_not_padded() {
        let mut body = Body::new();
        body.set_attribute("a", "1");
        body.set_attribute("tags", Value::from(json!({"k": "v"})));
        body.set_attribute("bb", "2");

        assert_eq!(
            body.to_hcl(),
            "a = \"1\"\ntags = {\n  k = \"v\"\n}\nbb = \"2\"\n"
        );
    }

    #[test]
    fn test_block_lookup() {
        let mut body = Body::new();
        body.push_block(Block::new("mounts", vec![]));
        body.push_block(Block::new("mounts", vec![]));
        body.push_block(Block::new("other", vec![]));
        assert_eq!(body.blocks("mounts").count(), 2);
        assert_eq!(body.len(), 3);
    }
}
