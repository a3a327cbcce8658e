//! Template strings with `$NAME[...]` substitutions
//!
//! Parsing produces [`Reference`]s exactly as written. The compiler
//! turns them into [`VarRead`]s that name a concrete step, and the
//! runner renders templates against an execution context.

use serde_json::Value;

use super::jsonpath::JsonPath;

/// A substitution as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `$ENVIRON['NAME']`
    Environ(String),
    /// `$CAPTURE['name']`
    Capture(String),
    /// `$RESPONSE['path']`, optionally prefixed by `$HISTORY['step'].`
    Response {
        history: Option<String>,
        path: String,
    },
    /// `$LOCATION`, optionally prefixed by `$HISTORY['step'].`
    Location { history: Option<String> },
    /// `$NETLOC`
    Netloc,
    /// `$SCHEME`
    Scheme,
}

/// A substitution resolved to an explicit read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRead {
    Environ(String),
    Capture(String),
    /// JSON path into the response of the given 1-based step
    Response { step: usize, path: JsonPath },
    /// `Location` header of the given 1-based step
    Location { step: usize },
    Netloc,
    Scheme,
}

/// Piece of a template: literal text or a substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<R> {
    Literal(String),
    Ref(R),
}

/// A compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece<VarRead>>,
}

impl Template {
    pub fn new(pieces: Vec<Piece<VarRead>>) -> Self {
        Self { pieces }
    }

    /// A template without substitutions
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            pieces: vec![Piece::Literal(text.into())],
        }
    }

    pub fn pieces(&self) -> &[Piece<VarRead>] {
        &self.pieces
    }

    /// The single substitution when the template consists of nothing else
    pub fn sole_read(&self) -> Option<&VarRead> {
        match self.pieces.as_slice() {
            [Piece::Ref(read)] => Some(read),
            _ => None,
        }
    }

    /// Render to a string, resolving reads through `lookup`
    pub fn render<F>(&self, mut lookup: F) -> Result<String, String>
    where
        F: FnMut(&VarRead) -> Result<Value, String>,
    {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Ref(read) => out.push_str(&value_to_text(&lookup(read)?)),
            }
        }
        Ok(out)
    }

    /// Render preserving the JSON type of a lone substitution
    pub fn render_value<F>(&self, mut lookup: F) -> Result<Value, String>
    where
        F: FnMut(&VarRead) -> Result<Value, String>,
    {
        if let Some(read) = self.sole_read() {
            return lookup(read);
        }
        self.render(lookup).map(Value::String)
    }
}

/// Text form of a substituted value: strings verbatim, everything else as JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const PREFIXES: &[&str] = &[
    "$ENVIRON[",
    "$CAPTURE[",
    "$RESPONSE[",
    "$HISTORY[",
    "$LOCATION",
    "$NETLOC",
    "$SCHEME",
];

const HISTORY_SUFFIX_ERROR: &str = "$HISTORY[...] must be followed by .$RESPONSE or .$LOCATION";

/// Split a template string into literals and references
pub fn parse(input: &str) -> Result<Vec<Piece<Reference>>, String> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        let (before, candidate) = rest.split_at(pos);
        literal.push_str(before);

        if !PREFIXES.iter().any(|p| candidate.starts_with(p)) {
            literal.push('$');
            rest = &candidate[1..];
            continue;
        }

        let (reference, remaining) = parse_reference(candidate)?;
        if !literal.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        pieces.push(Piece::Ref(reference));
        rest = remaining;
    }

    literal.push_str(rest);
    if !literal.is_empty() || pieces.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_reference(input: &str) -> Result<(Reference, &str), String> {
    if let Some(rest) = input.strip_prefix("$ENVIRON") {
        let (name, rest) = quoted_subscript(rest, "$ENVIRON")?;
        return Ok((Reference::Environ(name), rest));
    }
    if let Some(rest) = input.strip_prefix("$CAPTURE") {
        let (name, rest) = quoted_subscript(rest, "$CAPTURE")?;
        return Ok((Reference::Capture(name), rest));
    }
    if let Some(rest) = input.strip_prefix("$RESPONSE") {
        let (path, rest) = quoted_subscript(rest, "$RESPONSE")?;
        return Ok((
            Reference::Response {
                history: None,
                path,
            },
            rest,
        ));
    }
    if let Some(rest) = input.strip_prefix("$LOCATION") {
        return Ok((Reference::Location { history: None }, rest));
    }
    if let Some(rest) = input.strip_prefix("$NETLOC") {
        return Ok((Reference::Netloc, rest));
    }
    if let Some(rest) = input.strip_prefix("$SCHEME") {
        return Ok((Reference::Scheme, rest));
    }
    if let Some(rest) = input.strip_prefix("$HISTORY") {
        let (step, rest) = quoted_subscript(rest, "$HISTORY")?;
        let rest = rest
            .strip_prefix('.')
            .ok_or_else(|| HISTORY_SUFFIX_ERROR.to_string())?;
        if let Some(rest) = rest.strip_prefix("$RESPONSE") {
            let (path, rest) = quoted_subscript(rest, "$RESPONSE")?;
            return Ok((
                Reference::Response {
                    history: Some(step),
                    path,
                },
                rest,
            ));
        }
        if let Some(rest) = rest.strip_prefix("$LOCATION") {
            return Ok((
                Reference::Location {
                    history: Some(step),
                },
                rest,
            ));
        }
        return Err(HISTORY_SUFFIX_ERROR.to_string());
    }
    Err(format!("Unknown substitution in '{}'", input))
}

/// Parse `['value']` or `["value"]`, returning the value and the remainder
fn quoted_subscript<'a>(input: &'a str, what: &str) -> Result<(String, &'a str), String> {
    let rest = input
        .strip_prefix('[')
        .ok_or_else(|| format!("{} must be followed by ['...']", what))?;
    let mut chars = rest.chars();
    let quote = match chars.next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(format!("{}[...] argument must be quoted", what)),
    };
    let body = &rest[1..];
    let closing = format!("{}]", quote);
    let end = body
        .find(&closing)
        .ok_or_else(|| format!("{}[...] is not closed", what))?;
    let value = body[..end].to_string();
    if value.is_empty() {
        return Err(format!("{}[...] argument is empty", what));
    }
    Ok((value, &body[end + closing.len()..]))
}
