//! JSON path subset used by scenario assertions and captures
//!
//! Supported syntax:
//! - `$` the document root
//! - `.name` / `['name']` / `["name"]` object members
//! - `[0]`, `[-1]` array elements (negative counts from the end)
//! - `[*]` every element of an array or value of an object
//! - `` .`len` `` length of the current array, object or string

use serde_json::Value;
use std::fmt;

/// One navigation step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(i64),
    Wildcard,
    Length,
}

/// A parsed JSON path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Parse a path expression such as `$.alarms[0].name`
    pub fn parse(input: &str) -> Result<Self, String> {
        let raw = input.trim();
        let rest = raw
            .strip_prefix('$')
            .ok_or_else(|| format!("JSON path '{}' must start with '$'", raw))?;

        let mut segments = Vec::new();
        let mut chars = rest.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next == '.' || next == '[' {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(format!("JSON path '{}' has an empty member name", raw));
                    }
                    if name == "`len`" {
                        segments.push(PathSegment::Length);
                    } else {
                        segments.push(PathSegment::Key(name));
                    }
                }
                '[' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    let mut quote: Option<char> = None;
                    for next in chars.by_ref() {
                        match quote {
                            Some(q) if next == q => quote = None,
                            None if next == '\'' || next == '"' => quote = Some(next),
                            None if next == ']' => {
                                closed = true;
                                break;
                            }
                            _ => {}
                        }
                        inner.push(next);
                    }
                    if !closed {
                        return Err(format!("JSON path '{}' has an unclosed '['", raw));
                    }
                    segments.push(parse_bracket(raw, inner.trim())?);
                }
                other => {
                    return Err(format!(
                        "JSON path '{}' has unexpected character '{}'",
                        raw, other
                    ));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the path can match more than one value
    pub fn is_multi(&self) -> bool {
        self.segments.contains(&PathSegment::Wildcard)
    }

    /// Evaluate the path against a document
    ///
    /// Paths containing a wildcard yield an array of every match. Returns
    /// `None` when a member or index does not exist.
    pub fn query(&self, document: &Value) -> Option<Value> {
        let mut current: Vec<&Value> = vec![document];
        let mut lengths: Option<Vec<Value>> = None;

        for segment in &self.segments {
            if lengths.is_some() {
                // `len` is terminal
                return None;
            }
            match segment {
                PathSegment::Key(key) => {
                    current = current
                        .into_iter()
                        .filter_map(|v| v.as_object().and_then(|o| o.get(key)))
                        .collect();
                }
                PathSegment::Index(index) => {
                    current = current
                        .into_iter()
                        .filter_map(|v| {
                            let items = v.as_array()?;
                            let len = items.len() as i64;
                            let idx = if *index < 0 { len + index } else { *index };
                            if idx < 0 {
                                return None;
                            }
                            items.get(idx as usize)
                        })
                        .collect();
                }
                PathSegment::Wildcard => {
                    current = current
                        .into_iter()
                        .flat_map(|v| -> Vec<&Value> {
                            match v {
                                Value::Array(items) => items.iter().collect(),
                                Value::Object(map) => map.values().collect(),
                                _ => Vec::new(),
                            }
                        })
                        .collect();
                }
                PathSegment::Length => {
                    let measured: Vec<Value> = current
                        .iter()
                        .filter_map(|v| match v {
                            Value::Array(items) => Some(items.len()),
                            Value::Object(map) => Some(map.len()),
                            Value::String(s) => Some(s.chars().count()),
                            _ => None,
                        })
                        .map(Value::from)
                        .collect();
                    lengths = Some(measured);
                }
            }
        }

        if let Some(mut measured) = lengths {
            return if self.is_multi() {
                Some(Value::Array(measured))
            } else {
                measured.pop()
            };
        }

        if self.is_multi() {
            Some(Value::Array(current.into_iter().cloned().collect()))
        } else {
            current.first().map(|v| (*v).clone())
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_bracket(raw: &str, inner: &str) -> Result<PathSegment, String> {
    if inner == "*" {
        return Ok(PathSegment::Wildcard);
    }
    for quote in ['\'', '"'] {
        if let Some(key) = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Ok(PathSegment::Key(key.to_string()));
        }
    }
    inner
        .parse::<i64>()
        .map(PathSegment::Index)
        .map_err(|_| format!("JSON path '{}' has invalid subscript '[{}]'", raw, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "alarm_id": "a-1",
            "alarms": [
                {"name": "cpu_high", "state": "alarm"},
                {"name": "cpu_low", "state": "ok"}
            ],
            "rule": {"threshold": 10, "granularity": 300},
            "odd key": true
        })
    }

    #[test]
    fn test_member_access() {
        let path = JsonPath::parse("$.alarm_id").unwrap();
        assert_eq!(path.query(&doc()), Some(json!("a-1")));

        let path = JsonPath::parse("$.rule.threshold").unwrap();
        assert_eq!(path.query(&doc()), Some(json!(10)));

        let path = JsonPath::parse("$['odd key']").unwrap();
        assert_eq!(path.query(&doc()), Some(json!(true)));
    }

    #[test]
    fn test_index_access() {
        let path = JsonPath::parse("$.alarms[1].name").unwrap();
        assert_eq!(path.query(&doc()), Some(json!("cpu_low")));

        let path = JsonPath::parse("$.alarms[-1].state").unwrap();
        assert_eq!(path.query(&doc()), Some(json!("ok")));

        let path = JsonPath::parse("$.alarms[5]").unwrap();
        assert_eq!(path.query(&doc()), None);
    }

    #[test]
    fn test_wildcard_collects_matches() {
        let path = JsonPath::parse("$.alarms[*].name").unwrap();
        assert!(path.is_multi());
        assert_eq!(path.query(&doc()), Some(json!(["cpu_high", "cpu_low"])));
    }

    #[test]
    fn test_length() {
        let path = JsonPath::parse("$.alarms.`len`").unwrap();
        assert_eq!(path.query(&doc()), Some(json!(2)));

        let path = JsonPath::parse("$.`len`").unwrap();
        assert_eq!(path.query(&doc()), Some(json!(4)));
    }

    #[test]
    fn test_root_path() {
        let path = JsonPath::parse("$").unwrap();
        assert_eq!(path.query(&json!([1, 2])), Some(json!([1, 2])));
    }

    #[test]
    fn test_missing_member() {
        let path = JsonPath::parse("$.rule.missing").unwrap();
        assert_eq!(path.query(&doc()), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(JsonPath::parse("alarms").is_err());
        assert!(JsonPath::parse("$.alarms[0").is_err());
        assert!(JsonPath::parse("$.alarms[x]").is_err());
        assert!(JsonPath::parse("$..name").is_err());
    }
}
