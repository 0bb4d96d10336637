use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

/// A positional argument bound into a query template.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDateTime),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Identifier such as a catalog or table name. Bare when simple, quoted otherwise.
    Identifier(String),
    /// Trusted SQL fragment, inserted verbatim.
    Raw(String),
}

/// A doubled backslash in front of a LIKE wildcard, as left behind by string escaping.
static ESCAPED_WILDCARD: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern; cannot fail to compile.
    Regex::new(r"\\\\([_%])").unwrap()
});

static SIMPLE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Substitute `values` into the `?` (literal) and `??` (identifier) placeholders of `template`.
///
/// Placeholders are consumed left to right. Placeholders without a matching value are left
/// untouched and surplus values are ignored; the resulting syntax error is reported by the
/// server. Runs of three or more `?` are never treated as placeholders.
pub fn format_query(template: &str, values: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = values.iter();
    let mut rest = template;

    while let Some(start) = rest.find('?') {
        out.push_str(&rest[..start]);
        let run = rest[start..].bytes().take_while(|b| *b == b'?').count();
        let marks = &rest[start..start + run];
        rest = &rest[start + run..];

        if run > 2 {
            out.push_str(marks);
            continue;
        }
        let Some(value) = next.next() else {
            out.push_str(marks);
            out.push_str(rest);
            return out;
        };
        if run == 2 {
            out.push_str(&escape_identifier_value(value));
        } else {
            out.push_str(&escape(value));
        }
    }

    out.push_str(rest);
    out
}

/// Render a value as a literal that can be embedded in query text.
pub fn escape(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => escape_float(*f),
        Value::String(s) => unescape_wildcards(&escape_string(s)),
        Value::Date(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("X'{}'", hex)
        }
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::List(_) => format!("({})", escape(item)),
                _ => escape(item),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Identifier(name) => escape_identifier(name),
        Value::Raw(sql) => sql.clone(),
    }
}

/// Quote an identifier with double quotes unless it is a plain word.
pub fn escape_identifier(name: &str) -> String {
    if SIMPLE_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn escape_identifier_value(value: &Value) -> String {
    match value {
        Value::String(s) | Value::Identifier(s) => escape_identifier(s),
        Value::List(items) => items
            .iter()
            .map(escape_identifier_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => escape(other),
    }
}

fn escape_float(f: f64) -> String {
    if f.is_nan() {
        "nan()".to_string()
    } else if f.is_infinite() {
        let literal = if f > 0.0 { "infinity()" } else { "-infinity()" };
        literal.to_string()
    } else {
        // Exponent form keeps the literal a DOUBLE rather than an over-long DECIMAL.
        format!("{:E}", f)
    }
}

/// Generic string literal escaping: single-quoted with `'` doubled, control characters and
/// backslashes backslashed.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Collapse `\\_` and `\\%` back to `\_` and `\%` so LIKE escapes written by the caller survive.
fn unescape_wildcards(escaped: &str) -> String {
    ESCAPED_WILDCARD.replace_all(escaped, r"\$1").into_owned()
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::Date(dt)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
