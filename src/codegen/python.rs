//! Small helpers for writing Python source text.

use serde_json::Value as JsonValue;

const INDENT: &str = "    ";

/// A line-oriented source buffer with an indentation level.
#[derive(Default)]
pub struct Emitter {
    out: String,
    depth: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        for part in text.split('\n') {
            if !part.is_empty() {
                for _ in 0..self.depth {
                    self.out.push_str(INDENT);
                }
                self.out.push_str(part);
            }
            self.out.push('\n');
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    pub fn dedent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Renders a Python string literal using double quotes.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders a JSON value as a Python literal. Containers spread over several
/// lines, one element per line, starting at `depth` levels of indentation.
pub fn literal(value: &JsonValue, depth: usize) -> String {
    let pad = INDENT.repeat(depth + 1);
    let close = INDENT.repeat(depth);
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(true) => "True".to_string(),
        JsonValue::Bool(false) => "False".to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => string_literal(s),
        JsonValue::Array(items) if items.is_empty() => "[]".to_string(),
        JsonValue::Array(items) => {
            let mut out = String::from("[\n");
            for item in items {
                out.push_str(&pad);
                out.push_str(&literal(item, depth + 1));
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push(']');
            out
        }
        JsonValue::Object(map) if map.is_empty() => "{}".to_string(),
        JsonValue::Object(map) => {
            let mut out = String::from("{\n");
            for (key, item) in map {
                out.push_str(&pad);
                out.push_str(&string_literal(key));
                out.push_str(": ");
                out.push_str(&literal(item, depth + 1));
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push('}');
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_escapes() {
        assert_eq!(string_literal("say \"hi\"\n"), r#""say \"hi\"\n""#);
        assert_eq!(string_literal("tab\there"), r#""tab\there""#);
        assert_eq!(string_literal("\u{1}"), r#""\x01""#);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(literal(&json!(null), 0), "None");
        assert_eq!(literal(&json!(true), 0), "True");
        assert_eq!(literal(&json!(0.5), 0), "0.5");
        assert_eq!(literal(&json!([]), 0), "[]");
    }

    #[test]
    fn test_nested_layout() {
        let rendered = literal(&json!({"a": {}, "b": [1, 2]}), 0);
        assert_eq!(rendered, "{\n    \"a\": {},\n    \"b\": [\n        1,\n        2,\n    ],\n}");
    }

    #[test]
    fn test_emitter_indents_each_line() {
        let mut e = Emitter::new();
        e.line("def f():").indent().line("x = 1\nreturn x").dedent();
        assert_eq!(e.finish(), "def f():\n    x = 1\n    return x\n");
    }
}
