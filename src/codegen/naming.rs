//! Deterministic mapping from workflow names and node ids to Python identifiers.

use ahash::AHashSet;

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "match", "case", "type",
];

/// Lowercases and folds every run of non-alphanumeric characters into `_`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower {
                out.push('_');
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch.to_ascii_lowercase());
        } else {
            prev_lower = false;
            if !out.ends_with('_') {
                out.push('_');
            }
        }
    }
    out.trim_matches('_').to_string()
}

pub fn pascal_case(name: &str) -> String {
    snake_case(name)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Turns an arbitrary name into a valid, non-keyword Python identifier.
pub fn python_identifier(name: &str, fallback: &str) -> String {
    let mut ident = snake_case(name);
    if ident.is_empty() {
        ident = fallback.to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("n_{}", ident);
    }
    if PYTHON_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Whether `name` can be used verbatim as a Python identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !PYTHON_KEYWORDS.contains(&name)
}

/// Hands out unique identifiers in request order; later collisions get `_2`, `_3`, ...
#[derive(Default)]
pub struct IdentifierTable {
    taken: AHashSet<String>,
}

impl IdentifierTable {
    pub fn claim(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Support Triage"), "support_triage");
        assert_eq!(snake_case("classifyIntent"), "classify_intent");
        assert_eq!(snake_case("--retry--step--"), "retry_step");
        assert_eq!(snake_case("HTTP2Call"), "http2_call");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("support-triage"), "SupportTriage");
        assert_eq!(pascal_case("a"), "A");
    }

    #[test]
    fn test_python_identifier_edge_cases() {
        assert_eq!(python_identifier("3-step", "node"), "n_3_step");
        assert_eq!(python_identifier("class", "node"), "class_");
        assert_eq!(python_identifier("!!!", "node"), "node");
    }

    #[test]
    fn test_identifier_table_disambiguates_in_order() {
        let mut table = IdentifierTable::default();
        assert_eq!(table.claim("a_b".to_string()), "a_b");
        assert_eq!(table.claim("a_b".to_string()), "a_b_2");
        assert_eq!(table.claim("a_b".to_string()), "a_b_3");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("user_name"));
        assert!(!is_identifier("user-name"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("return"));
    }
}
