//! Environment variable substitution.
//!
//! A single tree-walking pass applied after merging: `${VAR}` and bare
//! `$VAR` tokens in string leaves are replaced with their environment
//! values. Mappings and sequences are walked structurally; non-string
//! scalars pass through unchanged. Unset variables leave the token
//! unexpanded, so the pass never fails.

use serde_json::Value;

fn is_var_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_var_start(c)) && chars.all(is_var_char)
}

/// Substitute environment variables in a single string.
///
/// Recognizes `${NAME}` and `$NAME` where NAME starts with a letter or
/// underscore. Anything else after `$` is emitted literally.
pub fn expand_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut iter = input.chars().peekable();

    while let Some(c) = iter.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match iter.peek() {
            Some('{') => {
                iter.next();
                let mut name = String::new();
                let mut closed = false;
                for c2 in iter.by_ref() {
                    if c2 == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c2);
                }
                if closed && is_valid_name(&name) {
                    match std::env::var(&name) {
                        Ok(value) => out.push_str(&value),
                        Err(_) => {
                            out.push_str("${");
                            out.push_str(&name);
                            out.push('}');
                        }
                    }
                } else {
                    // Unterminated or empty token, emit literally
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
            Some(&c2) if is_var_start(c2) => {
                let mut name = String::new();
                while let Some(&c3) = iter.peek() {
                    if is_var_char(c3) {
                        name.push(c3);
                        iter.next();
                    } else {
                        break;
                    }
                }
                match std::env::var(&name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push('$');
                        out.push_str(&name);
                    }
                }
            }
            _ => out.push('$'),
        }
    }

    out
}

/// Recursively substitute environment variables in every string leaf of
/// a configuration tree. Pure: the input is left untouched.
pub fn expand_tree(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(expand_str(s)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), expand_tree(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(expand_tree).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_braced_expansion() {
        std::env::set_var("CLADE_TEST_EXPAND_FOO", "bar");
        assert_eq!(expand_str("${CLADE_TEST_EXPAND_FOO}/x"), "bar/x");
    }

    #[test]
    fn test_bare_expansion() {
        std::env::set_var("CLADE_TEST_EXPAND_BARE", "value");
        assert_eq!(expand_str("prefix-$CLADE_TEST_EXPAND_BARE"), "prefix-value");
    }

    #[test]
    fn test_unset_variable_left_unexpanded() {
        std::env::remove_var("CLADE_TEST_EXPAND_UNSET");
        assert_eq!(
            expand_str("${CLADE_TEST_EXPAND_UNSET}/x"),
            "${CLADE_TEST_EXPAND_UNSET}/x"
        );
        assert_eq!(
            expand_str("$CLADE_TEST_EXPAND_UNSET/x"),
            "$CLADE_TEST_EXPAND_UNSET/x"
        );
    }

    #[test]
    fn test_literal_dollar_preserved() {
        assert_eq!(expand_str("price: $5"), "price: $5");
        assert_eq!(expand_str("trailing $"), "trailing $");
        assert_eq!(expand_str("empty ${}"), "empty ${}");
    }

    #[test]
    fn test_unterminated_brace_preserved() {
        assert_eq!(expand_str("${UNTERMINATED"), "${UNTERMINATED");
    }

    #[test]
    fn test_invalid_name_preserved() {
        assert_eq!(expand_str("${FOO-bar}"), "${FOO-bar}");
        assert_eq!(expand_str("${FOO=bar}"), "${FOO=bar}");
        assert_eq!(expand_str("${1BAD}"), "${1BAD}");
    }

    #[test]
    fn test_tree_walk() {
        std::env::set_var("CLADE_TEST_EXPAND_TREE", "resolved");
        let tree = json!({
            "a": "${CLADE_TEST_EXPAND_TREE}",
            "nested": {"b": ["$CLADE_TEST_EXPAND_TREE", 42, true]},
            "untouched": 7
        });
        let expanded = expand_tree(&tree);
        assert_eq!(expanded["a"], "resolved");
        assert_eq!(expanded["nested"]["b"][0], "resolved");
        assert_eq!(expanded["nested"]["b"][1], 42);
        assert_eq!(expanded["untouched"], 7);
    }

    #[test]
    fn test_tree_input_not_mutated() {
        std::env::set_var("CLADE_TEST_EXPAND_PURE", "x");
        let tree = json!({"a": "${CLADE_TEST_EXPAND_PURE}"});
        let before = tree.clone();
        let _ = expand_tree(&tree);
        assert_eq!(tree, before);
    }
}
