//! Deterministic JSON canonicalization.
//!
//! Rules: object keys in code-point order, no insignificant whitespace,
//! strings NFC-normalized and escaped with the minimal JSON escape set,
//! numbers in shortest round-trip decimal form (integers without a
//! decimal point), sequences in given order.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use wd_domain::error::{Error, Result};

/// Nesting cap; `serde_json::Value` cannot be cyclic, so this guards
/// against pathological depth rather than true cycles.
const MAX_DEPTH: usize = 128;

/// Produce the canonical text of a permitted JSON value.
///
/// Fails with [`Error::Integrity`] on non-finite numbers or nesting
/// beyond [`MAX_DEPTH`].
pub fn canonicalize(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(value, &mut out, 0)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::Integrity(format!(
            "argument nesting exceeds {MAX_DEPTH} levels"
        )));
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Normalize keys before sorting so canonically-equal keys
            // collate identically. Byte order on UTF-8 is code-point order.
            let mut entries: Vec<(String, &Value)> = map
                .iter()
                .map(|(k, v)| (k.nfc().collect::<String>(), v))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(val, out, depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<()> {
    if let Some(f) = n.as_f64() {
        if !f.is_finite() {
            return Err(Error::Integrity(format!("non-finite number: {n}")));
        }
    }
    // serde_json renders integers without a decimal point and floats in
    // shortest round-trip decimal form, which is exactly the canonical rule.
    out.push_str(&n.to_string());
    Ok(())
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.nfc() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sort_by_code_point() {
        let v = json!({"b": 1, "a": 2, "A": 3});
        // 'A' (0x41) < 'a' (0x61) < 'b' (0x62).
        assert_eq!(canonicalize(&v).unwrap(), r#"{"A":3,"a":2,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"k": [1, 2, {"x": true}]});
        assert_eq!(canonicalize(&v).unwrap(), r#"{"k":[1,2,{"x":true}]}"#);
    }

    #[test]
    fn integers_have_no_decimal_point() {
        let v = json!({"n": 42, "m": -7, "big": 9_007_199_254_740_993_u64});
        assert_eq!(
            canonicalize(&v).unwrap(),
            r#"{"big":9007199254740993,"m":-7,"n":42}"#
        );
    }

    #[test]
    fn floats_render_shortest_round_trip() {
        let v = json!({"f": 1.5, "g": 0.1});
        assert_eq!(canonicalize(&v).unwrap(), r#"{"f":1.5,"g":0.1}"#);
    }

    #[test]
    fn trailing_zeros_collapse() {
        let v: Value = serde_json::from_str(r#"{"f": 1.50}"#).unwrap();
        assert_eq!(canonicalize(&v).unwrap(), r#"{"f":1.5}"#);
    }

    #[test]
    fn strings_use_minimal_escapes() {
        let v = json!({"s": "a\"b\\c\nd\te\u{01}"});
        assert_eq!(
            canonicalize(&v).unwrap(),
            "{\"s\":\"a\\\"b\\\\c\\nd\\te\\u0001\"}"
        );
    }

    #[test]
    fn strings_are_nfc_normalized() {
        // "e" + combining acute composes to U+00E9.
        let decomposed = json!({"s": "e\u{0301}"});
        let composed = json!({"s": "\u{e9}"});
        assert_eq!(
            canonicalize(&decomposed).unwrap(),
            canonicalize(&composed).unwrap()
        );
    }

    #[test]
    fn sequences_preserve_order() {
        let v = json!([3, 1, 2]);
        assert_eq!(canonicalize(&v).unwrap(), "[3,1,2]");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let v = json!({
            "z": [1, 2.25, "tex\tt"],
            "a": {"nested": {"deep": null}},
            "mid": true
        });
        let once = canonicalize(&v).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn excessive_depth_is_rejected() {
        let mut v = json!(1);
        for _ in 0..=MAX_DEPTH {
            v = json!([v]);
        }
        let err = canonicalize(&v).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }
}
