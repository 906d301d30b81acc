//! The `{ code, data, message }` response envelope and body classification.
//!
//! # Design
//! A decoded body is either an envelope or something else. `Body::decode`
//! makes that decision once, through serde, and the rest of the client
//! matches on the result instead of poking at JSON fields.
//!
//! An object counts as an envelope when it has a numeric `code` and at
//! least one of `data` or a non-null `message`. A failure envelope such as
//! `{"code":1,"message":"not found"}` carries no `data` and must still be
//! recognised. Any JSON number is a valid `code`; only integral values can
//! match the success policy, so `0.0` succeeds and `1.5` fails.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// The agreed response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: Number,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A response body after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// The body matched the envelope schema. `data` is `None` when the field
    /// was absent and `Some(Value::Null)` when it was an explicit `null`.
    Envelope {
        code: Number,
        data: Option<Value>,
        message: Option<String>,
    },
    /// Anything else, passed through untouched.
    Raw(Value),
}

#[derive(Deserialize)]
struct WireEnvelope {
    code: Number,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

/// Distinguish `"data": null` (present) from a missing `data` key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Body {
    pub fn decode(value: Value) -> Body {
        if !value.is_object() {
            return Body::Raw(value);
        }
        match WireEnvelope::deserialize(&value) {
            Ok(wire) if wire.data.is_some() || wire.message.is_some() => Body::Envelope {
                code: wire.code,
                data: wire.data,
                message: wire.message.map(|message| match message {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
            },
            _ => Body::Raw(value),
        }
    }

    /// Parse a textual body. Empty bodies become `null` and bodies that are
    /// not JSON become a JSON string.
    pub fn parse(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Which envelope codes count as success.
///
/// The default accepts both `0` and `200`: backends built against either
/// convention are served by the same client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPolicy {
    codes: BTreeSet<i64>,
}

impl SuccessPolicy {
    pub fn new(codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn is_success(&self, code: i64) -> bool {
        self.codes.contains(&code)
    }

    /// Whether a wire `code` is a success. Floats count only when integral.
    pub fn accepts(&self, code: &Number) -> bool {
        integral(code).is_some_and(|code| self.is_success(code))
    }
}

fn integral(code: &Number) -> Option<i64> {
    if let Some(code) = code.as_i64() {
        return Some(code);
    }
    code.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self::new([0, 200])
    }
}

/// Message for an application failure: the envelope's own message, or one
/// naming the code.
pub fn application_message(code: &Number, message: Option<&str>) -> String {
    match message {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => format!("application error (code: {code})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_is_recognised() {
        let body = Body::decode(json!({"code": 0, "data": {"swiper": []}}));
        assert_eq!(
            body,
            Body::Envelope {
                code: Number::from(0),
                data: Some(json!({"swiper": []})),
                message: None,
            }
        );
    }

    #[test]
    fn null_data_counts_as_present() {
        let body = Body::decode(json!({"code": 200, "data": null}));
        assert!(matches!(body, Body::Envelope { data: Some(Value::Null), .. }));
    }

    #[test]
    fn failure_envelope_without_data_is_recognised() {
        let body = Body::decode(json!({"code": 1, "message": "not found"}));
        assert_eq!(
            body,
            Body::Envelope {
                code: Number::from(1),
                data: None,
                message: Some("not found".to_string()),
            }
        );
    }

    #[test]
    fn non_string_message_is_stringified() {
        let body = Body::decode(json!({"code": 1, "data": null, "message": 123}));
        assert!(matches!(body, Body::Envelope { message: Some(ref m), .. } if m == "123"));

        let body = Body::decode(json!({"code": 1, "message": {"reason": "gone"}}));
        assert!(
            matches!(body, Body::Envelope { message: Some(ref m), .. } if m == r#"{"reason":"gone"}"#)
        );
    }

    #[test]
    fn null_message_alone_is_not_an_envelope() {
        let value = json!({"code": 1, "message": null});
        assert_eq!(Body::decode(value.clone()), Body::Raw(value));
    }

    #[test]
    fn float_codes_are_envelopes() {
        let body = Body::decode(json!({"code": 1.5, "data": {"x": 1}}));
        assert!(matches!(body, Body::Envelope { data: Some(_), .. }));
    }

    #[test]
    fn string_code_is_not_an_envelope() {
        let value = json!({"code": "0", "data": 1});
        assert_eq!(Body::decode(value.clone()), Body::Raw(value));
    }

    #[test]
    fn bare_code_is_not_an_envelope() {
        let value = json!({"code": 0, "items": []});
        assert_eq!(Body::decode(value.clone()), Body::Raw(value));
    }

    #[test]
    fn arrays_and_scalars_pass_through() {
        assert_eq!(Body::decode(json!([1, 2])), Body::Raw(json!([1, 2])));
        assert_eq!(Body::decode(json!("ok")), Body::Raw(json!("ok")));
    }

    #[test]
    fn parse_handles_empty_and_plain_text() {
        assert_eq!(Body::parse(""), Value::Null);
        assert_eq!(Body::parse("pong"), json!("pong"));
        assert_eq!(Body::parse(r#"{"a":1}"#), json!({"a": 1}));
    }

    #[test]
    fn default_policy_accepts_zero_and_two_hundred() {
        let policy = SuccessPolicy::default();
        assert!(policy.is_success(0));
        assert!(policy.is_success(200));
        assert!(!policy.is_success(1));
        assert!(!SuccessPolicy::new([0]).is_success(200));
    }

    #[test]
    fn integral_floats_match_the_policy() {
        let policy = SuccessPolicy::default();
        let code = |v: Value| match v {
            Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        };
        assert!(policy.accepts(&code(json!(0))));
        assert!(policy.accepts(&code(json!(0.0))));
        assert!(policy.accepts(&code(json!(200.0))));
        assert!(!policy.accepts(&code(json!(1.5))));
        assert!(!policy.accepts(&code(json!(0.5))));
        assert!(!policy.accepts(&code(json!(u64::MAX))));
    }

    #[test]
    fn application_message_prefers_envelope_message() {
        let code = Number::from(42);
        assert_eq!(application_message(&Number::from(1), Some("not found")), "not found");
        assert_eq!(application_message(&code, None), "application error (code: 42)");
        assert_eq!(application_message(&code, Some("")), "application error (code: 42)");

        let fractional = Number::from_f64(1.5).unwrap();
        assert_eq!(application_message(&fractional, None), "application error (code: 1.5)");
    }
}
