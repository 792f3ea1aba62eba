//! Key-value payload codec
//!
//! Contracts and settlements travel as `key=value;key=value` strings. The
//! codec is strict: every expected key must appear exactly once and nothing
//! else may appear, so a decoded value always re-encodes to the same fields.

use std::str::FromStr;

use super::ContractError;

pub(crate) const FIELD_SEPARATOR: char = ';';
pub(crate) const KEY_VALUE_SEPARATOR: char = '=';

/// Whether a value can be embedded in a payload without escaping
pub(crate) fn is_embeddable(value: &str) -> bool {
    !value.is_empty() && !value.contains([FIELD_SEPARATOR, KEY_VALUE_SEPARATOR])
}

pub(crate) fn encode(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}{KEY_VALUE_SEPARATOR}{value}"))
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string())
}

/// Decoded fields of one payload
pub(crate) struct Fields<'a> {
    payload: &'a str,
    entries: Vec<(&'a str, &'a str)>,
}

pub(crate) fn decode<'a>(
    payload: &'a str,
    expected: &[&'static str],
) -> Result<Fields<'a>, ContractError> {
    let mut entries = Vec::with_capacity(expected.len());

    for field in payload.split(FIELD_SEPARATOR) {
        let (key, value) = field
            .split_once(KEY_VALUE_SEPARATOR)
            .ok_or_else(|| malformed(payload, format!("field {field:?} has no '='")))?;

        if !expected.contains(&key) {
            return Err(malformed(payload, format!("unknown key {key:?}")));
        }
        if entries.iter().any(|(k, _)| *k == key) {
            return Err(malformed(payload, format!("duplicate key {key:?}")));
        }
        entries.push((key, value));
    }

    if let Some(missing) = expected
        .iter()
        .find(|key| !entries.iter().any(|(k, _)| k == *key))
    {
        return Err(malformed(payload, format!("missing key {missing:?}")));
    }

    Ok(Fields { payload, entries })
}

impl<'a> Fields<'a> {
    pub(crate) fn get(&self, key: &str) -> &'a str {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or_default()
    }

    pub(crate) fn parse<T: FromStr>(&self, key: &str) -> Result<T, ContractError> {
        let raw = self.get(key);
        raw.parse()
            .map_err(|_| malformed(self.payload, format!("{key}={raw:?} is not a number")))
    }
}

fn malformed(payload: &str, reason: String) -> ContractError {
    ContractError::MalformedPayload {
        payload: payload.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_joins_in_order() {
        let encoded = encode(&[("a", "1".to_string()), ("b", "x".to_string())]);
        assert_eq!(encoded, "a=1;b=x");
    }

    #[test]
    fn test_decode_accepts_any_field_order() {
        let fields = decode("b=2;a=1", &["a", "b"]).unwrap();
        assert_eq!(fields.get("a"), "1");
        assert_eq!(fields.parse::<u32>("b").unwrap(), 2);
    }

    #[test]
    fn test_decode_rejects_unknown_duplicate_and_missing_keys() {
        assert!(decode("a=1;c=3", &["a"]).is_err());
        assert!(decode("a=1;a=2", &["a"]).is_err());
        assert!(decode("a=1", &["a", "b"]).is_err());
        assert!(decode("a", &["a"]).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let fields = decode("a=ten", &["a"]).unwrap();
        let err = fields.parse::<u64>("a").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_embeddable_values() {
        assert!(is_embeddable("tech-1"));
        assert!(!is_embeddable(""));
        assert!(!is_embeddable("a;b"));
        assert!(!is_embeddable("a=b"));
    }
}
