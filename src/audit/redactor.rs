//! Sensitive field redaction
//!
//! Removes secret-bearing fields from entity snapshots before they are
//! persisted anywhere outside the secret's own encrypted record. Keys are
//! removed entirely rather than masked, so neither length nor shape of the
//! secret leaks into the log.

use serde_json::Value;

/// Case-insensitive deny-list: the generic secret markers plus the exact
/// field names used by the secret-bearing entities.
const REDACTED_KEYS: &[&str] = &[
    "senha",
    "password",
    "secret",
    "senha_email",
    "senha_equipamento",
    "password_encrypted",
];

fn is_redacted_key(key: &str) -> bool {
    REDACTED_KEYS.iter().any(|denied| key.eq_ignore_ascii_case(denied))
}

/// Return a copy of the snapshot with every deny-listed key removed,
/// recursing through nested objects and arrays.
///
/// Pure and total: no I/O, never fails, non-object values pass through
/// unchanged.
pub fn redact(snapshot: &Value) -> Value {
    match snapshot {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_redacted_key(key))
                .map(|(key, value)| (key.clone(), redact(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removes_denied_keys_any_case() {
        let snapshot = json!({
            "account": "suporte@empresa.com.br",
            "senha": "Secr3t!",
            "Senha": "Secr3t!",
            "PASSWORD": "Secr3t!",
            "secret": "abc",
        });

        let redacted = redact(&snapshot);

        assert_eq!(redacted, json!({"account": "suporte@empresa.com.br"}));
    }

    #[test]
    fn test_preserves_every_other_key_unchanged() {
        let snapshot = json!({
            "account": "a@b.c",
            "owner": "suporte",
            "notes": null,
            "attempts": 3,
            "password": "x",
        });

        let redacted = redact(&snapshot);

        assert_eq!(redacted["account"], json!("a@b.c"));
        assert_eq!(redacted["owner"], json!("suporte"));
        assert_eq!(redacted["notes"], json!(null));
        assert_eq!(redacted["attempts"], json!(3));
        assert!(redacted.get("password").is_none());
    }

    #[test]
    fn test_recurses_into_nested_objects_and_arrays() {
        let snapshot = json!({
            "device": {"name": "srv-01", "senha_equipamento": "x"},
            "history": [
                {"password": "old", "changed_by": "carla"},
                {"password": "older", "changed_by": "bruno"},
            ],
        });

        let redacted = redact(&snapshot);

        assert_eq!(redacted["device"], json!({"name": "srv-01"}));
        assert_eq!(
            redacted["history"],
            json!([{"changed_by": "carla"}, {"changed_by": "bruno"}])
        );
    }

    #[test]
    fn test_exact_stored_field_names() {
        let snapshot = json!({"senha_email": "x", "password_encrypted": "aa:bb"});
        assert_eq!(redact(&snapshot), json!({}));
    }

    #[test]
    fn test_total_on_empty_and_scalar_values() {
        assert_eq!(redact(&json!({})), json!({}));
        assert_eq!(redact(&json!(null)), json!(null));
        assert_eq!(redact(&json!("senha")), json!("senha"));
        assert_eq!(redact(&json!(42)), json!(42));
    }
}
