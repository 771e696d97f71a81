use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Returns a copy of `original` with the fields of `patch` applied.
///
/// A key missing from `patch` leaves the original value alone, and so does an
/// empty string. `null` is a real value and overwrites.
pub fn update_model(original: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut updated = original.clone();
    for (key, value) in patch {
        if matches!(value, Value::String(text) if text.is_empty()) {
            continue;
        }
        updated.insert(key.clone(), value.clone());
    }
    updated
}

/// Applies [`update_model`] to a typed record by going through its JSON form.
pub fn update_record<T>(original: &T, patch: &Map<String, Value>) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let current = match serde_json::to_value(original)? {
        Value::Object(map) => map,
        other => return serde_json::from_value(other),
    };
    serde_json::from_value(Value::Object(update_model(&current, patch)))
}
