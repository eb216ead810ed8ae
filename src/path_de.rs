//! Deserialization with the JSON path of the failure in the message, so a bad
//! field deep inside a schema document points at itself.
use serde::de::DeserializeOwned;
use serde_json::Value;

fn describe<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> String {
    let path = err.path().to_string();
    format!("at JSON path {path} → {}", err.into_inner())
}

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(describe)
}

/// Same, for a document that was already parsed (e.g. the output of a jq
/// filter or a JSON-pointer selection).
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(describe)
}
