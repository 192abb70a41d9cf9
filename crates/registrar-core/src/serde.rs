use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Deserializes an optional id where form posts send `""` for "none".
///
/// Works for any id newtype convertible from a [`Uuid`].
pub fn deserialize_optional_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<Uuid>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(s.trim())
            .map(|uuid| Some(T::from(uuid)))
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
