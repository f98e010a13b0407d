use serde::{Deserialize, Deserializer, Serialize};

/// One committed byte range of a multipart transfer.
///
/// Serialized with the storage-backend field names the control plane
/// forwards verbatim (`PartNumber`, `ETag`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Entity tag returned by storage for this range, without quotes.
    #[serde(rename = "ETag")]
    pub checksum_tag: String,
}

impl Part {
    pub fn new(part_number: u32, checksum_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            checksum_tag: checksum_tag.into(),
        }
    }
}

/// A labelled position inside the recorded video, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(deserialize_with = "coerce_number")]
    pub time: f64,
    pub label: String,
}

/// Accepts both `12.5` and `"12.5"`.
fn coerce_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {s:?}"))),
    }
}
