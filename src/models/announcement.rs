use serde::Serialize;

use crate::codec::records::{Fields, Record};
use crate::error::DecodeError;

/// A scheduled KindredCommands announcement. `time` is kept as written,
/// e.g. `08:30pm`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Announcement {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "OneTime")]
    pub one_time: bool,
}

impl Record for Announcement {
    fn from_fields(f: &Fields<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: f.string("Name")?,
            time: f.string("Time")?,
            message: f.string("Message")?,
            one_time: f.bool("OneTime")?,
        })
    }
}
