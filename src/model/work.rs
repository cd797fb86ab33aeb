//! Work requests: the payload carried on the work queue.

use super::{ConversationId, RequestId};
use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days covered by a cost query when the caller gives no explicit range.
pub const DEFAULT_COST_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// The supported intents. Anything else is "no actionable intent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    CheckInstanceSize,
    #[serde(rename = "CheckAWSUsage")]
    CheckAwsUsage,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::CheckInstanceSize => "CheckInstanceSize",
            Intent::CheckAwsUsage => "CheckAWSUsage",
        }
    }

    /// Exact-match lookup of a classifier intent name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CheckInstanceSize" => Some(Intent::CheckInstanceSize),
            "CheckAWSUsage" => Some(Intent::CheckAwsUsage),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Intent::from_name(s).ok_or_else(|| Error::InvalidInput(format!("unsupported intent: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Typed slots
// ---------------------------------------------------------------------------

/// Intent plus its validated slots. Serialized flat, tagged by `intent_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent_name")]
pub enum IntentRequest {
    CheckInstanceSize {
        instance_id: String,
    },
    #[serde(rename = "CheckAWSUsage")]
    CheckAwsUsage {
        service_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_date: Option<NaiveDate>,
    },
}

impl IntentRequest {
    /// Build the typed request for `intent` from raw classifier slots.
    ///
    /// Blank values count as missing. Dates must be `YYYY-MM-DD`.
    pub fn from_slots(intent: Intent, slots: &BTreeMap<String, String>) -> Result<Self> {
        match intent {
            Intent::CheckInstanceSize => Ok(IntentRequest::CheckInstanceSize {
                instance_id: required_slot(slots, "instance_id")?,
            }),
            Intent::CheckAwsUsage => {
                let service_name = required_slot(slots, "service_name")?;
                let from_date = date_slot(slots, "from_date")?;
                let to_date = date_slot(slots, "to_date")?;
                if let (Some(from), Some(to)) = (from_date, to_date) {
                    if from > to {
                        return Err(Error::InvalidInput(format!(
                            "from_date {from} is after to_date {to}"
                        )));
                    }
                }
                Ok(IntentRequest::CheckAwsUsage {
                    service_name,
                    from_date,
                    to_date,
                })
            }
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            IntentRequest::CheckInstanceSize { .. } => Intent::CheckInstanceSize,
            IntentRequest::CheckAwsUsage { .. } => Intent::CheckAwsUsage,
        }
    }
}

fn slot<'a>(slots: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    slots
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required_slot(slots: &BTreeMap<String, String>, name: &str) -> Result<String> {
    slot(slots, name)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("missing required slot: {name}")))
}

fn date_slot(slots: &BTreeMap<String, String>, name: &str) -> Result<Option<NaiveDate>> {
    slot(slots, name)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| Error::InvalidInput(format!("{name} must be YYYY-MM-DD, got {raw:?}: {e}")))
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Work request
// ---------------------------------------------------------------------------

/// One unit of deferred work, as carried on the queue.
///
/// Delivered at least once. Consumers must tolerate duplicates of the same
/// `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    pub request_id: RequestId,
    pub conversation_id: ConversationId,
    /// Raw utterance, echoed into the stored record.
    pub user_query: String,
    #[serde(flatten)]
    pub intent: IntentRequest,
}

impl WorkRequest {
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(payload.clone())?)
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive day range for cost queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Use the explicit range only when both ends are present; otherwise
    /// the last seven days ending `today`.
    pub fn resolve(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => Self { from, to },
            _ => Self {
                from: today - Duration::days(DEFAULT_COST_WINDOW_DAYS),
                to: today,
            },
        }
    }
}
