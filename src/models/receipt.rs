use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `resultCode` of an accepted send
pub const RESULT_CODE_SUCCESS: &str = "OK";

// ==================================================================================================
// Response Models
// ==================================================================================================

/// Information about a message that was just sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_sub_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Epoch milliseconds, 0 when absent or null
    #[serde(default, deserialize_with = "null_as_zero")]
    pub deployment_date: i64,
    /// Epoch milliseconds, 0 when absent or null
    #[serde(default, deserialize_with = "null_as_zero")]
    pub deployment_expiration_date: i64,
}

impl SendReceipt {
    pub fn is_ok(&self) -> bool {
        self.result_code.as_deref() == Some(RESULT_CODE_SUCCESS)
    }

    pub fn deployment_date_utc(&self) -> Option<DateTime<Utc>> {
        millis_to_utc(self.deployment_date)
    }

    pub fn deployment_expiration_date_utc(&self) -> Option<DateTime<Utc>> {
        millis_to_utc(self.deployment_expiration_date)
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// Error payload of a rejected send
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    #[serde(default)]
    pub result_string: Option<String>,
}

impl ErrorBody {
    /// Description of the first reported error
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first()?.result_string.as_deref()
    }
}
