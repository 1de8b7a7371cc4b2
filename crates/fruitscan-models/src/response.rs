//! JSON envelope shared by every endpoint.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fruit_set::DetectedFruitSet;

pub const MESSAGE_SUCCESSFUL: &str = "Successful";
pub const MESSAGE_NOT_FOUND: &str = "Not found";

/// `{ "status": bool, "message": string, "data": T | null }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful call: "Successful" with data, "Not found" without.
    pub fn found(data: Option<T>) -> Self {
        let message = if data.is_some() {
            MESSAGE_SUCCESSFUL
        } else {
            MESSAGE_NOT_FOUND
        };
        Self {
            status: true,
            message: message.to_string(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<String> {
    /// Envelope for a fruit set, `data` holding the joined names.
    pub fn from_fruits(fruits: &DetectedFruitSet) -> Self {
        Self::found(fruits.data())
    }
}
