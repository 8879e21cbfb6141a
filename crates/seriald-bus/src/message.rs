//! Bus wire frames
//!
//! One JSON object per line. The `type` tag distinguishes the frame
//! kinds; unknown fields are ignored so the protocol can grow.

use serde::{Deserialize, Serialize};

/// Result status carried in a call reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Call succeeded
    Ok,
    /// A required argument was missing or had the wrong type
    InvalidArgument,
    /// No such object or method
    NotFound,
    /// The bus could not reach the callee
    ConnectionFailed,
}

/// A single frame on the bus connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMessage {
    /// Announce a callable object after connecting
    Register {
        /// Object name, e.g. `serial`
        object: String,
    },

    /// Publish an event to all subscribers
    Event {
        /// Event name, e.g. `serial`
        event: String,
        /// Event payload
        data: serde_json::Value,
    },

    /// Invoke a method on a registered object
    Call {
        /// Correlates the reply with this call
        id: u64,
        /// Target object name
        object: String,
        /// Method name
        method: String,
        /// Method arguments
        args: serde_json::Value,
    },

    /// Reply to a call
    Reply {
        /// Id of the call being answered
        id: u64,
        /// Call outcome
        status: Status,
    },
}
