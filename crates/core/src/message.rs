//! Message types exchanged with the model service.
//!
//! The pipeline is stateless: every request carries a single compiled
//! instruction, so there is no conversation type here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Carries the compiled instruction.
    User,
    /// The model's raw reply.
    Assistant,
}

/// One message of a completion request or reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }

    #[test]
    fn reply_round_trips_from_wire_json() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"Met Dr. Rossi"}"#).unwrap();
        assert_eq!(msg, Message::user("Met Dr. Rossi"));
    }
}
