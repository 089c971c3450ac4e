use serde::{Deserialize, Serialize};

/// Body of a success response that carries no payload: `{"result": true}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub result: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { result: true }
    }
}

impl Default for Ack {
    fn default() -> Self {
        Self::ok()
    }
}
