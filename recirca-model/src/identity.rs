use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Which side of a collection a user acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Collector,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Collector => "collector",
        }
    }
}

/// Resolved identity of an authenticated user. Produced by the credential
/// resolver and carried as a request extension; never constructed from
/// client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_collector(&self) -> bool {
        self.role == Role::Collector
    }

    pub fn is_requester(&self) -> bool {
        self.role == Role::Requester
    }
}
