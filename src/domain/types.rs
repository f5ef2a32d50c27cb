use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Entity Identifiers
// ============================================================================

/// Declares a string-backed identifier newtype.
///
/// Relations between entities are id-based lookups, so every entity gets its
/// own id type to keep a `DeviceId` from being passed where a `MeterId` is
/// expected. Ids order lexically, which is what deterministic tie-breaks use.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier for entities created at runtime
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

entity_id!(
    /// Identifier of an ingested field event
    EventId
);
entity_id!(
    /// Identifier of a suspected-fault case
    CaseId
);
entity_id!(
    /// Identifier of a controllable network device
    DeviceId
);
entity_id!(
    /// Identifier of a switching command
    CommandId
);
entity_id!(TransformerId);
entity_id!(MeterId);
entity_id!(EdgeId);
entity_id!(NodeId);

// ============================================================================
// Electrical Phases
// ============================================================================

/// LT conductor phase (red / yellow / blue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
pub enum Phase {
    R,
    Y,
    B,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::R, Phase::Y, Phase::B];
}
