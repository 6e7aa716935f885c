/// Typed document identifiers.
///
/// Every collection gets its own newtype over a UUIDv7 so a course id can
/// never be handed to a user lookup by accident. Ids arrive from URLs and
/// request bodies as strings and are parsed with [`UserId::parse`] and
/// friends.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::ValidationError;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh, time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Parse an id supplied by a client.
            pub fn parse(raw: &str) -> Result<Self, ValidationError> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        kind: $label,
                        value: raw.to_string(),
                    })
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_id!(
    /// Identifier of a user document.
    UserId,
    "user id"
);
typed_id!(
    /// Identifier of a course document.
    CourseId,
    "course id"
);
typed_id!(
    /// Identifier of a lecture document.
    LectureId,
    "lecture id"
);
typed_id!(
    /// Identifier of a purchase record.
    PurchaseId,
    "purchase id"
);
