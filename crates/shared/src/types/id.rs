//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PartyId` where a `DocumentId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a back-office user.");
typed_id!(
    PartyId,
    "Unique identifier for a counterparty (customer or vendor)."
);
typed_id!(AccountId, "Unique identifier for a cash or bank account.");
typed_id!(
    DocumentId,
    "Unique identifier for a job card, invoice, or purchase."
);
typed_id!(LineItemId, "Unique identifier for a document line item.");
typed_id!(ReturnId, "Unique identifier for a sale or purchase return.");
typed_id!(ReturnItemId, "Unique identifier for a return line item.");
