//! Identifier newtypes for the dealing domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[doc = $doc:literal] $name:ident),+ $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Creates a new random identifier.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Creates an identifier from an existing UUID.
                #[must_use]
                pub const fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                /// Returns the wrapped UUID.
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

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

uuid_id! {
    #[doc = "Unique identifier for a performer record."]
    PerformerId,
    #[doc = "Unique identifier for a task record."]
    TaskId,
    #[doc = "Unique identifier for an order record."]
    OrderId,
    #[doc = "Unique identifier for a storage claim."]
    ClaimId,
    #[doc = "Unique identifier for a task failure record."]
    FailureId,
    #[doc = "Unique identifier for a file selection."]
    SelectionId,
    #[doc = "Unique identifier for a file selection item."]
    SelectionItemId,
    #[doc = "Unique identifier for a media probe report."]
    ReportId,
}
