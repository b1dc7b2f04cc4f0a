//! Storage claims: signable object-store locations owned by tasks.

use crate::dealing::domain::ClaimId;
use serde::{Deserialize, Serialize};

/// Direction of the transfer a claim authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRole {
    /// The worker downloads from this location.
    Input,
    /// The worker uploads to this location.
    Output,
}

/// Backing store family of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// S3-compatible object storage.
    S3,
}

impl ClaimKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
        }
    }
}

/// Purpose tag carried by a claim and echoed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPurpose {
    /// No specific purpose recorded.
    None,
    /// Source media for a convert task.
    ConvertInput,
    /// Destination for a convert task's result.
    ConvertOutput,
}

impl ClaimPurpose {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ConvertInput => "convert_input",
            Self::ConvertOutput => "convert_output",
        }
    }
}

/// A signable object-store location, exclusively owned by one task.
///
/// Claims are created on demand and never reused across tasks; output
/// claims get a fresh identifier and path per allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClaim {
    id: ClaimId,
    role: ClaimRole,
    kind: ClaimKind,
    provider: String,
    path: String,
    purpose: ClaimPurpose,
    name: Option<String>,
}

impl StorageClaim {
    /// Creates an input claim at a known object-store path.
    #[must_use]
    pub fn input(
        provider: impl Into<String>,
        path: impl Into<String>,
        purpose: ClaimPurpose,
        name: Option<String>,
    ) -> Self {
        Self {
            id: ClaimId::new(),
            role: ClaimRole::Input,
            kind: ClaimKind::S3,
            provider: provider.into(),
            path: path.into(),
            purpose,
            name,
        }
    }

    /// Allocates a fresh output claim under the `claims/` prefix.
    #[must_use]
    pub fn allocate_output(provider: impl Into<String>) -> Self {
        let id = ClaimId::new();
        Self {
            id,
            role: ClaimRole::Output,
            kind: ClaimKind::S3,
            provider: provider.into(),
            path: format!("claims/{id}"),
            purpose: ClaimPurpose::ConvertOutput,
            name: None,
        }
    }

    /// Returns the claim identifier.
    #[must_use]
    pub const fn id(&self) -> ClaimId {
        self.id
    }

    /// Returns the transfer direction this claim authorizes.
    #[must_use]
    pub const fn role(&self) -> ClaimRole {
        self.role
    }

    /// Returns the backing store family.
    #[must_use]
    pub const fn kind(&self) -> ClaimKind {
        self.kind
    }

    /// Returns the configured provider name credentials are resolved by.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the object key within the provider's bucket.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the purpose tag.
    #[must_use]
    pub const fn purpose(&self) -> ClaimPurpose {
        self.purpose
    }

    /// Returns the optional display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
