//! Performer authorization: bearer-token verification and identity
//! resolution.
//!
//! Requests carry an HS256-signed token whose `worker_name` claim names
//! the calling worker. A performer record is resolved by that name and
//! created on first sight.

use crate::dealing::domain::{Performer, PerformerName};
use crate::dealing::ports::{DynPerformerRepository, PerformerRepositoryError};
use crate::rpc::error::RpcError;
use chrono::TimeDelta;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Claims carried by a performer session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerClaims {
    /// Name of the calling worker process.
    pub worker_name: String,
    /// Issued-at, seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Errors returned while verifying or minting tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token signature, structure, or expiry is invalid.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// The token carries no usable `worker_name` claim.
    #[error("token carries no worker name")]
    MissingWorkerName,
}

/// Verifies HS256 session tokens.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier over a shared session secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verifies a token and extracts its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the signature is invalid, the token has
    /// expired, or the `worker_name` claim is missing or empty.
    pub fn verify(&self, token: &str) -> Result<WorkerClaims, TokenError> {
        let data = decode::<WorkerClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.worker_name.trim().is_empty() {
            return Err(TokenError::MissingWorkerName);
        }
        Ok(data.claims)
    }
}

/// Mints an HS256 session token for a worker.
///
/// # Errors
///
/// Returns [`TokenError::Invalid`] when encoding fails.
pub fn issue_token(
    secret: &[u8],
    worker_name: &str,
    ttl: TimeDelta,
    clock: &(impl Clock + ?Sized),
) -> Result<String, TokenError> {
    let now = clock.utc();
    let claims = WorkerClaims {
        worker_name: worker_name.to_owned(),
        iat: Some(now.timestamp()),
        exp: Some((now + ttl).timestamp()),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Authenticates requests and resolves performer identity.
pub struct PerformerAuthorizer {
    verifier: TokenVerifier,
    performers: DynPerformerRepository,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl PerformerAuthorizer {
    /// Creates an authorizer over a verifier and the performer repository.
    #[must_use]
    pub fn new(
        verifier: TokenVerifier,
        performers: DynPerformerRepository,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            verifier,
            performers,
            clock,
        }
    }

    /// Authenticates a bearer credential and returns the calling
    /// performer, creating the record on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::PermissionDenied`] for any credential problem
    /// and [`RpcError::Unknown`] when identity resolution fails in the
    /// persistence layer.
    pub async fn authenticate(&self, authorization: &str) -> Result<Performer, RpcError> {
        let token = authorization
            .strip_prefix("Bearer ")
            .unwrap_or(authorization)
            .trim();
        if token.is_empty() {
            return Err(RpcError::permission_denied("missing access token"));
        }

        let claims = self
            .verifier
            .verify(token)
            .map_err(|err| RpcError::permission_denied(err.to_string()))?;
        let name = PerformerName::new(claims.worker_name)
            .map_err(|err| RpcError::permission_denied(err.to_string()))?;

        self.resolve_or_create(name).await.map_err(|err| {
            error!(error = %err, "performer resolution failed");
            RpcError::unknown("internal error")
        })
    }

    /// Resolves a performer by name, creating it when absent.
    async fn resolve_or_create(
        &self,
        name: PerformerName,
    ) -> Result<Performer, PerformerRepositoryError> {
        if let Some(found) = self.performers.find_by_name(name.as_str()).await? {
            return Ok(found);
        }

        let performer = Performer::new(name.clone(), &*self.clock);
        match self.performers.store(&performer).await {
            Ok(()) => Ok(performer),
            // Lost a create race: the name now exists, so re-read it.
            Err(PerformerRepositoryError::DuplicateName(_)) => Ok(self
                .performers
                .find_by_name(name.as_str())
                .await?
                .unwrap_or(performer)),
            Err(err) => Err(err),
        }
    }
}
