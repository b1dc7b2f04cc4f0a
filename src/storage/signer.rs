//! Presigned URL issuance for storage claims.
//!
//! Signing is a pure, local computation against per-provider credentials:
//! the canonical request / string-to-sign / derived-key chain of the S3
//! query presigning scheme, with no network round-trip and no retry. One
//! issuer instance reuses its resolved provider table for every claim.

use crate::storage::claim::StorageClaim;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use mockable::Clock;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Characters escaped in query values: everything but the unreserved set.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters escaped in object keys: as above, keeping path separators.
const PATH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Credentials and location of one storage provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Service endpoint, e.g. `https://storage.example.net`.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Bucket all claims of this provider live in.
    pub bucket: String,
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

/// Transfer direction a signed URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Download the object.
    Get,
    /// Upload the object.
    Put,
}

impl AccessMode {
    const fn method(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

/// Errors returned while issuing signed URLs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    /// The claim names a provider absent from configuration.
    #[error("unknown storage provider: {0}")]
    UnknownProvider(String),

    /// The provider's secret key was rejected by the MAC primitive.
    #[error("invalid signing key for provider {0}")]
    InvalidKey(String),
}

/// Issues time-boxed presigned URLs for storage claims.
pub struct UrlSigner {
    providers: HashMap<String, ProviderConfig>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl UrlSigner {
    /// Default validity of issued URLs.
    #[must_use]
    pub fn default_url_ttl() -> TimeDelta {
        TimeDelta::hours(24)
    }

    /// Creates a signer over a provider-keyed credential table.
    #[must_use]
    pub fn new(
        providers: HashMap<String, ProviderConfig>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self { providers, clock }
    }

    /// Signs a download URL for the claim.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::UnknownProvider`] when no credentials exist
    /// for the claim's provider.
    pub fn get(&self, claim: &StorageClaim, ttl: TimeDelta) -> Result<String, SignerError> {
        self.sign(claim, AccessMode::Get, ttl)
    }

    /// Signs an upload URL for the claim.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::UnknownProvider`] when no credentials exist
    /// for the claim's provider.
    pub fn put(&self, claim: &StorageClaim, ttl: TimeDelta) -> Result<String, SignerError> {
        self.sign(claim, AccessMode::Put, ttl)
    }

    /// Signs a URL for the claim in the given access mode.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::UnknownProvider`] when no credentials exist
    /// for the claim's provider.
    pub fn sign(
        &self,
        claim: &StorageClaim,
        mode: AccessMode,
        ttl: TimeDelta,
    ) -> Result<String, SignerError> {
        let provider = self
            .providers
            .get(claim.provider())
            .ok_or_else(|| SignerError::UnknownProvider(claim.provider().to_owned()))?;
        presign(provider, mode, claim.path(), self.clock.utc(), ttl)
    }
}

/// Builds the presigned URL for one object at a fixed signing instant.
fn presign(
    provider: &ProviderConfig,
    mode: AccessMode,
    key: &str,
    at: DateTime<Utc>,
    ttl: TimeDelta,
) -> Result<String, SignerError> {
    let (scheme, host) = split_endpoint(&provider.endpoint);
    let canonical_uri = format!(
        "/{}/{}",
        utf8_percent_encode(&provider.bucket, PATH_ENCODE),
        utf8_percent_encode(key.trim_start_matches('/'), PATH_ENCODE)
    );

    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = at.format("%Y%m%d").to_string();
    let scope = format!("{datestamp}/{}/s3/aws4_request", provider.region);
    let credential = format!("{}/{scope}", provider.access_key_id);
    let expires = ttl.num_seconds().max(1);

    // Query parameters in canonical (sorted) order.
    let query = [
        ("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_owned()),
        ("X-Amz-Credential", credential),
        ("X-Amz-Date", amz_date.clone()),
        ("X-Amz-Expires", expires.to_string()),
        ("X-Amz-SignedHeaders", "host".to_owned()),
    ];
    let canonical_query = query
        .iter()
        .map(|(name, value)| format!("{name}={}", utf8_percent_encode(value, QUERY_ENCODE)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{canonical_uri}\n{canonical_query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD",
        mode.method()
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let secret = format!("AWS4{}", provider.secret_access_key);
    let mut signing_key = hmac_sha256(provider, secret.as_bytes(), datestamp.as_bytes())?;
    for part in [provider.region.as_str(), "s3", "aws4_request"] {
        signing_key = hmac_sha256(provider, &signing_key, part.as_bytes())?;
    }
    let signature = hex::encode(hmac_sha256(
        provider,
        &signing_key,
        string_to_sign.as_bytes(),
    )?);

    Ok(format!(
        "{scheme}://{host}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}"
    ))
}

fn hmac_sha256(
    provider: &ProviderConfig,
    key: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, SignerError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| SignerError::InvalidKey(provider.endpoint.clone()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Splits an endpoint into scheme and host, defaulting to `https`.
fn split_endpoint(endpoint: &str) -> (&str, &str) {
    if let Some(host) = endpoint.strip_prefix("https://") {
        ("https", host.trim_end_matches('/'))
    } else if let Some(host) = endpoint.strip_prefix("http://") {
        ("http", host.trim_end_matches('/'))
    } else {
        ("https", endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessMode, ProviderConfig, UrlSigner, presign};
    use crate::storage::claim::{ClaimPurpose, StorageClaim};
    use chrono::{DateTime, TimeDelta, Utc};
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[fixture]
    fn provider() -> ProviderConfig {
        ProviderConfig {
            endpoint: "https://storage.example.net".to_owned(),
            region: "us-east-1".to_owned(),
            bucket: "dealer-media".to_owned(),
            access_key_id: "AKIDEXAMPLE".to_owned(),
            secret_access_key: "secret".to_owned(),
        }
    }

    #[fixture]
    fn signing_instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[rstest]
    fn presigned_url_carries_scope_and_expiry(
        provider: ProviderConfig,
        signing_instant: DateTime<Utc>,
    ) -> eyre::Result<()> {
        let url = presign(
            &provider,
            AccessMode::Get,
            "claims/input.mp4",
            signing_instant,
            UrlSigner::default_url_ttl(),
        )?;

        eyre::ensure!(url.starts_with("https://storage.example.net/dealer-media/claims/input.mp4?"));
        eyre::ensure!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        eyre::ensure!(url.contains("X-Amz-Date=20240501T120000Z"));
        eyre::ensure!(url.contains("X-Amz-Expires=86400"));
        eyre::ensure!(url.contains("20240501%2Fus-east-1%2Fs3%2Faws4_request"));
        Ok(())
    }

    #[rstest]
    fn signature_is_deterministic_for_fixed_instant(
        provider: ProviderConfig,
        signing_instant: DateTime<Utc>,
    ) -> eyre::Result<()> {
        let first = presign(
            &provider,
            AccessMode::Get,
            "claims/input.mp4",
            signing_instant,
            TimeDelta::hours(1),
        )?;
        let second = presign(
            &provider,
            AccessMode::Get,
            "claims/input.mp4",
            signing_instant,
            TimeDelta::hours(1),
        )?;
        eyre::ensure!(first == second);
        Ok(())
    }

    #[rstest]
    fn get_and_put_signatures_differ(
        provider: ProviderConfig,
        signing_instant: DateTime<Utc>,
    ) -> eyre::Result<()> {
        let get = presign(
            &provider,
            AccessMode::Get,
            "claims/input.mp4",
            signing_instant,
            TimeDelta::hours(1),
        )?;
        let put = presign(
            &provider,
            AccessMode::Put,
            "claims/input.mp4",
            signing_instant,
            TimeDelta::hours(1),
        )?;
        eyre::ensure!(get != put);
        Ok(())
    }

    #[rstest]
    fn object_keys_are_percent_encoded(
        provider: ProviderConfig,
        signing_instant: DateTime<Utc>,
    ) -> eyre::Result<()> {
        let url = presign(
            &provider,
            AccessMode::Get,
            "claims/my file.mp4",
            signing_instant,
            TimeDelta::hours(1),
        )?;
        eyre::ensure!(url.contains("/dealer-media/claims/my%20file.mp4?"));
        Ok(())
    }

    #[rstest]
    fn unknown_provider_is_rejected(provider: ProviderConfig) {
        let signer = UrlSigner::new(
            HashMap::from([("configured".to_owned(), provider)]),
            Arc::new(DefaultClock),
        );
        let claim = StorageClaim::input("elsewhere", "claims/a.mp4", ClaimPurpose::None, None);

        let result = signer.get(&claim, UrlSigner::default_url_ttl());

        assert!(matches!(
            result,
            Err(super::SignerError::UnknownProvider(name)) if name == "elsewhere"
        ));
    }
}
