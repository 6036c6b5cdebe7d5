//! S3-compatible content store.
//!
//! Talks to the S3 REST API directly with AWS Signature V4 authentication
//! (`hmac` + `sha2`, pure Rust, no C library dependencies). Supports custom
//! endpoints for S3-compatible services (MinIO, R2, LocalStack) using
//! path-style addressing.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, for temporary credentials / IAM roles)

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::content::{check_size, ContentStore, FetchedObject};
use crate::errors::PipelineError;

type HmacSha256 = Hmac<Sha256>;

/// Configuration for the S3 content store.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// AWS region (used in the signing scope).
    pub region: String,
    /// Custom endpoint URL for S3-compatible services. When set, requests
    /// use path-style addressing (`{endpoint}/{bucket}/{key}`).
    pub endpoint_url: Option<String>,
}

/// AWS credentials loaded from environment variables.
#[derive(Clone)]
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self, PipelineError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| PipelineError::storage("AWS_ACCESS_KEY_ID environment variable not set"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            PipelineError::storage("AWS_SECRET_ACCESS_KEY environment variable not set")
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Content store over an S3-compatible object storage bucket.
pub struct S3ContentStore {
    config: S3Config,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3ContentStore {
    /// Create a store for the configured bucket, reading credentials from
    /// the environment.
    pub fn new(config: S3Config) -> Result<Self, PipelineError> {
        let creds = AwsCredentials::from_env()?;
        Ok(Self {
            config,
            creds,
            client: reqwest::Client::new(),
        })
    }

    /// Scheme + host for requests, e.g. `https://bucket.s3.region.amazonaws.com`.
    fn base(&self) -> (String, String) {
        match &self.config.endpoint_url {
            Some(endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                (scheme.to_string(), host)
            }
            None => (
                "https".to_string(),
                format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region),
            ),
        }
    }

    /// Canonical URI path for an object key.
    ///
    /// Custom endpoints use path-style addressing with the bucket in the
    /// path; the AWS virtual-hosted form carries it in the host.
    fn canonical_uri(&self, key: &str) -> String {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        if self.config.endpoint_url.is_some() {
            format!("/{}/{}", uri_encode(&self.config.bucket), encoded_key)
        } else {
            format!("/{}", encoded_key)
        }
    }

    /// Build a signed request for the given method and object key.
    fn signed_request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let (scheme, host) = self.base();
        let canonical_uri = self.canonical_uri(key);
        let url = format!("{}://{}{}", scheme, host, canonical_uri);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let payload_hash = hex_sha256(b"");

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        let mut builder = self
            .client
            .request(method, &url)
            .header("Authorization", &authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date);

        if let Some(ref token) = self.creds.session_token {
            builder = builder.header("x-amz-security-token", token);
        }

        builder
    }

    /// Obtain the object's size via a metadata-only HEAD request.
    async fn head_size(&self, key: &str) -> Result<u64, PipelineError> {
        let resp = self
            .signed_request(reqwest::Method::HEAD, key)
            .send()
            .await
            .map_err(|e| PipelineError::storage(format!("HEAD {}: {}", key, e)))?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(PipelineError::object_not_found(key));
        }
        if !status.is_success() {
            return Err(PipelineError::storage(format!(
                "HEAD {} failed with status {}",
                key, status
            )));
        }

        resp.headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                PipelineError::storage(format!("HEAD {} returned no Content-Length", key))
            })
    }
}

#[async_trait]
impl ContentStore for S3ContentStore {
    #[instrument(skip(self))]
    async fn fetch(&self, key: &str) -> Result<FetchedObject, PipelineError> {
        // Size check first so an oversized object is rejected without
        // reading its body.
        let size = self.head_size(key).await?;
        check_size(size)?;

        let resp = self
            .signed_request(reqwest::Method::GET, key)
            .send()
            .await
            .map_err(|e| PipelineError::storage(format!("GET {}: {}", key, e)))?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(PipelineError::object_not_found(key));
        }
        if !status.is_success() {
            return Err(PipelineError::storage(format!(
                "GET {} failed with status {}",
                key, status
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PipelineError::storage(format!("GET {} body: {}", key, e)))?
            .to_vec();

        debug!(key = %key, size = size, "Fetched object");

        Ok(FetchedObject { bytes, size })
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), PipelineError> {
        let resp = self
            .signed_request(reqwest::Method::DELETE, key)
            .send()
            .await
            .map_err(|e| PipelineError::storage(format!("DELETE {}: {}", key, e)))?;

        let status = resp.status();

        // 404 is acceptable: deleting an absent object is not an error.
        if !status.is_success() && status.as_u16() != 404 {
            return Err(PipelineError::storage(format!(
                "DELETE {} failed with status {}",
                key, status
            )));
        }

        debug!(key = %key, "Deleted object");
        Ok(())
    }
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode_unreserved_passthrough() {
        assert_eq!(uri_encode("articles/test.md"), "articles%2Ftest.md");
        assert_eq!(uri_encode("abc-DEF_0.9~"), "abc-DEF_0.9~");
        assert_eq!(uri_encode("a b"), "a%20b");
    }

    #[test]
    fn test_derive_signing_key_matches_aws_example() {
        // Known-answer test from the AWS SigV4 documentation.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_hex_sha256_empty_payload() {
        // The canonical empty-body hash used in every signed request.
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    fn store_with_endpoint(endpoint: Option<&str>) -> S3ContentStore {
        S3ContentStore {
            config: S3Config {
                bucket: "content".to_string(),
                region: "us-east-1".to_string(),
                endpoint_url: endpoint.map(str::to_string),
            },
            creds: AwsCredentials {
                access_key_id: "AKID".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_virtual_hosted_addressing() {
        let store = store_with_endpoint(None);
        let (scheme, host) = store.base();
        assert_eq!(scheme, "https");
        assert_eq!(host, "content.s3.us-east-1.amazonaws.com");
        assert_eq!(
            store.canonical_uri("site1/main/raw/a.md"),
            "/site1/main/raw/a.md"
        );
    }

    #[test]
    fn test_path_style_addressing_for_custom_endpoint() {
        let store = store_with_endpoint(Some("http://localhost:9000"));
        let (scheme, host) = store.base();
        assert_eq!(scheme, "http");
        assert_eq!(host, "localhost:9000");
        assert_eq!(
            store.canonical_uri("site1/main/raw/a.md"),
            "/content/site1/main/raw/a.md"
        );
    }
}
