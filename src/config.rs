use crate::{models::object::StorageKey, services::key_service::ExtensionPolicy};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{env, fmt, time::Duration};
use thiserror::Error;

const DEFAULT_REGION: &str = "ap-northeast-2";
const DEFAULT_PUT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

pub const ACCESS_KEY_VAR: &str = "S3_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "S3_SECRET_ACCESS_KEY";
pub const BUCKET_VAR: &str = "BUCKET_NAME";
pub const REGION_VAR: &str = "S3_REGION";
pub const ENDPOINT_VAR: &str = "S3_ENDPOINT";
pub const PUBLIC_BASE_URL_VAR: &str = "S3_PUBLIC_BASE_URL";
pub const PUT_TIMEOUT_VAR: &str = "S3_PUT_TIMEOUT_SECS";

/// Problems with the storage configuration.
///
/// These are deployment errors: they are detected before any network I/O and
/// require an operator to fix the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub extension_policy: ExtensionPolicy,
    pub require_storage: bool,
    pub storage: StorageSettings,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Media ingestion endpoint backed by S3")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Largest accepted request body in bytes (overrides MEDIA_INGEST_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Whether files without an extension are accepted: `allow` or `reject`
    /// (overrides EXTENSIONLESS_UPLOADS)
    #[arg(long)]
    pub extensionless_uploads: Option<ExtensionPolicy>,

    /// Exit at startup when the storage configuration is incomplete
    #[arg(long)]
    pub require_storage: bool,
}

pub const HOST_VAR: &str = "MEDIA_INGEST_HOST";
pub const PORT_VAR: &str = "MEDIA_INGEST_PORT";
pub const MAX_UPLOAD_BYTES_VAR: &str = "MEDIA_INGEST_MAX_UPLOAD_BYTES";
pub const EXTENSIONLESS_UPLOADS_VAR: &str = "EXTENSIONLESS_UPLOADS";

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args_and_lookup(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge parsed CLI args over values read through `lookup`.
    ///
    /// CLI flags win; environment values fill the gaps; defaults fill the rest.
    pub fn from_args_and_lookup<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Environment fallback ---
        let env_host = lookup(HOST_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, PORT_VAR, 3000u16, |v| {
            v.parse::<u16>().map_err(|e| e.to_string())
        })?;
        let env_limit = parse_var(&lookup, MAX_UPLOAD_BYTES_VAR, DEFAULT_MAX_UPLOAD_BYTES, |v| {
            v.parse::<usize>().map_err(|e| e.to_string())
        })?;
        let env_policy = parse_var(
            &lookup,
            EXTENSIONLESS_UPLOADS_VAR,
            ExtensionPolicy::Allow,
            |v| <ExtensionPolicy as ValueEnum>::from_str(v, true),
        )?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_limit),
            extension_policy: args.extensionless_uploads.unwrap_or(env_policy),
            require_storage: args.require_storage,
            storage: StorageSettings::from_lookup(lookup),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `name` through `lookup` and parse it; absent or blank means `default`.
fn parse_var<T, F, P>(lookup: &F, name: &str, default: T, parse: P) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => parse(raw.trim())
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("parsing {} value `{}`", name, raw)),
        _ => Ok(default),
    }
}

/// Storage settings as read from the environment, before validation.
#[derive(Clone, Default)]
pub struct StorageSettings {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub put_timeout_secs: Option<String>,
}

impl StorageSettings {
    /// Read settings through `lookup`; blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            region: read(REGION_VAR),
            access_key_id: read(ACCESS_KEY_VAR),
            secret_access_key: read(SECRET_KEY_VAR),
            bucket_name: read(BUCKET_VAR),
            endpoint: read(ENDPOINT_VAR),
            public_base_url: read(PUBLIC_BASE_URL_VAR),
            put_timeout_secs: read(PUT_TIMEOUT_VAR),
        }
    }

    /// Check that every required value is present and well formed.
    ///
    /// All missing variables are reported at once so a single restart fixes them.
    pub fn validate(&self) -> Result<StorageConfig, ConfigError> {
        let mut missing = Vec::new();
        if self.access_key_id.is_none() {
            missing.push(ACCESS_KEY_VAR);
        }
        if self.secret_access_key.is_none() {
            missing.push(SECRET_KEY_VAR);
        }
        if self.bucket_name.is_none() {
            missing.push(BUCKET_VAR);
        }

        let (Some(access_key_id), Some(secret_access_key), Some(bucket_name)) = (
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.bucket_name.clone(),
        ) else {
            return Err(ConfigError::Missing(missing));
        };

        ensure_bucket_name_valid(&bucket_name)?;

        let put_timeout = match &self.put_timeout_secs {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: PUT_TIMEOUT_VAR,
                        value: raw.clone(),
                        reason: "must be a positive number of seconds".into(),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_PUT_TIMEOUT_SECS),
        };

        if let Some(endpoint) = &self.endpoint {
            ensure_http_url(ENDPOINT_VAR, endpoint)?;
        }
        if let Some(base) = &self.public_base_url {
            ensure_http_url(PUBLIC_BASE_URL_VAR, base)?;
        }

        Ok(StorageConfig {
            region: self
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id,
            secret_access_key,
            bucket_name,
            endpoint: self
                .endpoint
                .as_ref()
                .map(|endpoint| endpoint.trim_end_matches('/').to_string()),
            public_base_url: self
                .public_base_url
                .as_ref()
                .map(|base| base.trim_end_matches('/').to_string()),
            put_timeout,
        })
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("public_base_url", &self.public_base_url)
            .field("put_timeout_secs", &self.put_timeout_secs)
            .finish()
    }
}

/// Validated, immutable storage configuration shared by every request.
#[derive(Clone)]
pub struct StorageConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Custom endpoint for S3-compatible providers; enables path-style addressing.
    pub endpoint: Option<String>,
    /// Replaces the `https://{bucket}.s3.amazonaws.com` (or path-style
    /// endpoint) locator prefix.
    pub public_base_url: Option<String>,
    pub put_timeout: Duration,
}

impl StorageConfig {
    /// Public locator for an object stored under `key`.
    ///
    /// An explicit base URL wins. With a custom endpoint the object is
    /// addressed path-style, the same way the client writes it.
    pub fn public_url(&self, key: &StorageKey) -> String {
        match (&self.public_base_url, &self.endpoint) {
            (Some(base), _) => format!("{}/{}", base, key),
            (None, Some(endpoint)) => format!("{}/{}/{}", endpoint, self.bucket_name, key),
            (None, None) => format!("https://{}.s3.amazonaws.com/{}", self.bucket_name, key),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("public_base_url", &self.public_base_url)
            .field("put_timeout", &self.put_timeout)
            .finish()
    }
}

fn ensure_http_url(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must start with http:// or https://".into(),
        })
    }
}

/// Validate bucket name format.
///
/// The bucket becomes a DNS label in the public locator, so it must follow
/// S3 naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn ensure_bucket_name_valid(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: BUCKET_VAR,
        value: name.to_string(),
        reason: reason.to_string(),
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with('.') || name.ends_with('.') || name.starts_with('-') || name.ends_with('-')
    {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
