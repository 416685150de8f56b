//! Wire models for the Pathshala backend.
//!
//! Field names follow the backend's camelCase JSON.

use crate::error::PathshalaError;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subdomain that identifies a tenant, sent as `X-PATHSHALA-ID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantSlug(String);

impl TenantSlug {
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response wrapper used by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `success: false` into
    /// [`PathshalaError::Rejected`].
    ///
    /// # Errors
    /// Returns `Rejected` with the envelope message when `success` is false.
    pub fn into_result(self) -> Result<Option<T>, PathshalaError> {
        if self.success {
            Ok(self.result)
        } else {
            Err(PathshalaError::Rejected {
                message: self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Request was rejected".to_owned()),
            })
        }
    }
}

/// Kind of institution a tenant represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathshalaType {
    School,
    College,
    Coaching,
}

impl PathshalaType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PathshalaType::School => "school",
            PathshalaType::College => "college",
            PathshalaType::Coaching => "coaching",
        }
    }
}

impl FromStr for PathshalaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "school" => Ok(PathshalaType::School),
            "college" => Ok(PathshalaType::College),
            "coaching" => Ok(PathshalaType::Coaching),
            other => Err(format!(
                "unknown pathshala type '{other}' (expected school, college or coaching)"
            )),
        }
    }
}

/// Tenant record as returned by `GET /pathshala/verify/{subdomain}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathshala {
    pub pathshala_id: String,
    pub pathshala_name: String,
    pub pathshala_code: String,
    pub pathshala_type: String,
    pub subdomain: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub updated_on: String,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub logo_details: Option<FileDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub pathshala_contact_info_id: i64,
    #[serde(default)]
    pub primary_phone: Option<String>,
    #[serde(default)]
    pub secondary_phone: Option<String>,
    #[serde(default)]
    pub fax_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alternate_email: Option<String>,
    #[serde(default)]
    pub principal_name: Option<String>,
    #[serde(default)]
    pub principal_phone: Option<String>,
    #[serde(default)]
    pub principal_email: Option<String>,
    #[serde(default)]
    pub admin_contact_name: Option<String>,
    #[serde(default)]
    pub admin_contact_phone: Option<String>,
}

/// Uploaded file, used for the tenant logo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub file_details_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_base64: String,
    pub file_extension: String,
}

/// Authenticated user as returned by `GET /user/loggedin-user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: i64,
    pub user_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "permission_flags")]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub account_locked: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl SessionUser {
    #[must_use]
    pub fn has_permission(&self, flag: &str) -> bool {
        self.permissions.iter().any(|p| p == flag)
    }
}

/// Accepts `["3", 4]` and normalizes every flag to a string.
fn permission_flags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Number(i64),
    }

    let flags = Option::<Vec<Flag>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(flags
        .into_iter()
        .map(|flag| match flag {
            Flag::Text(s) => s,
            Flag::Number(n) => n.to_string(),
        })
        .collect())
}

/// Login form input. The password never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_name: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Result of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_name: String,
    #[serde(deserialize_with = "secret")]
    pub access_token: SecretString,
    #[serde(deserialize_with = "secret")]
    pub refresh_token: SecretString,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(rename = "type", default)]
    pub token_type: String,
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Body of `POST /pathshala/update-general/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralInfoUpdate {
    pub pathshala_name: String,
    pub pathshala_code: String,
    pub pathshala_type: String,
    pub subdomain: String,
}

/// Body of `POST /pathshala/update-contact/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoUpdate {
    pub primary_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax_number: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_email: Option<String>,
}

/// Body of `POST /pathshala/update-leadership/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadershipUpdate {
    pub principal_name: String,
    pub principal_phone: String,
    pub principal_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_contact_phone: Option<String>,
}

/// Body of `POST /pathshala/update-logo/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoUpload {
    pub file_name: String,
    pub file_type: String,
    pub file_base64: String,
    pub file_extension: String,
}
