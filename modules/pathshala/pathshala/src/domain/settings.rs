//! Tenant settings: validation and saves for the four settings sections.

use pathshala_sdk::{
    ContactInfoUpdate, Envelope, FieldError, GeneralInfoUpdate, LeadershipUpdate, LogoUpload,
    Pathshala, PathshalaApi, PathshalaError, PathshalaType, TenantSlug,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::tenant_store::{TenantState, TenantStore};

/// Largest accepted logo after base64 decoding.
pub const MAX_LOGO_BYTES: usize = 300 * 1024;

#[allow(clippy::expect_used)] // literal patterns
static SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("static regex should not panic")
});
#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 -]{5,18}[0-9]$").expect("static regex should not panic")
});
#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex should not panic")
});

struct Checks(Vec<FieldError>);

impl Checks {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn required(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.0.push(FieldError::new(field, "is required"));
            return false;
        }
        true
    }

    fn phone(&mut self, field: &'static str, value: &str) {
        if !PHONE_RE.is_match(value.trim()) {
            self.0.push(FieldError::new(field, "is not a valid phone number"));
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if !EMAIL_RE.is_match(value.trim()) {
            self.0.push(FieldError::new(field, "is not a valid e-mail address"));
        }
    }

    fn optional_phone(&mut self, field: &'static str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.phone(field, value);
        }
    }

    fn optional_email(&mut self, field: &'static str, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.email(field, value);
        }
    }

    fn finish(self) -> Result<(), PathshalaError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(PathshalaError::Validation(self.0))
        }
    }
}

/// # Errors
/// Returns `PathshalaError::Validation` listing every invalid field.
pub fn validate_general(update: &GeneralInfoUpdate) -> Result<(), PathshalaError> {
    let mut checks = Checks::new();
    checks.required("pathshalaName", &update.pathshala_name);
    checks.required("pathshalaCode", &update.pathshala_code);
    if let Err(reason) = update.pathshala_type.parse::<PathshalaType>() {
        checks.0.push(FieldError::new("pathshalaType", reason));
    }
    if checks.required("subdomain", &update.subdomain) && !SUBDOMAIN_RE.is_match(&update.subdomain)
    {
        checks.0.push(FieldError::new(
            "subdomain",
            "may contain only lowercase letters, digits and inner hyphens",
        ));
    }
    checks.finish()
}

/// # Errors
/// Returns `PathshalaError::Validation` listing every invalid field.
pub fn validate_contact(update: &ContactInfoUpdate) -> Result<(), PathshalaError> {
    let mut checks = Checks::new();
    if checks.required("primaryPhone", &update.primary_phone) {
        checks.phone("primaryPhone", &update.primary_phone);
    }
    checks.optional_phone("secondaryPhone", update.secondary_phone.as_deref());
    checks.optional_phone("faxNumber", update.fax_number.as_deref());
    if checks.required("email", &update.email) {
        checks.email("email", &update.email);
    }
    checks.optional_email("alternateEmail", update.alternate_email.as_deref());
    checks.finish()
}

/// # Errors
/// Returns `PathshalaError::Validation` listing every invalid field.
pub fn validate_leadership(update: &LeadershipUpdate) -> Result<(), PathshalaError> {
    let mut checks = Checks::new();
    checks.required("principalName", &update.principal_name);
    checks.phone("principalPhone", &update.principal_phone);
    checks.email("principalEmail", &update.principal_email);
    checks.optional_phone("adminContactPhone", update.admin_contact_phone.as_deref());
    checks.finish()
}

/// Strip a `data:<mime>;base64,` prefix if present.
#[must_use]
pub fn base64_payload(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, payload)| payload),
        None => raw,
    }
}

/// Decoded size of a base64 payload, ceil(len * 3 / 4).
#[must_use]
pub fn decoded_len(base64: &str) -> usize {
    (base64_payload(base64).len() * 3).div_ceil(4)
}

/// # Errors
/// Returns `PathshalaError::Validation` listing every invalid field.
pub fn validate_logo(upload: &LogoUpload) -> Result<(), PathshalaError> {
    let mut checks = Checks::new();
    checks.required("fileName", &upload.file_name);
    if !upload.file_type.starts_with("image/") {
        checks
            .0
            .push(FieldError::new("fileType", "must be an image/* MIME type"));
    }
    if checks.required("fileBase64", base64_payload(&upload.file_base64)) {
        let size = decoded_len(&upload.file_base64);
        if size > MAX_LOGO_BYTES {
            checks.0.push(FieldError::new(
                "fileBase64",
                format!("image is {size} bytes; the limit is {MAX_LOGO_BYTES} bytes"),
            ));
        }
    }
    checks.finish()
}

/// Saves settings sections and merges the result into the tenant store.
pub struct SettingsService {
    api: Arc<dyn PathshalaApi>,
    tenants: Arc<TenantStore>,
}

impl SettingsService {
    #[must_use]
    pub fn new(api: Arc<dyn PathshalaApi>, tenants: Arc<TenantStore>) -> Self {
        Self { api, tenants }
    }

    fn target(&self) -> Result<(TenantSlug, String), PathshalaError> {
        match (self.tenants.slug(), self.tenants.tenant()) {
            (Some(slug), Some(tenant)) => Ok((slug, tenant.pathshala_id)),
            _ => Err(PathshalaError::Rejected {
                message: "No pathshala is loaded".to_owned(),
            }),
        }
    }

    /// Take the saved tenant from the envelope, or re-fetch when the
    /// backend returned none.
    async fn apply(
        &self,
        slug: &TenantSlug,
        envelope: Envelope<Pathshala>,
    ) -> Result<Pathshala, PathshalaError> {
        if let Some(tenant) = envelope.into_result()? {
            self.tenants.replace(tenant.clone());
            return Ok(tenant);
        }

        tracing::debug!("save returned no tenant; re-fetching");
        match self.tenants.fetch(slug).await {
            TenantState::Loaded(tenant) => Ok(tenant),
            TenantState::Failed { message } => Err(PathshalaError::Rejected { message }),
            TenantState::Idle | TenantState::Loading => Err(PathshalaError::Rejected {
                message: "Pathshala reload did not complete".to_owned(),
            }),
        }
    }

    /// # Errors
    /// Validation, transport, HTTP or envelope errors.
    #[tracing::instrument(skip_all)]
    pub async fn update_general(
        &self,
        update: &GeneralInfoUpdate,
    ) -> Result<Pathshala, PathshalaError> {
        validate_general(update)?;
        let (slug, id) = self.target()?;
        let envelope = self.api.update_general(&slug, &id, update).await?;
        self.apply(&slug, envelope).await
    }

    /// # Errors
    /// Validation, transport, HTTP or envelope errors.
    #[tracing::instrument(skip_all)]
    pub async fn update_contact(
        &self,
        update: &ContactInfoUpdate,
    ) -> Result<Pathshala, PathshalaError> {
        validate_contact(update)?;
        let (slug, id) = self.target()?;
        let envelope = self.api.update_contact(&slug, &id, update).await?;
        self.apply(&slug, envelope).await
    }

    /// # Errors
    /// Validation, transport, HTTP or envelope errors.
    #[tracing::instrument(skip_all)]
    pub async fn update_leadership(
        &self,
        update: &LeadershipUpdate,
    ) -> Result<Pathshala, PathshalaError> {
        validate_leadership(update)?;
        let (slug, id) = self.target()?;
        let envelope = self.api.update_leadership(&slug, &id, update).await?;
        self.apply(&slug, envelope).await
    }

    /// # Errors
    /// Validation, transport, HTTP or envelope errors.
    #[tracing::instrument(skip_all)]
    pub async fn update_logo(&self, upload: &LogoUpload) -> Result<Pathshala, PathshalaError> {
        validate_logo(upload)?;
        let (slug, id) = self.target()?;
        let envelope = self.api.update_logo(&slug, &id, upload).await?;
        self.apply(&slug, envelope).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn fields(err: PathshalaError) -> Vec<&'static str> {
        match err {
            PathshalaError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn general() -> GeneralInfoUpdate {
        GeneralInfoUpdate {
            pathshala_name: "VK Learning Center".to_owned(),
            pathshala_code: "VK_LEARNING_001".to_owned(),
            pathshala_type: "school".to_owned(),
            subdomain: "vk-learnings".to_owned(),
        }
    }

    #[test]
    fn general_accepts_valid_input() {
        validate_general(&general()).unwrap();
    }

    #[test]
    fn general_rejects_bad_fields() {
        let update = GeneralInfoUpdate {
            pathshala_name: "  ".to_owned(),
            pathshala_type: "university".to_owned(),
            subdomain: "-VK_".to_owned(),
            ..general()
        };
        assert_eq!(
            fields(validate_general(&update).unwrap_err()),
            vec!["pathshalaName", "pathshalaType", "subdomain"]
        );
    }

    #[test]
    fn contact_validation() {
        let valid = ContactInfoUpdate {
            primary_phone: "+91 98765-43210".to_owned(),
            secondary_phone: Some("+91 22-1234567".to_owned()),
            fax_number: None,
            email: "contact@vklearning.edu.in".to_owned(),
            alternate_email: Some(String::new()),
        };
        validate_contact(&valid).unwrap();

        let invalid = ContactInfoUpdate {
            primary_phone: "12ab".to_owned(),
            email: "contact.vklearning.edu.in".to_owned(),
            alternate_email: Some("admin@".to_owned()),
            ..valid
        };
        assert_eq!(
            fields(validate_contact(&invalid).unwrap_err()),
            vec!["primaryPhone", "email", "alternateEmail"]
        );
    }

    #[test]
    fn leadership_requires_principal() {
        let update = LeadershipUpdate {
            principal_name: String::new(),
            principal_phone: "+91 99999-88888".to_owned(),
            principal_email: "principal@vklearning.edu.in".to_owned(),
            admin_contact_name: Some("Mr. Rajesh Singh".to_owned()),
            admin_contact_phone: Some("123".to_owned()),
        };
        assert_eq!(
            fields(validate_leadership(&update).unwrap_err()),
            vec!["principalName", "adminContactPhone"]
        );
    }

    #[test]
    fn decoded_len_rounds_up() {
        assert_eq!(decoded_len(""), 0);
        assert_eq!(decoded_len("QQ=="), 3);
        assert_eq!(decoded_len("QUJD"), 3);
        assert_eq!(decoded_len("QUJDRA"), 5);
        assert_eq!(decoded_len("data:image/png;base64,QUJD"), 3);
        assert_eq!(base64_payload("data:image/png;base64,"), "");
    }

    #[test]
    fn logo_limits() {
        let small = LogoUpload {
            file_name: "logo.png".to_owned(),
            file_type: "image/png".to_owned(),
            file_base64: "iVBORw0KGgo=".to_owned(),
            file_extension: "png".to_owned(),
        };
        validate_logo(&small).unwrap();

        // 409_600 base64 chars decode to 307_200 bytes, exactly the limit
        let at_limit = LogoUpload {
            file_base64: "A".repeat(409_600),
            ..small.clone()
        };
        validate_logo(&at_limit).unwrap();

        let too_big = LogoUpload {
            file_base64: "A".repeat(409_601),
            ..small.clone()
        };
        assert_eq!(fields(validate_logo(&too_big).unwrap_err()), vec!["fileBase64"]);

        let not_image = LogoUpload {
            file_type: "application/pdf".to_owned(),
            ..small
        };
        assert_eq!(fields(validate_logo(&not_image).unwrap_err()), vec!["fileType"]);
    }
}
