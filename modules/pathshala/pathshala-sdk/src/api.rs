//! Backend API trait.
//!
//! The `pathshala` crate implements this over HTTP with bearer auth and
//! refresh-on-401. Stores depend only on the trait, so tests can swap in
//! an in-memory fake.

use async_trait::async_trait;

use crate::error::PathshalaError;
use crate::models::{
    ContactInfoUpdate, Credentials, Envelope, GeneralInfoUpdate, LeadershipUpdate, LoginResponse,
    LogoUpload, Pathshala, SessionUser, TenantSlug,
};

/// Operations offered by the Pathshala backend.
///
/// Every method returns the decoded envelope. Transport failures and
/// non-2xx statuses are errors; `success: false` is left to the caller,
/// see [`Envelope::into_result`].
#[async_trait]
pub trait PathshalaApi: Send + Sync {
    /// `GET /pathshala/verify/{slug}`
    async fn verify_tenant(&self, slug: &TenantSlug)
    -> Result<Envelope<Pathshala>, PathshalaError>;

    /// `GET /user/loggedin-user`, scoped by `X-PATHSHALA-ID`.
    async fn logged_in_user(
        &self,
        slug: &TenantSlug,
    ) -> Result<Envelope<SessionUser>, PathshalaError>;

    /// `POST /auth/login`, scoped by `X-PATHSHALA-ID`.
    async fn login(
        &self,
        slug: &TenantSlug,
        credentials: &Credentials,
    ) -> Result<Envelope<LoginResponse>, PathshalaError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<(), PathshalaError>;

    /// `POST /pathshala/update-general/{tenant_id}`
    async fn update_general(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &GeneralInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError>;

    /// `POST /pathshala/update-contact/{tenant_id}`
    async fn update_contact(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &ContactInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError>;

    /// `POST /pathshala/update-leadership/{tenant_id}`
    async fn update_leadership(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &LeadershipUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError>;

    /// `POST /pathshala/update-logo/{tenant_id}`
    async fn update_logo(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        upload: &LogoUpload,
    ) -> Result<Envelope<Pathshala>, PathshalaError>;
}
