//! Pathshala SDK
//!
//! Public surface of the `pathshala` module:
//!
//! - [`PathshalaApi`] - backend API trait implemented by the HTTP client
//!   and by test doubles
//! - [`Pathshala`], [`SessionUser`], [`Envelope`] and friends - wire models
//! - [`PathshalaError`] - error taxonomy with the normalized
//!   `{status, message, data}` view
//!
//! ## Usage
//!
//! ```ignore
//! use pathshala_sdk::{PathshalaApi, TenantSlug};
//!
//! let slug = TenantSlug::new("vk-learnings");
//! let envelope = api.verify_tenant(&slug).await?;
//! let tenant = envelope.into_result()?;
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::PathshalaApi;
pub use error::{FieldError, PathshalaError};
pub use models::{
    ContactInfo, ContactInfoUpdate, Credentials, Envelope, FileDetails, GeneralInfoUpdate,
    LeadershipUpdate, LoginResponse, LogoUpload, Pathshala, PathshalaType, SessionUser,
    TenantSlug,
};
