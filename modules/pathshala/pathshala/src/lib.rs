#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Pathshala client implementation.
//!
//! Wire models and the API trait live in `pathshala-sdk` and are
//! re-exported here. [`PathshalaClient`] wires the HTTP API client, the
//! tenant and session stores, the settings service and the bootstrap gate.

pub use pathshala_sdk::{
    ContactInfoUpdate, Credentials, Envelope, FieldError, GeneralInfoUpdate, LeadershipUpdate,
    LogoUpload, Pathshala, PathshalaApi, PathshalaError, PathshalaType, SessionUser, TenantSlug,
};

pub mod client;
pub mod config;
pub mod domain;
pub mod storage;
pub mod tenant;

#[cfg(test)]
pub mod test_support;

pub use client::PathshalaClient;
pub use config::PathshalaConfig;
pub use domain::bootstrap::{Action, Bootstrap, BootstrapContext, BootstrapState};
pub use domain::dashboard::{DashboardView, OnboardingBanner, dashboard};
pub use domain::session_store::{SessionState, SessionStore};
pub use domain::settings::SettingsService;
pub use domain::tenant_store::{TenantState, TenantStore};
pub use storage::{ClientStorage, FileStorage, MemoryStorage, StorageError};
pub use tenant::TenantResolver;
