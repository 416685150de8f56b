//! Dashboard view model: onboarding banner and setup progress.

use pathshala_sdk::{Pathshala, SessionUser};
use serde::Serialize;

/// Permission flag of users allowed to complete the tenant setup.
pub const SETUP_PERMISSION: &str = "3";

const CHECKLIST: [(&str, u8); 4] = [
    ("Account Created", 25),
    ("Principal Details", 50),
    ("Email Verification", 75),
    ("Company Logo", 100),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub label: &'static str,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingBanner {
    /// Percent, one of 25, 75 or 100.
    pub progress: u8,
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub tenant_name: String,
    pub user_name: String,
    pub onboarding: Option<OnboardingBanner>,
}

/// 25 without contact info, 75 with contact info but no logo, 100 with both.
#[must_use]
pub fn setup_progress(tenant: &Pathshala) -> u8 {
    match (tenant.contact_info.is_some(), tenant.logo_details.is_some()) {
        (false, _) => 25,
        (true, false) => 75,
        (true, true) => 100,
    }
}

#[must_use]
pub fn checklist(progress: u8) -> Vec<ChecklistItem> {
    CHECKLIST
        .iter()
        .map(|&(label, threshold)| ChecklistItem {
            label,
            completed: progress >= threshold,
        })
        .collect()
}

/// The banner is shown only to users holding [`SETUP_PERMISSION`] while the
/// tenant has no contact info.
#[must_use]
pub fn dashboard(tenant: &Pathshala, user: &SessionUser) -> DashboardView {
    let onboarding = (user.has_permission(SETUP_PERMISSION) && tenant.contact_info.is_none())
        .then(|| {
            let progress = setup_progress(tenant);
            OnboardingBanner {
                progress,
                checklist: checklist(progress),
            }
        });

    DashboardView {
        tenant_name: tenant.pathshala_name.clone(),
        user_name: user.user_name.clone(),
        onboarding,
    }
}
