#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pathshala_sdk::{
    ContactInfoUpdate, Credentials, Envelope, GeneralInfoUpdate, LeadershipUpdate, LoginResponse,
    LogoUpload, Pathshala, PathshalaApi, PathshalaError, SessionUser, TenantSlug,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// Canned answer of the fake backend.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(Option<T>),
    Rejected(&'static str),
    Status(u16, &'static str),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<Envelope<T>, PathshalaError> {
        match self {
            Reply::Ok(result) => Ok(Envelope {
                success: true,
                message: None,
                result,
            }),
            Reply::Rejected(message) => Ok(Envelope {
                success: false,
                message: Some(message.to_owned()),
                result: None,
            }),
            Reply::Status(status, detail) => Err(PathshalaError::from_status(
                status,
                json!({ "detail": detail }).to_string().as_bytes(),
                None,
            )),
        }
    }
}

/// Replies are consumed in order; the last one repeats.
struct Script<T>(Mutex<VecDeque<Reply<T>>>);

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self(Mutex::new(VecDeque::from([Reply::Status(
            500,
            "not scripted",
        )])))
    }

    fn set(&self, replies: Vec<Reply<T>>) {
        *self.0.lock() = replies.into();
    }

    fn next(&self) -> Reply<T> {
        let mut queue = self.0.lock();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

/// In-memory [`PathshalaApi`] recording every call.
pub struct FakeApi {
    tenant: Script<Pathshala>,
    user: Script<SessionUser>,
    login: Script<LoginResponse>,
    save: Script<Pathshala>,
    logout_status: Mutex<Option<u16>>,
    tenant_gate: Mutex<Option<Arc<Notify>>>,
    user_gate: Mutex<Option<Arc<Notify>>>,
    user_slugs: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tenant: Script::new(),
            user: Script::new(),
            login: Script::new(),
            save: Script::new(),
            logout_status: Mutex::new(None),
            tenant_gate: Mutex::new(None),
            user_gate: Mutex::new(None),
            user_slugs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn tenant_replies(&self, replies: Vec<Reply<Pathshala>>) {
        self.tenant.set(replies);
    }

    pub fn user_replies(&self, replies: Vec<Reply<SessionUser>>) {
        self.user.set(replies);
    }

    pub fn login_replies(&self, replies: Vec<Reply<LoginResponse>>) {
        self.login.set(replies);
    }

    pub fn save_replies(&self, replies: Vec<Reply<Pathshala>>) {
        self.save.set(replies);
    }

    pub fn fail_logout(&self, status: u16) {
        *self.logout_status.lock() = Some(status);
    }

    /// Hold `verify_tenant` until the returned handle is notified.
    pub fn hold_tenant(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.tenant_gate.lock() = Some(gate.clone());
        gate
    }

    /// Hold `logged_in_user` until the returned handle is notified.
    pub fn hold_user(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.user_gate.lock() = Some(gate.clone());
        gate
    }

    /// Tenant header of every `logged_in_user` call, in order.
    pub fn user_slugs(&self) -> Vec<String> {
        self.user_slugs.lock().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl PathshalaApi for FakeApi {
    async fn verify_tenant(
        &self,
        slug: &TenantSlug,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        self.record("verify_tenant");
        let gate = self.tenant_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut reply = self.tenant.next();
        if let Reply::Ok(Some(tenant)) = &mut reply {
            tenant.subdomain = slug.as_str().to_owned();
        }
        reply.into_result()
    }

    async fn logged_in_user(
        &self,
        slug: &TenantSlug,
    ) -> Result<Envelope<SessionUser>, PathshalaError> {
        self.record("logged_in_user");
        self.user_slugs.lock().push(slug.as_str().to_owned());
        let gate = self.user_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.user.next().into_result()
    }

    async fn login(
        &self,
        _slug: &TenantSlug,
        credentials: &Credentials,
    ) -> Result<Envelope<LoginResponse>, PathshalaError> {
        self.record(format!("login:{}", credentials.user_name));
        self.login.next().into_result()
    }

    async fn logout(&self) -> Result<(), PathshalaError> {
        self.record("logout");
        match *self.logout_status.lock() {
            Some(status) => Err(PathshalaError::from_status(status, b"", None)),
            None => Ok(()),
        }
    }

    async fn update_general(
        &self,
        _slug: &TenantSlug,
        tenant_id: &str,
        _update: &GeneralInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        self.record(format!("update_general:{tenant_id}"));
        self.save.next().into_result()
    }

    async fn update_contact(
        &self,
        _slug: &TenantSlug,
        tenant_id: &str,
        _update: &ContactInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        self.record(format!("update_contact:{tenant_id}"));
        self.save.next().into_result()
    }

    async fn update_leadership(
        &self,
        _slug: &TenantSlug,
        tenant_id: &str,
        _update: &LeadershipUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        self.record(format!("update_leadership:{tenant_id}"));
        self.save.next().into_result()
    }

    async fn update_logo(
        &self,
        _slug: &TenantSlug,
        tenant_id: &str,
        _upload: &LogoUpload,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        self.record(format!("update_logo:{tenant_id}"));
        self.save.next().into_result()
    }
}

#[must_use]
pub fn tenant(name: &str) -> Pathshala {
    serde_json::from_value(json!({
        "pathshalaId": "c0ffee00-0000-4000-8000-000000000001",
        "pathshalaName": name,
        "pathshalaCode": "VK_LEARNING_001",
        "pathshalaType": "school",
        "subdomain": "vk-learnings",
        "tier": "free",
        "enabled": true
    }))
    .unwrap()
}

#[must_use]
pub fn user(name: &str, permissions: &[&str]) -> SessionUser {
    serde_json::from_value(json!({
        "userId": 42,
        "userName": name,
        "name": "Asha Verma",
        "permissions": permissions
    }))
    .unwrap()
}

#[must_use]
pub fn login_response(user_name: &str) -> LoginResponse {
    serde_json::from_value(json!({
        "userName": user_name,
        "accessToken": "access-1",
        "refreshToken": "refresh-1",
        "expiresIn": 3600,
        "type": "Bearer"
    }))
    .unwrap()
}
