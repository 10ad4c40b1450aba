//! In-process stand-in for the EduPlatform backend.
//!
//! Implements every action both apps call over in-memory users, content and
//! permissions, and records each request body in arrival order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{Json, Router, extract::State, routing::post};
use chrono::NaiveDate;
use eduplatform_core::api::ApiConfig;
use eduplatform_core::{
    ContentType, ContentTypeUpdate, Envelope, PermissionUpdate, ReleaseDateEntry,
    SESSION_EXPIRED_MESSAGE, StatusField,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Password of every seeded learner.
pub const LEARNER_PASSWORD: &str = "secret1";
/// Seeded admin credentials.
pub const ADMIN_EMAIL: &str = "admin@eduplatform.test";
pub const ADMIN_PASSWORD: &str = "adminpass";

/// A learner account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub auth_provider: String,
    pub is_paid: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "email": self.email,
            "name": self.name,
            "auth_provider": self.auth_provider,
            "is_paid": self.is_paid,
            "is_active": self.is_active,
            "created_at": self.created_at,
        })
    }
}

/// A content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContent {
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub content_type: ContentType,
    pub description: String,
}

/// Initial backend data.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub users: Vec<FakeUser>,
    pub content: Vec<FakeContent>,
    /// `(user_id, content_id) -> has_access`.
    pub permissions: Vec<(String, String, bool)>,
    /// `(user_id, content_id, date)`.
    pub release_dates: Vec<(String, String, NaiveDate)>,
}

impl Seed {
    /// Three active users (U1 and U2 paid, U3 free) and one item per tier.
    ///
    /// U1 has access to the paid item C2, released on 2025-01-31, and no
    /// access to the VIP item C3.
    #[must_use]
    pub fn standard() -> Self {
        let user = |id: &str, email: &str, name: &str, is_paid: bool| FakeUser {
            user_id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            password: LEARNER_PASSWORD.to_string(),
            auth_provider: "email".to_string(),
            is_paid,
            is_active: true,
            created_at: "2024-03-05T08:30:00Z".to_string(),
        };
        let item = |id: &str, title: &str, url: &str, content_type| FakeContent {
            content_id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            content_type,
            description: String::new(),
        };

        Self {
            users: vec![
                user("U1", "ming@example.com", "Ming", true),
                user("U2", "hua@example.com", "Hua", true),
                user("U3", "li@example.com", "Li", false),
            ],
            content: vec![
                item("C1", "Intro", "https://youtu.be/dQw4w9WgXcQ", ContentType::Free),
                item(
                    "C2",
                    "Deep dive",
                    "https://www.youtube.com/watch?v=9bZkp7q19f0",
                    ContentType::Paid,
                ),
                item("C3", "Masterclass", "https://youtu.be/kJQP7kiw5Fk", ContentType::Vip),
            ],
            permissions: vec![
                ("U1".to_string(), "C2".to_string(), true),
                ("U1".to_string(), "C3".to_string(), false),
            ],
            release_dates: vec![(
                "U1".to_string(),
                "C2".to_string(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap_or_default(),
            )],
        }
    }
}

#[derive(Debug, Clone)]
enum Principal {
    Learner(String),
    Admin,
}

#[derive(Debug, Default)]
struct Store {
    users: Vec<FakeUser>,
    content: Vec<FakeContent>,
    permissions: HashMap<String, BTreeMap<String, bool>>,
    release_dates: HashMap<String, BTreeMap<String, NaiveDate>>,
    tokens: HashMap<String, Principal>,
    expired: HashSet<String>,
    /// Actions answered with a fixed error message.
    rejected: HashMap<String, String>,
    issued: u32,
    next_user: u32,
    next_content: u32,
    calls: Vec<Value>,
}

type Reply = Result<Value, String>;

impl Store {
    fn new(seed: Seed) -> Self {
        let mut store = Self {
            next_user: u32::try_from(seed.users.len()).unwrap_or(0) + 1,
            next_content: u32::try_from(seed.content.len()).unwrap_or(0) + 1,
            users: seed.users,
            content: seed.content,
            ..Self::default()
        };
        for (user_id, content_id, has_access) in seed.permissions {
            store
                .permissions
                .entry(user_id)
                .or_default()
                .insert(content_id, has_access);
        }
        for (user_id, content_id, date) in seed.release_dates {
            store
                .release_dates
                .entry(user_id)
                .or_default()
                .insert(content_id, date);
        }
        store
    }

    fn handle(&mut self, body: Value) -> Envelope {
        self.calls.push(body.clone());

        let action = body.get("action").and_then(Value::as_str).unwrap_or("");
        if let Some(message) = self.rejected.get(action) {
            return Envelope::failure(message.clone());
        }
        let reply = match action {
            "login" => self.login(&body),
            "register" => self.register(&body),
            "googleLogin" => self.google_login(&body),
            "getContent" => self.learner_content(&body),
            "adminLogin" => self.admin_login(&body),
            "getAllUsers" => self.admin(&body).map(|()| self.all_users()),
            "getAllContent" => self.admin(&body).map(|()| self.all_content()),
            "getUserPermissions" => self.with_admin(&body, Self::user_permissions),
            "getUserReleaseDate" => self.with_admin(&body, Self::user_release_dates),
            "updateUserPermissions" => self.with_admin(&body, Self::update_permissions),
            "updateUserReleaseDate" => self.with_admin(&body, Self::update_release_dates),
            "updateUserStatus" => self.with_admin(&body, Self::update_status),
            "deleteUser" => self.with_admin(&body, Self::delete_user),
            "addContent" => self.with_admin(&body, Self::add_content),
            "updateContent" => self.with_admin(&body, Self::update_content),
            "deleteContent" => self.with_admin(&body, Self::delete_content),
            "updateContentTypes" => self.with_admin(&body, Self::update_content_types),
            "getStats" => self.admin(&body).map(|()| self.stats()),
            other => Err(format!("Unknown action: {other}")),
        };

        match reply {
            Ok(data) => Envelope::success(data),
            Err(message) => Envelope::failure(message),
        }
    }

    fn issue(&mut self, principal: Principal) -> String {
        self.issued += 1;
        let token = format!("tok-{}", self.issued);
        self.tokens.insert(token.clone(), principal);
        token
    }

    fn principal(&self, body: &Value) -> Result<&Principal, String> {
        let token = str_field(body, "token")?;
        if self.expired.contains(token) {
            return Err(SESSION_EXPIRED_MESSAGE.to_string());
        }
        self.tokens
            .get(token)
            .ok_or_else(|| SESSION_EXPIRED_MESSAGE.to_string())
    }

    fn admin(&self, body: &Value) -> Result<(), String> {
        match self.principal(body)? {
            Principal::Admin => Ok(()),
            Principal::Learner(_) => Err("Unauthorized".to_string()),
        }
    }

    fn with_admin(&mut self, body: &Value, action: fn(&mut Self, &Value) -> Reply) -> Reply {
        self.admin(body)?;
        action(self, body)
    }

    fn session_json(token: &str, user: &FakeUser) -> Value {
        json!({
            "token": token,
            "name": user.name,
            "email": user.email,
            "userId": user.user_id,
        })
    }

    fn login(&mut self, body: &Value) -> Reply {
        let email = str_field(body, "email")?;
        let password = str_field(body, "password")?;
        let user = self
            .users
            .iter()
            .find(|u| u.email == email && u.password == password)
            .cloned()
            .ok_or_else(|| "Invalid email or password".to_string())?;
        if !user.is_active {
            return Err("Account disabled".to_string());
        }
        let token = self.issue(Principal::Learner(user.user_id.clone()));
        Ok(Self::session_json(&token, &user))
    }

    fn create_user(&mut self, name: &str, email: &str, password: &str, provider: &str) -> FakeUser {
        let user = FakeUser {
            user_id: format!("U{}", self.next_user),
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            auth_provider: provider.to_string(),
            is_paid: false,
            is_active: true,
            created_at: "2025-06-01T00:00:00Z".to_string(),
        };
        self.next_user += 1;
        self.users.push(user.clone());
        user
    }

    fn register(&mut self, body: &Value) -> Reply {
        let name = str_field(body, "name")?;
        let email = str_field(body, "email")?;
        let password = str_field(body, "password")?;
        if self.users.iter().any(|u| u.email == email) {
            return Err("Email already registered".to_string());
        }
        self.create_user(name, email, password, "email");
        Ok(json!({}))
    }

    /// Accepts credentials of the form `google:<email>`.
    fn google_login(&mut self, body: &Value) -> Reply {
        let credential = str_field(body, "credential")?;
        let email = credential
            .strip_prefix("google:")
            .ok_or_else(|| "Invalid Google credential".to_string())?;
        let user = match self.users.iter().find(|u| u.email == email) {
            Some(user) => user.clone(),
            None => {
                let name = email.split('@').next().unwrap_or(email).to_string();
                self.create_user(&name, email, "", "google")
            }
        };
        let token = self.issue(Principal::Learner(user.user_id.clone()));
        Ok(Self::session_json(&token, &user))
    }

    fn admin_login(&mut self, body: &Value) -> Reply {
        let email = str_field(body, "email")?;
        let password = str_field(body, "password")?;
        if email != ADMIN_EMAIL || password != ADMIN_PASSWORD {
            return Err("Invalid admin credentials".to_string());
        }
        let token = self.issue(Principal::Admin);
        Ok(json!({"token": token, "name": "Admin", "email": ADMIN_EMAIL}))
    }

    fn has_access(&self, user_id: &str, content_id: &str) -> bool {
        self.permissions
            .get(user_id)
            .and_then(|p| p.get(content_id))
            .copied()
            .unwrap_or(false)
    }

    fn learner_content(&self, body: &Value) -> Reply {
        let user_id = match self.principal(body)? {
            Principal::Learner(id) => id.clone(),
            Principal::Admin => return Err("Unauthorized".to_string()),
        };
        let content: Vec<Value> = self
            .content
            .iter()
            .map(|item| {
                let unlocked = item.content_type == ContentType::Free
                    || self.has_access(&user_id, &item.content_id);
                json!({
                    "content_id": item.content_id,
                    "title": item.title,
                    "url": item.url,
                    "type": item.content_type,
                    "isUnlocked": unlocked,
                })
            })
            .collect();
        Ok(json!({ "content": content }))
    }

    fn all_users(&self) -> Value {
        let users: Vec<Value> = self.users.iter().map(FakeUser::to_json).collect();
        json!({ "users": users })
    }

    fn all_content(&self) -> Value {
        let content: Vec<Value> = self
            .content
            .iter()
            .map(|item| {
                let access_count = self
                    .permissions
                    .values()
                    .filter(|p| p.get(&item.content_id).copied().unwrap_or(false))
                    .count();
                json!({
                    "content_id": item.content_id,
                    "title": item.title,
                    "url": item.url,
                    "content_type": item.content_type,
                    "description": item.description,
                    "access_count": access_count,
                })
            })
            .collect();
        json!({ "content": content })
    }

    fn known_user<'a>(&self, body: &'a Value) -> Result<&'a str, String> {
        let user_id = str_field(body, "userId")?;
        if self.users.iter().any(|u| u.user_id == user_id) {
            Ok(user_id)
        } else {
            Err("User not found".to_string())
        }
    }

    fn user_permissions(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?;
        let dates = self.release_dates.get(user_id);
        let permissions: Vec<Value> = self
            .content
            .iter()
            .map(|item| {
                json!({
                    "content_id": item.content_id,
                    "title": item.title,
                    "content_type": item.content_type,
                    "has_access": self.has_access(user_id, &item.content_id),
                    "release_date": dates.and_then(|d| d.get(&item.content_id)),
                })
            })
            .collect();
        Ok(json!({ "permissions": permissions }))
    }

    fn user_release_dates(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?;
        let dates: Vec<Value> = self
            .release_dates
            .get(user_id)
            .into_iter()
            .flatten()
            .map(|(content_id, date)| json!({"content_id": content_id, "release_date": date}))
            .collect();
        Ok(json!({ "releaseDates": dates }))
    }

    /// Full replacement of the user's access map.
    fn update_permissions(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?.to_string();
        let updates: Vec<PermissionUpdate> = typed_field(body, "permissions")?;
        let map = updates
            .into_iter()
            .map(|u| (u.content_id.to_string(), u.has_access))
            .collect();
        self.permissions.insert(user_id, map);
        Ok(json!({}))
    }

    /// Full replacement of the user's release dates; `null` clears a row.
    fn update_release_dates(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?.to_string();
        let entries: Vec<ReleaseDateEntry> = typed_field(body, "releaseDates")?;
        let map = entries
            .into_iter()
            .filter_map(|e| e.release_date.map(|d| (e.content_id.to_string(), d)))
            .collect();
        self.release_dates.insert(user_id, map);
        Ok(json!({}))
    }

    fn update_status(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?.to_string();
        let field: StatusField = typed_field(body, "field")?;
        let value: bool = typed_field(body, "value")?;
        let user = self
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| "User not found".to_string())?;
        match field {
            StatusField::IsPaid => user.is_paid = value,
            StatusField::IsActive => user.is_active = value,
        }
        Ok(json!({}))
    }

    fn delete_user(&mut self, body: &Value) -> Reply {
        let user_id = self.known_user(body)?.to_string();
        self.users.retain(|u| u.user_id != user_id);
        self.permissions.remove(&user_id);
        self.release_dates.remove(&user_id);
        Ok(json!({}))
    }

    fn draft(body: &Value) -> Result<FakeContent, String> {
        let title = str_field(body, "title")?;
        if title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        Ok(FakeContent {
            content_id: String::new(),
            title: title.to_string(),
            url: str_field(body, "url")?.to_string(),
            content_type: typed_field(body, "content_type")?,
            description: body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn add_content(&mut self, body: &Value) -> Reply {
        let mut item = Self::draft(body)?;
        item.content_id = format!("C{}", self.next_content);
        self.next_content += 1;
        let content_id = item.content_id.clone();
        self.content.push(item);
        Ok(json!({ "content_id": content_id }))
    }

    fn content_index(&self, body: &Value) -> Result<usize, String> {
        let content_id = str_field(body, "content_id")?;
        self.content
            .iter()
            .position(|c| c.content_id == content_id)
            .ok_or_else(|| "Content not found".to_string())
    }

    fn update_content(&mut self, body: &Value) -> Reply {
        let index = self.content_index(body)?;
        let mut item = Self::draft(body)?;
        if let Some(existing) = self.content.get_mut(index) {
            item.content_id = std::mem::take(&mut existing.content_id);
            *existing = item;
        }
        Ok(json!({}))
    }

    fn delete_content(&mut self, body: &Value) -> Reply {
        let index = self.content_index(body)?;
        let removed = self.content.remove(index);
        for map in self.permissions.values_mut() {
            map.remove(&removed.content_id);
        }
        for map in self.release_dates.values_mut() {
            map.remove(&removed.content_id);
        }
        Ok(json!({}))
    }

    fn update_content_types(&mut self, body: &Value) -> Reply {
        let updates: Vec<ContentTypeUpdate> = typed_field(body, "contentTypes")?;
        for update in updates {
            if let Some(item) = self
                .content
                .iter_mut()
                .find(|c| c.content_id == update.content_id.as_str())
            {
                item.content_type = update.content_type;
            }
        }
        Ok(json!({}))
    }

    fn stats(&self) -> Value {
        let paid_users = self.users.iter().filter(|u| u.is_paid).count();
        let free_content = self
            .content
            .iter()
            .filter(|c| c.content_type == ContentType::Free)
            .count();
        json!({
            "totalUsers": self.users.len(),
            "paidUsers": paid_users,
            "freeUsers": self.users.len() - paid_users,
            "totalContent": self.content.len(),
            "freeContent": free_content,
            "paidContent": self.content.len() - free_content,
        })
    }
}

fn str_field<'a>(body: &'a Value, field: &str) -> Result<&'a str, String> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Missing {field}"))
}

fn typed_field<T: DeserializeOwned>(body: &Value, field: &str) -> Result<T, String> {
    let value = body.get(field).cloned().ok_or_else(|| format!("Missing {field}"))?;
    serde_json::from_value(value).map_err(|e| format!("Invalid {field}: {e}"))
}

/// Handle to a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    store: Arc<Mutex<Store>>,
    addr: SocketAddr,
}

impl FakeBackend {
    /// Serve `seed` on a random local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn(seed: Seed) -> Self {
        let store = Arc::new(Mutex::new(Store::new(seed)));

        let app = Router::new()
            .route("/exec", post(dispatch))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend error");
        });

        Self { store, addr }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gateway configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Never for a bound address.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&format!("http://{}/exec", self.addr)).expect("Invalid backend URL")
    }

    /// Every request body received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Value> {
        self.lock().calls.clone()
    }

    /// Action names received so far, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| c.get("action").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Bodies of every call to `action`.
    #[must_use]
    pub fn calls_to(&self, action: &str) -> Vec<Value> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.get("action").and_then(Value::as_str) == Some(action))
            .cloned()
            .collect()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current users.
    #[must_use]
    pub fn users(&self) -> Vec<FakeUser> {
        self.lock().users.clone()
    }

    /// Current content.
    #[must_use]
    pub fn content(&self) -> Vec<FakeContent> {
        self.lock().content.clone()
    }

    /// Access map of one user.
    #[must_use]
    pub fn permissions_of(&self, user_id: &str) -> BTreeMap<String, bool> {
        self.lock()
            .permissions
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Release dates of one user.
    #[must_use]
    pub fn release_dates_of(&self, user_id: &str) -> BTreeMap<String, NaiveDate> {
        self.lock()
            .release_dates
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every token issued so far answer `Session expired`.
    pub fn expire_sessions(&self) {
        let mut store = self.lock();
        let tokens: Vec<String> = store.tokens.keys().cloned().collect();
        store.expired.extend(tokens);
    }

    /// Answer every later `action` call with an error envelope carrying `message`.
    pub fn reject(&self, action: &str, message: &str) {
        self.lock()
            .rejected
            .insert(action.to_string(), message.to_string());
    }
}

async fn dispatch(
    State(store): State<Arc<Mutex<Store>>>,
    Json(body): Json<Value>,
) -> Json<Envelope> {
    let envelope = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .handle(body);
    Json(envelope)
}
