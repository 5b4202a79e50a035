use serde::Serialize;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{info, warn};

use super::error::ServiceError;
use super::resource_service::ResourceService;
use crate::auth::{PasswordHasher, TokenService};
use crate::database::models::account::{PROFILE_FIELDS, REGISTRATION_FIELDS};
use crate::database::models::ACCOUNTS;
use crate::database::{record_id, FieldSet, Record};
use crate::types::{Actor, Role};
use crate::validation::{collect, is_blank};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: Record,
}

/// Registration, login and self-service profile flows on top of the
/// account resource
#[derive(Clone)]
pub struct AccountService {
    resources: ResourceService,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(resources: ResourceService, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self { resources, hasher, tokens }
    }

    /// Public sign-up. The role is always `user`.
    pub async fn register(&self, mut fields: FieldSet) -> Result<Record, ServiceError> {
        fields.restrict(REGISTRATION_FIELDS);
        fields.set("role", Role::User.as_str());
        self.resources.create(&ACCOUNTS, fields, None).await
    }

    /// Bootstrap an administrator account
    pub async fn create_admin(&self, username: &str, email: &str, password: &str) -> Result<Record, ServiceError> {
        let mut fields = FieldSet::new();
        fields
            .set("username", username)
            .set("email", email)
            .set("password", password)
            .set("role", Role::Admin.as_str());
        self.resources.create(&ACCOUNTS, fields, None).await
    }

    /// Exchange email and password for a bearer token
    pub async fn login(&self, body: &Value) -> Result<LoginResponse, ServiceError> {
        let email = body.get("email");
        let password = body.get("password");

        let missing = |field: &str, value: Option<&Value>| {
            if is_blank(value) {
                vec![format!("{} is required", field)]
            } else {
                Vec::new()
            }
        };
        if let Some(envelope) = collect("Invalid login input", [missing("email", email), missing("password", password)]) {
            return Err(ServiceError::InvalidInput(envelope));
        }

        let (Some(email), Some(password)) = (email.and_then(Value::as_str), password.and_then(Value::as_str)) else {
            return Err(ServiceError::invalid("email and password must be strings"));
        };

        let Some(record) = self
            .resources
            .store()
            .fetch_by_unique(ACCOUNTS.table, "email", &json!(email.trim()))
            .await?
        else {
            warn!("Login rejected for unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let hash = record.get("password").and_then(Value::as_str).unwrap_or_default().to_string();
        if !self.hasher.verify(password.to_string(), hash).await? {
            warn!("Login rejected for account #{}", record_id(&record).unwrap_or_default());
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let actor = actor_from_record(&record)
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
        let token = self.tokens.issue(&actor)?;
        info!("Account #{} logged in", actor.id);

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            expires_in: self.tokens.expires_in(),
            user: ACCOUNTS.canonical(record),
        })
    }

    pub async fn profile(&self, actor: &Actor) -> Result<Record, ServiceError> {
        self.resources.get_by_id(&ACCOUNTS, actor.id).await
    }

    /// Partial update of the caller's own account. Role and password are
    /// not self-service fields.
    pub async fn update_profile(&self, actor: &Actor, mut fields: FieldSet) -> Result<Record, ServiceError> {
        fields.restrict(PROFILE_FIELDS);
        self.resources.update_by_id(&ACCOUNTS, actor.id, fields, Some(actor)).await
    }

    /// Resolve the current identity of a token holder from the store
    pub async fn resolve_actor(&self, id: i64) -> Result<Option<Actor>, ServiceError> {
        let record = self.resources.store().fetch_by_key(ACCOUNTS.table, id).await?;
        Ok(record.as_ref().and_then(actor_from_record))
    }
}

/// Build an actor from a stored account row
pub fn actor_from_record(record: &Record) -> Option<Actor> {
    let id = record_id(record)?;
    let email = record.get("email")?.as_str()?.to_string();
    let role = record
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| Role::from_str(r).ok())
        .unwrap_or(Role::User);
    Some(Actor { id, email, role })
}
