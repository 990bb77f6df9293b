use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;

static NEXT_TEST_USER_ID: AtomicI64 = AtomicI64::new(1000);

pub fn next_test_id() -> i64 {
    NEXT_TEST_USER_ID.fetch_add(1, Ordering::Relaxed)
}

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub appointment_duration_minutes: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            appointment_duration_minutes: 60,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            appointment_duration_minutes: self.appointment_duration_minutes,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: next_test_id().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn nutritionist(email: &str) -> Self {
        Self::new(email, "nutritionist")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn numeric_id(&self) -> i64 {
        self.id.parse().unwrap_or_default()
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes PostgREST returns for the tables this service touches.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_response(user_id: i64, role: &str, fullname: &str) -> Value {
        json!({
            "id": user_id,
            "fullname": fullname,
            "username": fullname.to_lowercase().replace(' ', "."),
            "email": format!("user{}@example.com", user_id),
            "role": role,
            "avatar_url": null
        })
    }

    pub fn availability_block_response(
        block_id: i64,
        nutritionist_id: i64,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        slot_duration: u32,
    ) -> Value {
        json!({
            "id": block_id,
            "nutritionist_id": nutritionist_id,
            "day_of_week": day_of_week,
            "start_time": format!("{}:00", start_time),
            "end_time": format!("{}:00", end_time),
            "slot_duration": slot_duration,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: i64,
        patient_id: i64,
        nutritionist_id: i64,
        date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "nutritionist_id": nutritionist_id,
            "date": date,
            "start_time": format!("{}:00", start_time),
            "end_time": format!("{}:00", end_time),
            "status": status,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert_eq!(app_config.appointment_duration_minutes, 60);
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::nutritionist("nut@example.com");
        assert_eq!(user.email, "nut@example.com");
        assert_eq!(user.role, "nutritionist");
        assert!(user.numeric_id() >= 1000);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_users_get_distinct_ids() {
        assert_ne!(TestUser::default().id, TestUser::default().id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
