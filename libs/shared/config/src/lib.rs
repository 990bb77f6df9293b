use std::env;
use tracing::warn;

pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: u32 = 60;
pub const MIN_APPOINTMENT_DURATION_MINUTES: u32 = 15;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// Length of every consultation; an appointment's end time is its start plus this.
    pub appointment_duration_minutes: u32,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            appointment_duration_minutes: parse_duration(env::var("APPOINTMENT_DURATION_MINUTES").ok()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_duration(raw: Option<String>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_APPOINTMENT_DURATION_MINUTES;
    };

    match raw.trim().parse::<u32>() {
        Ok(minutes) if minutes >= MIN_APPOINTMENT_DURATION_MINUTES => minutes,
        _ => {
            warn!(
                "APPOINTMENT_DURATION_MINUTES={} is invalid, using {}",
                raw, DEFAULT_APPOINTMENT_DURATION_MINUTES
            );
            DEFAULT_APPOINTMENT_DURATION_MINUTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_defaults_when_unset() {
        assert_eq!(parse_duration(None), 60);
    }

    #[test]
    fn duration_accepts_valid_values() {
        assert_eq!(parse_duration(Some("45".to_string())), 45);
        assert_eq!(parse_duration(Some(" 30 ".to_string())), 30);
    }

    #[test]
    fn duration_rejects_garbage_and_short_values() {
        assert_eq!(parse_duration(Some("abc".to_string())), 60);
        assert_eq!(parse_duration(Some("10".to_string())), 60);
        assert_eq!(parse_duration(Some("-5".to_string())), 60);
    }
}
