use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub auth: AuthConfig,
    pub turnstile: TurnstileConfig,
    pub smtp: Option<SmtpConfig>,
    pub admin_seed: Option<AdminSeed>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
}

#[derive(Clone)]
pub struct TurnstileConfig {
    pub secret_key: String,
    pub verify_url: String,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Credentials used to create the admin account on first boot.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

const DEFAULT_TURNSTILE_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

// Cloudflare's documented always-passing test secret, so local setups work
// without a real site registration.
const TURNSTILE_TEST_SECRET: &str = "1x0000000000000000000000000000000AA";

impl Config {
    pub fn from_env() -> Self {
        let smtp = match (env::var("EMAIL_USER"), env::var("EMAIL_PASS")) {
            (Ok(username), Ok(password)) => Some(SmtpConfig {
                server: env::var("SMTP_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "Felicity Events <noreply@felicity.iiit.ac.in>".to_string()),
                username,
                password,
            }),
            _ => None,
        };

        let admin_seed = env::var("ADMIN_PASSWORD").ok().map(|password| AdminSeed {
            username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            password,
        });

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/felicity".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string()),
                jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
                    .unwrap_or_else(|_| "dev-refresh-secret".to_string()),
            },
            turnstile: TurnstileConfig {
                secret_key: env::var("TURNSTILE_SECRET_KEY")
                    .unwrap_or_else(|_| TURNSTILE_TEST_SECRET.to_string()),
                verify_url: env::var("TURNSTILE_VERIFY_URL")
                    .unwrap_or_else(|_| DEFAULT_TURNSTILE_URL.to_string()),
            },
            smtp,
            admin_seed,
        }
    }
}
