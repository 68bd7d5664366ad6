//! Cloudflare Turnstile verification. Gates registration and non-admin
//! login before any state is touched; verification failures degrade to
//! "not verified" rather than surfacing transport errors.

use serde::Deserialize;
use tracing::error;

use crate::config::TurnstileConfig;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
struct TurnstileOutcome {
    success: bool,
}

pub async fn verify_turnstile(
    http: &reqwest::Client,
    config: &TurnstileConfig,
    token: &str,
) -> bool {
    let params = [
        ("secret", config.secret_key.as_str()),
        ("response", token),
    ];

    let response = match http.post(&config.verify_url).form(&params).send().await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Turnstile verification request failed");
            return false;
        }
    };

    match response.json::<TurnstileOutcome>().await {
        Ok(outcome) => outcome.success,
        Err(e) => {
            error!(error = %e, "Turnstile verification returned an unexpected body");
            false
        }
    }
}

/// Reject the request unless the CAPTCHA token is present and verifies.
pub async fn require_captcha(
    http: &reqwest::Client,
    config: &TurnstileConfig,
    token: Option<&str>,
) -> Result<(), AppError> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => {
            return Err(AppError::ValidationError(
                "Cloudflare Turnstile CAPTCHA token is missing.".to_string(),
            ))
        }
    };

    if verify_turnstile(http, config, token).await {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "CAPTCHA verification failed. Please try again.".to_string(),
        ))
    }
}
