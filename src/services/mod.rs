pub mod captcha;
pub mod discord;
pub mod mailer;
