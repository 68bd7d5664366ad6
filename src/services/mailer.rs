//! Registration confirmation email. Best-effort: when SMTP is not
//! configured the send is mock-logged, and delivery failures are logged
//! and swallowed so the registration itself never fails.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::config::SmtpConfig;

pub struct TicketEmail {
    pub to: String,
    pub event_name: String,
    pub event_type: String,
    pub organizer_name: String,
    pub ticket_code: String,
}

pub async fn send_ticket_confirmation(smtp: Option<SmtpConfig>, email: TicketEmail) {
    let Some(smtp) = smtp else {
        info!(
            to = %email.to,
            ticket = %email.ticket_code,
            "SMTP not configured; confirmation email logged instead of sent"
        );
        return;
    };

    if let Err(e) = send(&smtp, &email).await {
        error!(error = %e, to = %email.to, "Failed to send confirmation email");
    } else {
        info!(to = %email.to, ticket = %email.ticket_code, "Confirmation email sent");
    }
}

async fn send(
    smtp: &SmtpConfig,
    email: &TicketEmail,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let body = format!(
        "<h1>Registration Successful!</h1>\
         <p>Hi there,</p>\
         <p>You have successfully registered for <strong>{}</strong>.</p>\
         <p><strong>Ticket ID:</strong> {}</p>\
         <p><strong>Event Type:</strong> {}</p>\
         <p><strong>Organizer:</strong> {}</p>\
         <p>Please find your QR code in your dashboard.</p>",
        email.event_name, email.ticket_code, email.event_type, email.organizer_name
    );

    let message = Message::builder()
        .from(smtp.from.parse()?)
        .to(email.to.parse()?)
        .subject(format!("Registration Confirmation: {}", email.event_name))
        .header(ContentType::TEXT_HTML)
        .body(body)?;

    let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.server)?
        .port(smtp.port)
        .credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ))
        .build();

    transport.send(message).await?;
    Ok(())
}
