pub mod chat_message;
pub mod event;
pub mod organizer;
pub mod pass_reset;
pub mod team;
pub mod ticket;
pub mod user;

pub use chat_message::ChatMessage;
pub use event::{DraftEvent, Event, EventDetails, EventStatus, EventType};
pub use organizer::{Organizer, OrganizerStatus};
pub use pass_reset::{PassReset, PassResetStatus};
pub use team::{Team, TeamMember};
pub use ticket::{Ticket, TicketDetails, TicketStatus};
pub use user::User;
