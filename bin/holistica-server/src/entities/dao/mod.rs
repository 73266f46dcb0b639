pub mod message;
pub mod notification;
pub mod patient;
pub mod report;
pub mod session;
pub mod therapist;
pub mod token;
pub mod user;

pub use message::{Message, NewMessage, SENDER_IA, SENDER_PACIENTE};
pub use notification::Notification;
pub use patient::{Patient, PatientActivity, PatientProfile};
pub use report::Report;
pub use session::{Session, STATUS_ABERTA, STATUS_ENCERRADA};
pub use therapist::Therapist;
pub use token::AuthToken;
pub use user::{User, ROLE_PACIENTE, ROLE_TERAPEUTA};
