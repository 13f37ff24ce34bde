pub mod admin_sessions;
pub mod admin_users;
pub mod registrants;

pub use admin_sessions::AdminSessionRow;
pub use admin_users::AdminUserRow;
pub use registrants::{PaymentStatus, Registrant, RegistrationStats};
