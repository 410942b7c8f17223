pub mod access_code;
pub mod attendee;
pub mod event;
pub mod order;
pub mod ticket;
pub mod user;
