pub mod decoder;
pub mod display;
pub mod imap;
pub mod message;
