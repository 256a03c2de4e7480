pub mod channel;
pub mod tcp;
