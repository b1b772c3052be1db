pub mod conversation;
pub mod toast;
