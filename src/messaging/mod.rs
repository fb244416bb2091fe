// Module messaging - Files lock-free entre threads

pub mod channels;
pub mod command;
pub mod notification;
