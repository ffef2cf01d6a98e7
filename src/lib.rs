pub mod chat;
pub mod config;
pub mod locale;
pub mod pipeline;
pub mod portable;
pub mod progress;
pub mod reply;
pub mod spans;
pub mod textutil;
