pub mod content;
pub mod time;
