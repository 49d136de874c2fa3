//! Time, and the context object handed to every module and scheduled task

pub mod context;
pub mod time;
