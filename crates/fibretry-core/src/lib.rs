pub mod backoff;
pub mod config;
pub mod logging;
pub mod retry;
