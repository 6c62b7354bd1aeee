mod config;
mod logging;

pub use self::config::AppConfig;
pub use self::logging::init_tracing;
