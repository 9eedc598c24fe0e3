pub(crate) mod audit;
pub(crate) mod auth;
pub(crate) mod core;
pub(crate) mod domain;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod notify;
pub(crate) mod router;
pub(crate) mod store;
pub(crate) mod types;

pub use self::core::AppConfig;
pub use self::errors::init_tracing;
pub use self::router::build_router;
