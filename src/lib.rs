pub mod config;
pub mod edge;
pub mod i18n;
pub mod probe;
pub mod redirect;
pub mod retry;
pub mod server;
