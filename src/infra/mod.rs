pub mod config;
pub mod db_external;
pub mod schema_cache;
pub mod store;
pub mod utils;
