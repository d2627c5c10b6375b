pub mod datasource;
pub mod query;
pub mod schema;
