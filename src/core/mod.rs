pub mod query_builder;
pub mod quote;
pub mod relation_graph;
pub mod sql_guard;
