pub mod connection;
pub mod schema;

pub use connection::Database;
pub use schema::SchemaError;
