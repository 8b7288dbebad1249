// Database service module
// SQLite connection, schema management and the key-value settings store

mod connection;
mod kv_store;
mod schema;

pub use connection::Database;
pub use kv_store::KeyValueStore;

#[cfg(test)]
pub use kv_store::MockKeyValueStore;
