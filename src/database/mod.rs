//! Database layer
//!
//! Connection pooling, migrations, and the repository abstractions over
//! the Postgres and fixture backends.

pub mod connection;
pub mod repositories;

pub use connection::{create_pool, health_check, run_migrations, DatabasePool, PoolConfig};
pub use repositories::Repositories;
