//! Document store layer for the Pulse backend.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every collection the event handlers read or
//! write (users, follow edges, posts, conversations, notifications, reports)
//! is created through versioned migrations managed by this crate.
//!
//! Collection semantics map onto SQLite as follows:
//!
//! - get-by-key is a primary key lookup;
//! - set-with-merge is `INSERT ... ON CONFLICT DO UPDATE` on the supplied columns;
//! - atomic increment is a single `col = col + ?` upsert;
//! - batched commits are one transaction.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
