//! Keel: the Rust data layer.
//!
//! Queries are written with named placeholders (`${name}`) and rewritten into the positional
//! form of the driver. Records derive [`Record`] to be decoded from rows, used as parameter
//! sources and turned into `CREATE TABLE` statements. A [`Group`] holds one writable database
//! and its read-only replicas.
//!
//! ```ignore
//! use keel::{Executor, Group, GroupOptions, Record, params};
//! use keel_postgres::PostgresDriver;
//!
//! #[derive(Default, Record)]
//! #[keel(table = "users")]
//! struct User {
//!     #[keel("id;primary;incr")]
//!     id: i64,
//!     #[keel("email;unique;length=~255")]
//!     email: String,
//! }
//!
//! let group = Group::open(PostgresDriver, "postgres://localhost/app", &GroupOptions::default())?;
//! group.create_table::<User>().await?;
//! let user: User = group
//!     .fetch_one("SELECT * FROM users WHERE id = ${id}", &params!("id" => 1i64))
//!     .await?;
//! ```
pub use keel_core::*;
pub use keel_macros::*;
