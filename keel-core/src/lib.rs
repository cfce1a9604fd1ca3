mod as_value;
mod db;
mod ddl;
mod decode;
mod definition;
mod driver;
mod error;
mod executor;
mod group;
mod joined;
mod json;
mod params;
mod registry;
mod rows;
mod schema;
mod sql_writer;
mod stmt;
mod tag;
mod tx;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use db::*;
pub use ddl::*;
pub use decode::*;
pub use definition::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use group::*;
pub use joined::*;
pub use json::*;
pub use params::*;
pub use registry::*;
pub use rows::*;
pub use schema::*;
pub use sql_writer::*;
pub use stmt::*;
pub use tag::*;
pub use tx::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
