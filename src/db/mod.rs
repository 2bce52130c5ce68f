mod adapter;
mod connection;
mod document;
mod graph;
mod query;
mod value;

pub use adapter::*;
pub use connection::*;
pub use document::*;
pub use graph::*;
pub use query::*;
pub use value::*;
