mod base;
mod connection;
mod github;
mod ingestor;
mod pipeline;
mod server;

pub use base::*;
pub use connection::*;
pub use github::*;
pub use ingestor::*;
pub use pipeline::*;
pub use server::*;
