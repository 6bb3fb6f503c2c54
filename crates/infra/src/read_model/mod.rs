//! Read model storage abstractions.

pub mod store;
pub mod user_directory;

pub use store::{InMemoryReadStore, ReadStore};
pub use user_directory::UserDirectory;
