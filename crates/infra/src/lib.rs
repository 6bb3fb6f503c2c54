//! Infrastructure layer: event storage, command dispatch, read models, config.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod rebuild;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{AccessDeskConfig, ConfigError, LogFormat};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent};
pub use rebuild::rebuild_read_models;
