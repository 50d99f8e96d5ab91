//! Domain layer for the presence application.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{FileViewerSet, Identity, ViewerEntry};
pub use error::{RepositoryError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{DisconnectSweep, PresenceRepository};
pub use value_object::{ConnectionId, Email, FileId, Timestamp, UserId, UserName};

#[cfg(test)]
pub use repository::MockPresenceRepository;
