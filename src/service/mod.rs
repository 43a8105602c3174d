//! Service layer: entity creation and batch orchestration.
//!
//! [`entity_factory`] maps requests to host payloads and creates single
//! documents; [`batch_coordinator`] sequences factory calls for a batch.

pub mod batch_coordinator;
pub mod entity_factory;
