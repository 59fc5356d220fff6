//! Change envelopes published after successful writes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::Employee;

/// The kind of entity carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Employee,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Employee => write!(f, "EMPLOYEE"),
        }
    }
}

/// The write that produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Create => write!(f, "CREATE"),
            OperationType::Update => write!(f, "UPDATE"),
            OperationType::Delete => write!(f, "DELETE"),
        }
    }
}

/// A record snapshot tagged with entity and operation type.
///
/// Envelopes are immutable once built: every field is private and exposed
/// through accessors only. Each carries a unique `event_id` so consumers of
/// an at-least-once channel can deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    event_id: Uuid,
    entity_type: EntityType,
    operation_type: OperationType,
    entity: Employee,
    occurred_at: DateTime<Utc>,
}

impl ChangeEnvelope {
    /// Wraps a snapshot of `entity`.
    pub fn new(entity_type: EntityType, operation_type: OperationType, entity: Employee) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            entity_type,
            operation_type,
            entity,
            occurred_at: Utc::now(),
        }
    }

    /// Shorthand for an employee envelope.
    pub fn employee(operation_type: OperationType, entity: &Employee) -> Self {
        Self::new(EntityType::Employee, operation_type, entity.clone())
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn entity(&self) -> &Employee {
        &self.entity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Key used to partition envelopes on the channel.
    pub fn key(&self) -> String {
        format!("{}:{}", self.entity_type, self.entity.id)
    }
}
