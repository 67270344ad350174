//! Unified error taxonomy (spec §7).
//!
//! Every crate in the workspace converts its own lower-level errors into
//! this enum before returning them to a caller. Validation, identity, and
//! schema-evolution errors are returned to the caller immediately; a
//! `PersistenceFailed`/`WalWriteFailed`/`SnapshotFailed` triggers the
//! rollback discipline in the engine crate before it surfaces here.

use thiserror::Error;

/// Result type alias used throughout SyncopateDB.
pub type Result<T> = std::result::Result<T, Error>;

/// The complete error taxonomy for the core.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ---- validation ----
    /// A non-internal field name starts with the reserved `_` prefix.
    #[error("field name '{0}' is reserved (internal fields only)")]
    ReservedFieldName(String),

    /// `register_type` was called with a name already in use.
    #[error("entity type '{0}' already exists")]
    TypeExists(String),

    /// An operation referenced a type that was never registered.
    #[error("entity type '{0}' not found")]
    TypeNotFound(String),

    /// A `FieldDefinition` declared an unsupported type string.
    #[error("field '{field}' declares unsupported type '{declared}'")]
    InvalidFieldType {
        /// Field name.
        field: String,
        /// The unsupported declared type.
        declared: String,
    },

    /// A `required` field was absent on insert.
    #[error("field '{field}' is required on type '{entity_type}'")]
    RequiredFieldMissing {
        /// Owning entity type.
        entity_type: String,
        /// Missing field name.
        field: String,
    },

    /// A supplied value's runtime category doesn't match the declared type.
    #[error("field '{field}' expected type {expected}, got incompatible value")]
    FieldTypeMismatch {
        /// Field name.
        field: String,
        /// The declared field type.
        expected: String,
    },

    /// A non-nullable field was given a null value.
    #[error("field '{0}' is not nullable")]
    NullableViolation(String),

    /// A `unique` field's value collides with another entity.
    #[error("value for unique field '{field}' already used by entity '{owner}'")]
    UniqueViolation {
        /// Field name.
        field: String,
        /// ID of the entity already holding this value.
        owner: String,
    },

    /// An attempt to modify `_created_at` (or another reserved field) directly.
    #[error("field '{0}' cannot be modified directly")]
    ReservedFieldModification(String),

    // ---- identity ----
    /// An ID failed its generator's validation rule.
    #[error("invalid id '{id}' for generator {generator}")]
    InvalidId {
        /// The rejected id.
        id: String,
        /// Name of the generator that rejected it.
        generator: String,
    },

    /// A generator could not produce an id (e.g. client-supplied with none given).
    #[error("id generation failed: {0}")]
    IdGenerationFailed(String),

    /// Insert was attempted with an id that is already taken for this type.
    #[error("entity '{entity_type}:{id}' already exists")]
    EntityExists {
        /// Entity type.
        entity_type: String,
        /// Colliding id.
        id: String,
    },

    /// A read/update/delete referenced a record that doesn't exist.
    #[error("entity '{entity_type}:{id}' not found")]
    EntityNotFound {
        /// Entity type.
        entity_type: String,
        /// Missing id.
        id: String,
    },

    /// An `update_type` attempted to change a type's immutable ID generator.
    #[error("id generator for type '{0}' cannot be changed after creation")]
    IdGeneratorChange(String),

    // ---- schema evolution ----
    /// A migration plan changed a field's type along an unsupported path.
    #[error("cannot change type of field '{field}' from {from} to {to}")]
    IncompatibleTypeChange {
        /// Field name.
        field: String,
        /// Previous declared type.
        from: String,
        /// New declared type.
        to: String,
    },

    /// A migration plan made a previously-optional field required.
    #[error("field '{0}' cannot be made required on an existing type")]
    RequiredFieldAdded(String),

    /// A migration plan attempted to rename or remove an internal field.
    #[error("internal field '{0}' cannot be renamed or removed")]
    InternalFieldRemoval(String),

    // ---- query ----
    /// Query options were structurally invalid (e.g. unknown type).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A single filter clause was invalid.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A join clause was invalid (e.g. missing local/foreign field).
    #[error("invalid join: {0}")]
    InvalidJoin(String),

    /// A join's target type was never registered.
    #[error("join target type '{0}' not found")]
    JoinTargetNotFound(String),

    // ---- persistence ----
    /// A generic persistence operation failed; the caller should already
    /// have rolled back any in-memory mutation before this surfaces.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// A snapshot specifically failed to serialize or write.
    #[error("snapshot failed: {0}")]
    SnapshotFailed(String),

    /// A WAL append specifically failed.
    #[error("wal write failed: {0}")]
    WalWriteFailed(String),

    // ---- internal ----
    /// A persisted record failed to decode and was unrecoverable.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Catch-all for conditions that should not be reachable.
    #[error("internal error: {0}")]
    Unknown(String),
}

impl Error {
    /// True for the validation/identity/query buckets the HTTP shell maps to 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ReservedFieldName(_)
                | Error::TypeExists(_)
                | Error::TypeNotFound(_)
                | Error::InvalidFieldType { .. }
                | Error::RequiredFieldMissing { .. }
                | Error::FieldTypeMismatch { .. }
                | Error::NullableViolation(_)
                | Error::UniqueViolation { .. }
                | Error::ReservedFieldModification(_)
                | Error::InvalidId { .. }
                | Error::IdGenerationFailed(_)
                | Error::EntityExists { .. }
                | Error::EntityNotFound { .. }
                | Error::IdGeneratorChange(_)
                | Error::IncompatibleTypeChange { .. }
                | Error::RequiredFieldAdded(_)
                | Error::InternalFieldRemoval(_)
                | Error::InvalidQuery(_)
                | Error::InvalidFilter(_)
                | Error::InvalidJoin(_)
                | Error::JoinTargetNotFound(_)
        )
    }

    /// True for the persistence/internal buckets the HTTP shell maps to 5xx.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}
