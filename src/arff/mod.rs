/// Attribute-relation documents: schema types, inference, persistence and
/// rendering.
///
/// ```text
///   Table ──infer──▶ Schema ──save──▶ header artifact
///                      │                   │
///                      │◀──────load────────┘
///                      ▼
///               write_document(mode) ──▶ document bytes
/// ```

pub mod infer;
pub mod schema;
pub mod store;
pub mod writer;

pub use infer::SchemaInferencer;
pub use schema::{Attribute, AttributeKind, Schema};
pub use store::{FsSchemaStore, PersistedSchema, SchemaStore};
pub use writer::{Mode, render_document, write_document};
