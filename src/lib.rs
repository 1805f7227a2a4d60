//! dbscheme
//!
//! A type-lattice builder and relational-schema compiler. Callers declare
//! abstract unions, concrete primary-key types and discriminated case/branch
//! types, then tables over them; the closed [`Schema`] emits a deterministic
//! schema text and hands out branch tags and entity ids to fact producers.
//!
//! ## Lifecycle
//!
//! ```text
//! SchemaBuilder ──declare_*──▶ SchemaBuilder ──close()──▶ Schema ──emit()──▶ text
//!                                                          │
//!                                                          ├── tag lookups (read-only, any thread)
//!                                                          └── IdAllocator (atomic, any thread)
//! ```
//!
//! ## Example
//!
//! ```
//! use dbscheme::{Column, SchemaBuilder, TableDef};
//!
//! let mut builder = SchemaBuilder::new();
//! builder.declare_union("shape", &[]).unwrap();
//! builder.declare_primary_key("circle", &["shape"]).unwrap();
//! builder.declare_primary_key("square", &["shape"]).unwrap();
//! builder
//!     .declare_table(TableDef::new("shapes").columns([
//!         Column::entity("shape", "id").key(),
//!         Column::int("radius"),
//!     ]))
//!     .unwrap();
//!
//! let schema = builder.close().unwrap();
//! assert!(schema.emit().contains("@shape = @circle | @square;"));
//! ```

pub mod alloc;
pub mod catalog;
pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod diagnostics;
mod emit;
pub mod error;
pub mod lattice;
pub mod manifest;
pub mod names;
pub mod schema;
pub mod table;
pub mod version;

pub use alloc::{Entity, IdAllocator};
pub use checksum::Checksum;
pub use compatibility::{ChangeType, CompatibilityChecker, CompatibilityResult, SchemaChange};
pub use config::DbschemeConfig;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use error::{AllocError, NameKind, Result, SchemaError};
pub use lattice::{Branch, CaseId, TypeId, TypeKind};
pub use manifest::SchemaManifest;
pub use schema::{Schema, SchemaBuilder, SchemaOptions};
pub use table::{Column, TableDef, TableId};
pub use version::{Bump, SchemaVersion};
