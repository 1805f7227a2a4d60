//! Program Model Catalog
//!
//! The schema of the Go program model: files and folders, comments, the AST
//! (expressions, statements, declarations, specs), objects, scopes, types and
//! packages, plus the bookkeeping relations that bypass the lattice.
//!
//! Declaration order is part of the contract. Branch tags follow it, so new
//! branches go at the end of their case.

mod tables;
mod types;

use tracing::info;

use crate::error::Result;
use crate::schema::{Schema, SchemaBuilder, SchemaOptions};

/// Relations for duplicate-code detection, external data and snapshot
/// bookkeeping. Emitted verbatim ahead of everything else.
pub const DEFAULT_FRAGMENT: &str = r#"
/** Duplicate code **/

duplicateCode(
  unique int id : @duplication,
  varchar(900) relativePath : string ref,
  int equivClass : int ref);

similarCode(
  unique int id : @similarity,
  varchar(900) relativePath : string ref,
  int equivClass : int ref);

@duplication_or_similarity = @duplication | @similarity;

tokens(
  int id : @duplication_or_similarity ref,
  int offset : int ref,
  int beginLine : int ref,
  int beginColumn : int ref,
  int endLine : int ref,
  int endColumn : int ref);

/** External data **/

externalData(
  int id : @externalDataElement,
  varchar(900) path : string ref,
  int column: int ref,
  varchar(900) value : string ref
);

snapshotDate(unique date snapshotDate : date ref);

sourceLocationPrefix(varchar(900) prefix : string ref);
"#;

/// Declare the whole catalog into `builder`
pub fn declare(builder: &mut SchemaBuilder) -> Result<()> {
    builder.add_raw_fragment(DEFAULT_FRAGMENT);
    types::declare(builder)?;
    tables::declare(builder)?;
    Ok(())
}

/// Build and close the catalog schema
pub fn schema(options: SchemaOptions) -> Result<Schema> {
    let mut builder = SchemaBuilder::new().with_options(options);
    declare(&mut builder)?;
    let schema = builder.close()?;
    info!(
        types = schema.types().len(),
        tables = schema.tables().len(),
        "built program model catalog"
    );
    Ok(schema)
}

/// Declare the next branches of `case`, in order
fn branches(
    builder: &mut SchemaBuilder,
    case: crate::lattice::CaseId,
    decls: &[(&str, &[&str])],
) -> Result<()> {
    for (name, supertypes) in decls {
        builder.new_branch(case, name, supertypes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_closes_cleanly() {
        let schema = schema(SchemaOptions::default()).unwrap();
        assert!(schema.diagnostics().is_empty(), "{}", schema.diagnostics());
        assert_eq!(schema.cases().len(), 8);
    }

    #[test]
    fn test_fragment_comes_first() {
        let text = schema(SchemaOptions::default()).unwrap().emit();
        assert!(text.starts_with(DEFAULT_FRAGMENT));
    }
}
