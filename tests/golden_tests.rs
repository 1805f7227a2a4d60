//! Golden Tests for Schema Emission
//!
//! Emitted text is a versioned contract: these tests pin it byte for byte.

use dbscheme::{catalog, Column, Schema, SchemaBuilder, SchemaOptions, TableDef};

fn shapes_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder.add_raw_fragment("sourceLocationPrefix(varchar(900) prefix : string ref);");

    builder.declare_union("shape", &[]).unwrap();
    builder.declare_primary_key("circle", &["shape"]).unwrap();
    builder.declare_primary_key("square", &["shape"]).unwrap();
    builder
        .declare_table(TableDef::new("shapes").columns([Column::entity("shape", "id").key(), Column::int("radius")]))
        .unwrap();

    builder.declare_primary_key("expr", &[]).unwrap();
    builder.declare_union("exprparent", &[]).unwrap();
    builder.add_supertypes("expr", &["exprparent"]).unwrap();
    let kind = builder.declare_case("expr", "kind").unwrap();
    builder.new_branch(kind, "add", &[]).unwrap();
    builder.new_branch(kind, "sub", &[]).unwrap();
    builder.declare_alias("figure", "shape").unwrap();
    builder
        .declare_table(
            TableDef::new("exprs")
                .columns([
                    Column::entity("expr", "id").key(),
                    Column::int("kind"),
                    Column::entity("exprparent", "parent"),
                    Column::int("idx"),
                ])
                .key_set(["parent", "idx"]),
        )
        .unwrap();

    builder.close().unwrap()
}

// =============================================================================
// Fixtures
// =============================================================================

#[test]
fn test_shapes_golden() {
    let schema = shapes_schema();
    assert_eq!(schema.emit(), include_str!("fixtures/shapes.dbscheme"));
}

#[test]
fn test_emission_is_stable() {
    let schema = shapes_schema();
    assert_eq!(schema.emit(), schema.emit());
    assert_eq!(schema.emit(), shapes_schema().emit());
}

// =============================================================================
// Catalog landmarks
// =============================================================================

#[test]
fn test_catalog_landmarks() {
    let text = catalog::schema(SchemaOptions::default()).unwrap().emit();

    for landmark in [
        "@node = @documentable | @exprparent | @fieldparent | @stmtparent | @declparent | @scopenode | @comment_group | @comment;\n",
        "@location = @location_default;\n",
        "@sourceline = @locatable;\n",
        "case @comment.kind of\n  0 = @slashslashcomment\n| 1 = @slashstarcomment\n;\n",
        "@basiclit = @intlit | @floatlit | @imaglit | @charlit | @stringlit;\n",
        "@funcdef = @funclit | @funcdecl;\n",
        "@shiftexpr = @shlexpr | @shrexpr;\n",
        "@literaltype = @boolliteraltype | @intliteraltype | @runeliteraltype | @floatliteraltype | @complexliteraltype | @stringliteraltype | @nilliteraltype;\n",
        "#keyset[parent, idx]\nexprs(\n  unique int id: @expr,\n  int kind: int ref,\n  int parent: @exprparent ref,\n  int idx: int ref\n);\n",
        "has_location(\n  unique int locatable: @locatable ref,\n  int location: @location ref\n);\n",
        "numlines(\n  int element_id: @sourceline ref,\n",
        "packages(\n  unique int id: @package,\n  varchar(900) name: string ref,\n  varchar(900) path: string ref,\n  int scope: @packagescope ref\n);\n",
    ] {
        assert!(text.contains(landmark), "missing landmark:\n{}", landmark);
    }
}

#[test]
fn test_catalog_respects_varchar_option() {
    let text = catalog::schema(SchemaOptions { varchar_length: 4000 }).unwrap().emit();
    assert!(text.contains("files(\n  unique int id: @file,\n  varchar(4000) name: string ref,"));
    // Raw fragments are never rewritten
    assert!(text.contains("varchar(900) relativePath : string ref"));
}
