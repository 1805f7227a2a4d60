//! Relations of the program model

use crate::error::Result;
use crate::schema::SchemaBuilder;
use crate::table::{Column, TableDef};

pub(super) fn declare(b: &mut SchemaBuilder) -> Result<()> {
    // ========== Files and locations ==========

    b.declare_table(TableDef::new("locations_default").columns([
        Column::entity("location_default", "id").key(),
        Column::entity("file", "file"),
        Column::int("beginLine"),
        Column::int("beginColumn"),
        Column::int("endLine"),
        Column::int("endColumn"),
    ]))?;

    b.declare_table(TableDef::new("numlines").columns([
        Column::entity("sourceline", "element_id"),
        Column::int("num_lines"),
        Column::int("num_code"),
        Column::int("num_comment"),
    ]))?;

    b.declare_table(TableDef::new("files").columns([
        Column::entity("file", "id").key(),
        Column::string("name"),
        Column::string("simple"),
        Column::string("ext"),
        Column::int("fromSource"),
    ]))?;

    b.declare_table(TableDef::new("folders").columns([
        Column::entity("folder", "id").key(),
        Column::string("name"),
        Column::string("simple"),
    ]))?;

    b.declare_table(TableDef::new("containerparent").columns([
        Column::entity("container", "parent"),
        Column::entity("container", "child").unique(),
    ]))?;

    b.declare_table(TableDef::new("has_location").columns([
        Column::entity("locatable", "locatable").unique(),
        Column::entity("location", "location"),
    ]))?;

    // ========== Comments ==========

    b.declare_table(TableDef::new("comment_groups").column(Column::entity("comment_group", "id").key()))?;

    b.declare_table(TableDef::new("comments").columns([
        Column::entity("comment", "id").key(),
        Column::int("kind"),
        Column::entity("comment_group", "parent"),
        Column::int("idx"),
        Column::string("text"),
    ]))?;

    b.declare_table(TableDef::new("doc_comments").columns([
        Column::entity("documentable", "node").unique(),
        Column::entity("comment_group", "comment"),
    ]))?;

    // ========== AST ==========

    b.declare_table(
        TableDef::new("exprs")
            .columns([
                Column::entity("expr", "id").key(),
                Column::int("kind"),
                Column::entity("exprparent", "parent"),
                Column::int("idx"),
            ])
            .key_set(["parent", "idx"]),
    )?;

    b.declare_table(TableDef::new("literals").columns([
        Column::entity("expr", "expr").unique(),
        Column::string("value"),
        Column::string("raw"),
    ]))?;

    b.declare_table(TableDef::new("constvalues").columns([
        Column::entity("expr", "expr").unique(),
        Column::string("value"),
        Column::string("exact"),
    ]))?;

    b.declare_table(TableDef::new("fields").columns([
        Column::entity("field", "id").key(),
        Column::entity("fieldparent", "parent"),
        Column::int("idx"),
    ]))?;

    for (table, ty, parent) in [
        ("stmts", "stmt", "stmtparent"),
        ("decls", "decl", "declparent"),
        ("specs", "spec", "gendecl"),
    ] {
        b.declare_table(
            TableDef::new(table)
                .columns([
                    Column::entity(ty, "id").key(),
                    Column::int("kind"),
                    Column::entity(parent, "parent"),
                    Column::int("idx"),
                ])
                .key_set(["parent", "idx"]),
        )?;
    }

    // ========== Scopes and objects ==========

    b.declare_table(TableDef::new("scopes").columns([Column::entity("scope", "id").key(), Column::int("kind")]))?;

    b.declare_table(TableDef::new("scopenesting").columns([
        Column::entity("scope", "inner").unique(),
        Column::entity("scope", "outer"),
    ]))?;

    b.declare_table(TableDef::new("scopenodes").columns([
        Column::entity("scopenode", "node").unique(),
        Column::entity("localscope", "scope"),
    ]))?;

    b.declare_table(TableDef::new("objects").columns([
        Column::entity("object", "id").key(),
        Column::int("kind"),
        Column::string("name"),
    ]))?;

    let object_facts = [
        ("objectscopes", "object", "scope", "scope"),
        ("objecttypes", "object", "type", "tp"),
        ("methodreceivers", "method", "object", "receiver"),
        ("fieldstructs", "field", "structtype", "struct"),
        ("methodhosts", "method", "namedtype", "host"),
    ];
    for (table, object, target, column) in object_facts {
        b.declare_table(TableDef::new(table).columns([
            Column::entity("object", object).unique(),
            Column::entity(target, column),
        ]))?;
    }

    for table in ["defs", "uses"] {
        b.declare_table(TableDef::new(table).columns([
            Column::entity("ident", "ident"),
            Column::entity("object", "object"),
        ]))?;
    }

    // ========== Types ==========

    b.declare_table(TableDef::new("types").columns([Column::entity("type", "id").key(), Column::int("kind")]))?;

    b.declare_table(TableDef::new("type_of").columns([
        Column::entity("expr", "expr").unique(),
        Column::entity("type", "tp"),
    ]))?;

    b.declare_table(TableDef::new("typename").columns([
        Column::entity("type", "tp").unique(),
        Column::string("name"),
    ]))?;

    let type_links = [
        ("key_type", "maptype", "map"),
        ("element_type", "containertype", "container"),
        ("base_type", "pointertype", "ptr"),
        ("underlying_type", "namedtype", "named"),
    ];
    for (table, ty, column) in type_links {
        b.declare_table(TableDef::new(table).columns([
            Column::entity(ty, column).unique(),
            Column::entity("type", "tp"),
        ]))?;
    }

    b.declare_table(
        TableDef::new("component_types")
            .columns([
                Column::entity("compositetype", "parent"),
                Column::int("index"),
                Column::string("name"),
                Column::entity("type", "tp"),
            ])
            .key_set(["parent", "index"]),
    )?;

    // Go array lengths are 64-bit, so the length is stored as a string
    b.declare_table(TableDef::new("array_length").columns([
        Column::entity("arraytype", "tp").unique(),
        Column::string("len"),
    ]))?;

    b.declare_table(TableDef::new("type_objects").columns([
        Column::entity("type", "tp").unique(),
        Column::entity("object", "object"),
    ]))?;

    // ========== Packages ==========

    b.declare_table(TableDef::new("packages").columns([
        Column::entity("package", "id").key(),
        Column::string("name"),
        Column::string("path"),
        Column::entity("packagescope", "scope"),
    ]))?;

    Ok(())
}
