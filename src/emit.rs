//! Schema Emitter
//!
//! Renders a closed [`Schema`] into the external schema text. Output depends
//! only on the schema: items in declaration order, separated by one blank line.

use std::fmt::Write;

use crate::lattice::{CaseId, TypeId, TypeKind};
use crate::schema::{Item, Schema};
use crate::table::{ColumnKind, Modifier, Table, TableColumn};

pub(crate) fn render(schema: &Schema) -> String {
    let blocks: Vec<String> = schema
        .items()
        .iter()
        .filter_map(|item| match *item {
            Item::Union(id) => union(schema, id),
            Item::Alias(id) => Some(alias(schema, id)),
            Item::Case(id) => case(schema, id),
            Item::Table(id) => Some(table(schema, schema.table_by_id(id))),
            Item::Fragment(index) => schema.fragment(index).map(fragment),
        })
        .collect();

    blocks.join("\n")
}

/// `@name = @a | @b;`, or nothing for a union without members
fn union(schema: &Schema, id: TypeId) -> Option<String> {
    let ty = schema.entity_type(id);
    if ty.members.is_empty() {
        return None;
    }

    let is_branch = |m: &&TypeId| matches!(schema.kind(**m), TypeKind::Branch { .. });
    let ordered = ty
        .members
        .iter()
        .filter(|m| !is_branch(m))
        .chain(ty.members.iter().filter(|m| is_branch(m)));

    let members: Vec<String> = ordered.map(|&m| format!("@{}", schema.type_name(m))).collect();
    Some(format!("@{} = {};\n", ty.name, members.join(" | ")))
}

fn alias(schema: &Schema, id: TypeId) -> String {
    let ty = schema.entity_type(id);
    match ty.kind {
        TypeKind::Alias { target } => format!("@{} = @{};\n", ty.name, schema.type_name(target)),
        _ => String::new(),
    }
}

fn case(schema: &Schema, id: CaseId) -> Option<String> {
    let case = schema.case(id)?;
    if case.branches.is_empty() {
        return None;
    }

    let mut out = format!("case @{} of\n", schema.case_name(id)?);
    for (position, &branch) in case.branches.iter().enumerate() {
        let prefix = if position == 0 { "  " } else { "| " };
        let tag = schema.branch_tag(branch).unwrap_or(position as u32);
        let _ = writeln!(out, "{}{} = @{}", prefix, tag, schema.type_name(branch));
    }
    out.push_str(";\n");
    Some(out)
}

fn table(schema: &Schema, table: &Table) -> String {
    let mut out = String::new();
    for key_set in table.key_set_names() {
        let _ = writeln!(out, "#keyset[{}]", key_set.join(", "));
    }

    let _ = writeln!(out, "{}(", table.name);
    let last = table.columns.len().saturating_sub(1);
    for (i, column) in table.columns.iter().enumerate() {
        let separator = if i == last { "" } else { "," };
        let _ = writeln!(out, "  {}{}", column_line(schema, column), separator);
    }
    out.push_str(");\n");
    out
}

pub(crate) fn column_line(schema: &Schema, column: &TableColumn) -> String {
    let storage = match column.kind {
        ColumnKind::Entity(ty) if column.modifier == Modifier::Key => {
            return format!("unique int {}: @{}", column.name, schema.type_name(ty));
        }
        ColumnKind::Entity(ty) => format!("int {}: @{} ref", column.name, schema.type_name(ty)),
        ColumnKind::Int => format!("int {}: int ref", column.name),
        ColumnKind::String => format!(
            "varchar({}) {}: string ref",
            schema.options().varchar_length,
            column.name
        ),
        ColumnKind::Date => format!("date {}: date ref", column.name),
        ColumnKind::Float => format!("float {}: float ref", column.name),
    };

    match column.modifier {
        Modifier::Unique => format!("unique {}", storage),
        _ => storage,
    }
}

fn fragment(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{SchemaBuilder, SchemaOptions};
    use crate::table::{Column, TableDef};

    #[test]
    fn test_table_rendering() {
        let mut builder = SchemaBuilder::new().with_options(SchemaOptions { varchar_length: 255 });
        builder.declare_union("exprparent", &[]).unwrap();
        builder.declare_primary_key("expr", &["exprparent"]).unwrap();
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
        builder
            .declare_table(TableDef::new("literals").columns([
                Column::entity("expr", "expr").unique(),
                Column::string("value"),
                Column::float("approx"),
                Column::date("seen"),
            ]))
            .unwrap();
        let text = builder.close().unwrap().emit();

        let expected = "\
@exprparent = @expr;

#keyset[parent, idx]
exprs(
  unique int id: @expr,
  int kind: int ref,
  int parent: @exprparent ref,
  int idx: int ref
);

literals(
  unique int expr: @expr ref,
  varchar(255) value: string ref,
  float approx: float ref,
  date seen: date ref
);
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_branches_follow_direct_members() {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("binaryexpr", &[]).unwrap();
        builder.declare_primary_key("expr", &[]).unwrap();
        let kind = builder.declare_case("expr", "kind").unwrap();
        builder.new_branch(kind, "addexpr", &["binaryexpr"]).unwrap();
        builder.declare_primary_key("fake", &["binaryexpr"]).unwrap();
        builder.new_branch(kind, "subexpr", &["binaryexpr"]).unwrap();

        let text = builder.close().unwrap().emit();
        assert!(text.contains("@binaryexpr = @fake | @addexpr | @subexpr;\n"));
        assert!(text.contains("case @expr.kind of\n  0 = @addexpr\n| 1 = @subexpr\n;\n"));
    }

    #[test]
    fn test_fragments_are_verbatim_and_skipped_items_leave_no_gap() {
        let mut builder = SchemaBuilder::new();
        builder.add_raw_fragment("sourceLocationPrefix(varchar(900) prefix: string ref);");
        builder.declare_union("unused", &[]).unwrap();
        builder.add_raw_fragment("@a = @b;\n");
        builder.declare_primary_key("file", &[]).unwrap();
        builder.declare_alias("sourcefile", "file").unwrap();

        let text = builder.close().unwrap().emit();
        assert_eq!(
            text,
            "sourceLocationPrefix(varchar(900) prefix: string ref);\n\n@a = @b;\n\n@sourcefile = @file;\n"
        );
    }
}
