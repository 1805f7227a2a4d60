//! Schema compatibility checking
//!
//! Compares a released [`SchemaManifest`] with a new one. Branch tags are
//! stored in existing rows, so a branch must keep its tag forever: appending
//! branches to a case is compatible, while inserting, reordering or removing
//! them is breaking. Tables may be added; removing or changing one is breaking.
//! Unions may gain members but not lose them, since existing rows in columns
//! typed by a union must stay well-typed. Aliases may be added but not removed
//! or pointed elsewhere. Raw fragments are opaque: any edit to a released one
//! is breaking.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeSet, HashMap};

use crate::manifest::SchemaManifest;
use crate::version::Bump;

/// Result of a compatibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub is_compatible: bool,
    pub is_breaking: bool,
    pub changes: Vec<SchemaChange>,
    pub summary: String,
    /// Smallest version increment that covers the changes
    pub suggested_bump: Bump,
}

impl CompatibilityResult {
    pub fn compatible(changes: Vec<SchemaChange>, bump: Bump) -> Self {
        let summary = if changes.is_empty() {
            "No changes detected".to_string()
        } else {
            format!("{} compatible changes detected", changes.len())
        };
        Self {
            is_compatible: true,
            is_breaking: false,
            changes,
            summary,
            suggested_bump: bump,
        }
    }

    pub fn incompatible(changes: Vec<SchemaChange>, reason: impl Into<String>, bump: Bump) -> Self {
        let is_breaking = changes.iter().any(|c| c.is_breaking);
        Self {
            is_compatible: false,
            is_breaking,
            changes,
            summary: reason.into(),
            suggested_bump: bump,
        }
    }

    pub fn breaking_changes(&self) -> impl Iterator<Item = &SchemaChange> {
        self.changes.iter().filter(|c| c.is_breaking)
    }
}

/// A detected change between two schema versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaChange {
    pub change_type: ChangeType,
    /// Case (`expr.kind`), case branch (`expr.kind/addexpr`) or table name
    pub path: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub is_breaking: bool,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    CaseAdded,
    CaseRemoved,
    /// New branch with a tag past every old one
    BranchAppended,
    /// New branch taking a tag an old branch used to have
    BranchInserted,
    /// Existing branch whose tag moved
    BranchRetagged,
    BranchRemoved,
    TableAdded,
    TableRemoved,
    /// Columns of an existing table differ
    TableChanged,
    UnionAdded,
    UnionRemoved,
    /// Type newly listed as a direct member of a union
    MemberAdded,
    /// Type no longer a direct member of a union
    MemberRemoved,
    AliasAdded,
    AliasRemoved,
    /// Alias now names a different type
    AliasRetargeted,
    FragmentAdded,
    FragmentRemoved,
    /// Released fragment text differs
    FragmentChanged,
    /// Emitted line added (text diff only)
    LineAdded,
    /// Emitted line removed (text diff only)
    LineRemoved,
}

impl ChangeType {
    pub fn is_breaking(&self) -> bool {
        matches!(
            self,
            ChangeType::CaseRemoved
                | ChangeType::BranchInserted
                | ChangeType::BranchRetagged
                | ChangeType::BranchRemoved
                | ChangeType::TableRemoved
                | ChangeType::TableChanged
                | ChangeType::UnionRemoved
                | ChangeType::MemberRemoved
                | ChangeType::AliasRemoved
                | ChangeType::AliasRetargeted
                | ChangeType::FragmentRemoved
                | ChangeType::FragmentChanged
        )
    }
}

/// Compatibility checker for schema releases
#[derive(Debug, Clone, Default)]
pub struct CompatibilityChecker {
    /// Any change at all is treated as incompatible
    strict_mode: bool,
}

impl CompatibilityChecker {
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn check(&self, old: &SchemaManifest, new: &SchemaManifest) -> CompatibilityResult {
        let mut changes = Vec::new();
        detect_case_changes(old, new, &mut changes);
        detect_union_changes(old, new, &mut changes);
        detect_alias_changes(old, new, &mut changes);
        detect_fragment_changes(old, new, &mut changes);
        detect_table_changes(old, new, &mut changes);

        let breaking_count = changes.iter().filter(|c| c.is_breaking).count();
        let bump = if breaking_count > 0 {
            Bump::Major
        } else if !changes.is_empty() {
            Bump::Minor
        } else if old.checksum != new.checksum {
            Bump::Patch
        } else {
            Bump::None
        };

        if self.strict_mode && bump != Bump::None {
            let reason = if changes.is_empty() {
                "Strict mode: schema text changed".to_string()
            } else {
                format!("Strict mode: {} changes detected", changes.len())
            };
            CompatibilityResult::incompatible(changes, reason, bump)
        } else if breaking_count > 0 {
            CompatibilityResult::incompatible(changes, format!("{} breaking changes detected", breaking_count), bump)
        } else {
            CompatibilityResult::compatible(changes, bump)
        }
    }

    /// Line-level diff of two emitted schema texts
    pub fn diff_text(&self, old: &str, new: &str) -> Vec<SchemaChange> {
        let diff = TextDiff::from_lines(old, new);
        let mut changes = Vec::new();

        for change in diff.iter_all_changes() {
            let line = change.value().trim_end_matches('\n').to_string();
            let (change_type, old_value, new_value, description) = match change.tag() {
                ChangeTag::Delete => (ChangeType::LineRemoved, Some(line), None, "Line removed"),
                ChangeTag::Insert => (ChangeType::LineAdded, None, Some(line), "Line added"),
                ChangeTag::Equal => continue,
            };
            changes.push(SchemaChange {
                change_type,
                path: "schema".to_string(),
                old_value,
                new_value,
                is_breaking: false,
                description: description.to_string(),
            });
        }
        changes
    }
}

fn change(
    change_type: ChangeType,
    path: String,
    old_value: Option<String>,
    new_value: Option<String>,
    description: String,
) -> SchemaChange {
    SchemaChange {
        change_type,
        path,
        old_value,
        new_value,
        is_breaking: change_type.is_breaking(),
        description,
    }
}

fn detect_case_changes(old: &SchemaManifest, new: &SchemaManifest, changes: &mut Vec<SchemaChange>) {
    for (case, old_branches) in &old.cases {
        let Some(new_branches) = new.cases.get(case) else {
            changes.push(change(
                ChangeType::CaseRemoved,
                case.clone(),
                Some(old_branches.join(", ")),
                None,
                format!("Case '{}' was removed", case),
            ));
            continue;
        };

        let old_tags: HashMap<&str, usize> =
            old_branches.iter().enumerate().map(|(t, b)| (b.as_str(), t)).collect();
        let new_tags: HashMap<&str, usize> =
            new_branches.iter().enumerate().map(|(t, b)| (b.as_str(), t)).collect();

        for (old_tag, branch) in old_branches.iter().enumerate() {
            let path = format!("{}/{}", case, branch);
            match new_tags.get(branch.as_str()) {
                None => changes.push(change(
                    ChangeType::BranchRemoved,
                    path,
                    Some(old_tag.to_string()),
                    None,
                    format!("Branch '{}' (tag {}) was removed", branch, old_tag),
                )),
                Some(&new_tag) if new_tag != old_tag => changes.push(change(
                    ChangeType::BranchRetagged,
                    path,
                    Some(old_tag.to_string()),
                    Some(new_tag.to_string()),
                    format!("Branch '{}' moved from tag {} to {}", branch, old_tag, new_tag),
                )),
                Some(_) => {}
            }
        }

        for (new_tag, branch) in new_branches.iter().enumerate() {
            if old_tags.contains_key(branch.as_str()) {
                continue;
            }
            let path = format!("{}/{}", case, branch);
            if new_tag < old_branches.len() {
                changes.push(change(
                    ChangeType::BranchInserted,
                    path,
                    Some(old_branches[new_tag].clone()),
                    Some(new_tag.to_string()),
                    format!(
                        "Branch '{}' takes tag {}, previously '{}'",
                        branch, new_tag, old_branches[new_tag]
                    ),
                ));
            } else {
                changes.push(change(
                    ChangeType::BranchAppended,
                    path,
                    None,
                    Some(new_tag.to_string()),
                    format!("Branch '{}' was appended with tag {}", branch, new_tag),
                ));
            }
        }
    }

    for (case, branches) in &new.cases {
        if !old.cases.contains_key(case) {
            changes.push(change(
                ChangeType::CaseAdded,
                case.clone(),
                None,
                Some(branches.join(", ")),
                format!("Case '{}' was added", case),
            ));
        }
    }
}

fn detect_union_changes(old: &SchemaManifest, new: &SchemaManifest, changes: &mut Vec<SchemaChange>) {
    for (union, old_members) in &old.unions {
        let Some(new_members) = new.unions.get(union) else {
            changes.push(change(
                ChangeType::UnionRemoved,
                union.clone(),
                Some(old_members.join(" | ")),
                None,
                format!("Union '@{}' was removed", union),
            ));
            continue;
        };

        let kept: BTreeSet<&str> = new_members.iter().map(String::as_str).collect();
        for member in old_members.iter().filter(|m| !kept.contains(m.as_str())) {
            changes.push(change(
                ChangeType::MemberRemoved,
                format!("{}/{}", union, member),
                Some(member.clone()),
                None,
                format!("'@{}' is no longer a member of '@{}'", member, union),
            ));
        }

        let known: BTreeSet<&str> = old_members.iter().map(String::as_str).collect();
        for member in new_members.iter().filter(|m| !known.contains(m.as_str())) {
            changes.push(change(
                ChangeType::MemberAdded,
                format!("{}/{}", union, member),
                None,
                Some(member.clone()),
                format!("'@{}' joined '@{}'", member, union),
            ));
        }
    }

    for (union, members) in &new.unions {
        if !old.unions.contains_key(union) {
            changes.push(change(
                ChangeType::UnionAdded,
                union.clone(),
                None,
                Some(members.join(" | ")),
                format!("Union '@{}' was added", union),
            ));
        }
    }
}

fn detect_alias_changes(old: &SchemaManifest, new: &SchemaManifest, changes: &mut Vec<SchemaChange>) {
    for (alias, old_target) in &old.aliases {
        match new.aliases.get(alias) {
            None => changes.push(change(
                ChangeType::AliasRemoved,
                alias.clone(),
                Some(old_target.clone()),
                None,
                format!("Alias '@{}' was removed", alias),
            )),
            Some(new_target) if new_target != old_target => changes.push(change(
                ChangeType::AliasRetargeted,
                alias.clone(),
                Some(old_target.clone()),
                Some(new_target.clone()),
                format!("Alias '@{}' now names '@{}' instead of '@{}'", alias, new_target, old_target),
            )),
            Some(_) => {}
        }
    }

    for (alias, target) in &new.aliases {
        if !old.aliases.contains_key(alias) {
            changes.push(change(
                ChangeType::AliasAdded,
                alias.clone(),
                None,
                Some(target.clone()),
                format!("Alias '@{}' was added", alias),
            ));
        }
    }
}

fn detect_fragment_changes(old: &SchemaManifest, new: &SchemaManifest, changes: &mut Vec<SchemaChange>) {
    for (index, old_sum) in old.fragments.iter().enumerate() {
        let path = format!("fragment#{}", index);
        match new.fragments.get(index) {
            None => changes.push(change(
                ChangeType::FragmentRemoved,
                path,
                Some(old_sum.to_string()),
                None,
                format!("Raw fragment {} was removed", index),
            )),
            Some(new_sum) if new_sum != old_sum => changes.push(change(
                ChangeType::FragmentChanged,
                path,
                Some(old_sum.to_string()),
                Some(new_sum.to_string()),
                format!("Raw fragment {} changed", index),
            )),
            Some(_) => {}
        }
    }

    for (index, sum) in new.fragments.iter().enumerate().skip(old.fragments.len()) {
        changes.push(change(
            ChangeType::FragmentAdded,
            format!("fragment#{}", index),
            None,
            Some(sum.to_string()),
            format!("Raw fragment {} was added", index),
        ));
    }
}

fn detect_table_changes(old: &SchemaManifest, new: &SchemaManifest, changes: &mut Vec<SchemaChange>) {
    for table in &old.tables {
        match new.table(&table.name) {
            None => changes.push(change(
                ChangeType::TableRemoved,
                table.name.clone(),
                Some(table.columns.join(", ")),
                None,
                format!("Table '{}' was removed", table.name),
            )),
            Some(current) if current.columns != table.columns => changes.push(change(
                ChangeType::TableChanged,
                table.name.clone(),
                Some(table.columns.join(", ")),
                Some(current.columns.join(", ")),
                format!("Columns of table '{}' changed", table.name),
            )),
            Some(_) => {}
        }
    }

    for table in &new.tables {
        if old.table(&table.name).is_none() {
            changes.push(change(
                ChangeType::TableAdded,
                table.name.clone(),
                None,
                Some(table.columns.join(", ")),
                format!("Table '{}' was added", table.name),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaBuilder};
    use crate::table::{Column, TableDef};
    use crate::version::SchemaVersion;

    fn schema(branches: &[&str], extra_table: bool) -> Schema {
        let mut builder = SchemaBuilder::new();
        builder.declare_primary_key("expr", &[]).unwrap();
        let kind = builder.declare_case("expr", "kind").unwrap();
        for branch in branches {
            builder.new_branch(kind, branch, &[]).unwrap();
        }
        builder
            .declare_table(TableDef::new("exprs").columns([Column::entity("expr", "id").key(), Column::int("kind")]))
            .unwrap();
        if extra_table {
            builder
                .declare_table(TableDef::new("literals").columns([Column::entity("expr", "expr"), Column::string("value")]))
                .unwrap();
        }
        builder.close().unwrap()
    }

    fn manifest(branches: &[&str], extra_table: bool) -> SchemaManifest {
        SchemaManifest::from_schema(&schema(branches, extra_table), SchemaVersion::default())
    }

    #[test]
    fn test_unchanged_schema() {
        let old = manifest(&["add", "sub"], false);
        let new = manifest(&["add", "sub"], false);
        let result = CompatibilityChecker::new().check(&old, &new);

        assert!(result.is_compatible);
        assert!(result.changes.is_empty());
        assert_eq!(result.suggested_bump, Bump::None);
    }

    #[test]
    fn test_appending_branch_and_table_is_compatible() {
        let old = manifest(&["add", "sub"], false);
        let new = manifest(&["add", "sub", "mul"], true);
        let result = CompatibilityChecker::new().check(&old, &new);

        assert!(result.is_compatible);
        assert_eq!(result.suggested_bump, Bump::Minor);
        let types: Vec<ChangeType> = result.changes.iter().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::BranchAppended, ChangeType::TableAdded]);
    }

    #[test]
    fn test_inserting_branch_is_breaking() {
        let old = manifest(&["add", "sub"], false);
        let new = manifest(&["add", "mul", "sub"], false);
        let result = CompatibilityChecker::new().check(&old, &new);

        assert!(!result.is_compatible);
        assert!(result.is_breaking);
        assert_eq!(result.suggested_bump, Bump::Major);
        assert!(result.changes.iter().any(|c| c.change_type == ChangeType::BranchInserted));
        assert!(result.changes.iter().any(|c| c.change_type == ChangeType::BranchRetagged));
    }

    #[test]
    fn test_reorder_and_removal_are_breaking() {
        let old = manifest(&["add", "sub"], true);
        let swapped = manifest(&["sub", "add"], true);
        let result = CompatibilityChecker::new().check(&old, &swapped);
        assert_eq!(result.breaking_changes().count(), 2);

        let trimmed = manifest(&["add"], false);
        let result = CompatibilityChecker::new().check(&old, &trimmed);
        let types: Vec<ChangeType> = result.breaking_changes().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::BranchRemoved, ChangeType::TableRemoved]);
    }

    #[test]
    fn test_strict_mode_rejects_compatible_changes() {
        let old = manifest(&["add"], false);
        let new = manifest(&["add", "sub"], false);
        let result = CompatibilityChecker::new().strict().check(&old, &new);

        assert!(!result.is_compatible);
        assert!(!result.is_breaking);
    }

    fn parented(members: &[&str], fragment: &str, alias_target: &str) -> SchemaManifest {
        let mut builder = SchemaBuilder::new();
        builder.add_raw_fragment(fragment);
        builder.declare_union("exprparent", &[]).unwrap();
        for name in ["expr", "file", "stmt"] {
            builder.declare_primary_key(name, &[]).unwrap();
        }
        for member in members {
            builder.add_supertypes(member, &["exprparent"]).unwrap();
        }
        builder.declare_alias("container", alias_target).unwrap();
        SchemaManifest::from_schema(&builder.close().unwrap(), SchemaVersion::default())
    }

    #[test]
    fn test_dropping_a_union_member_is_breaking() {
        let old = parented(&["expr", "file"], "a();", "file");
        let new = parented(&["expr"], "a();", "file");
        let result = CompatibilityChecker::new().check(&old, &new);

        assert!(result.is_breaking);
        assert_eq!(result.suggested_bump, Bump::Major);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].change_type, ChangeType::MemberRemoved);
        assert_eq!(result.changes[0].path, "exprparent/file");
    }

    #[test]
    fn test_adding_a_union_member_is_minor() {
        let old = parented(&["expr"], "a();", "file");
        let new = parented(&["expr", "stmt"], "a();", "file");
        let result = CompatibilityChecker::new().check(&old, &new);

        assert!(result.is_compatible);
        assert_eq!(result.suggested_bump, Bump::Minor);
        let types: Vec<ChangeType> = result.changes.iter().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::MemberAdded]);
    }

    #[test]
    fn test_alias_and_fragment_edits_are_breaking() {
        let old = parented(&["expr"], "a();", "file");

        let retargeted = parented(&["expr"], "a();", "stmt");
        let result = CompatibilityChecker::new().check(&old, &retargeted);
        let types: Vec<ChangeType> = result.breaking_changes().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::AliasRetargeted]);

        let edited = parented(&["expr"], "b();", "file");
        let result = CompatibilityChecker::new().check(&old, &edited);
        let types: Vec<ChangeType> = result.breaking_changes().map(|c| c.change_type).collect();
        assert_eq!(types, vec![ChangeType::FragmentChanged]);
        assert_eq!(result.suggested_bump, Bump::Major);
    }

    #[test]
    fn test_text_diff() {
        let changes = CompatibilityChecker::new().diff_text("a\nb\n", "a\nc\n");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_type, ChangeType::LineRemoved);
        assert_eq!(changes[0].old_value.as_deref(), Some("b"));
        assert_eq!(changes[1].new_value.as_deref(), Some("c"));
    }
}
