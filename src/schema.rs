//! Schema Builder
//!
//! [`SchemaBuilder`] is the single mutable registry of a schema: the type
//! lattice, the tables, raw fragments and the ordered list of items to emit.
//! [`SchemaBuilder::close`] consumes it and returns a frozen [`Schema`], so no
//! partially built schema can be shared with the concurrent stage.

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::diagnostics::{self, Diagnostics};
use crate::error::{NameKind, Result, SchemaError};
use crate::lattice::{Branch, CaseId, CaseType, Closure, EntityType, TypeId, TypeKind, TypeLattice};
use crate::table::{ColumnKind, Table, TableDef, TableId};
use crate::{emit, names};

/// Default length of `varchar` columns in emitted text
pub const DEFAULT_VARCHAR_LENGTH: u32 = 900;

/// Rendering options fixed at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// `N` in `varchar(N)` string columns
    #[serde(default = "default_varchar_length")]
    pub varchar_length: u32,
}

fn default_varchar_length() -> u32 {
    DEFAULT_VARCHAR_LENGTH
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            varchar_length: DEFAULT_VARCHAR_LENGTH,
        }
    }
}

/// One emitted block, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Union(TypeId),
    Alias(TypeId),
    Case(CaseId),
    Table(TableId),
    /// Index into the raw fragment list
    Fragment(usize),
}

// =============================================================================
// Builder
// =============================================================================

/// Mutable registry used during the initialization phase
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    lattice: TypeLattice,
    tables: Vec<Table>,
    table_by_name: HashMap<String, TableId>,
    stores: HashMap<TypeId, TableId>,
    fragments: Vec<String>,
    items: Vec<Item>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    // ========== Types ==========

    pub fn declare_union(&mut self, name: &str, supertypes: &[&str]) -> Result<TypeId> {
        let id = self.lattice.declare_union(name, supertypes)?;
        self.items.push(Item::Union(id));
        Ok(id)
    }

    pub fn declare_primary_key(&mut self, name: &str, supertypes: &[&str]) -> Result<TypeId> {
        self.lattice.declare_primary_key(name, supertypes)
    }

    /// Discriminate the primary-key type `base` by the int column `column`
    pub fn declare_case(&mut self, base: &str, column: &str) -> Result<CaseId> {
        let id = self.lattice.declare_case(base, column)?;
        self.items.push(Item::Case(id));
        Ok(id)
    }

    /// Declare the next branch of `case`; its tag is the case's next integer
    pub fn new_branch(&mut self, case: CaseId, name: &str, extra_supertypes: &[&str]) -> Result<Branch> {
        self.lattice.new_branch(case, name, extra_supertypes)
    }

    pub fn declare_alias(&mut self, name: &str, target: &str) -> Result<TypeId> {
        let id = self.lattice.declare_alias(name, target)?;
        self.items.push(Item::Alias(id));
        Ok(id)
    }

    /// Attach further union supertypes to an already declared type
    pub fn add_supertypes(&mut self, name: &str, supertypes: &[&str]) -> Result<()> {
        self.lattice.add_supertypes(name, supertypes)
    }

    // ========== Tables ==========

    /// Validate and register a table.
    ///
    /// A table whose key column references a primary-key type becomes that
    /// type's canonical store; a type can have only one.
    pub fn declare_table(&mut self, def: TableDef) -> Result<TableId> {
        let name = names::table_name(&def.name)?;
        if self.table_by_name.contains_key(&name) {
            return Err(SchemaError::DuplicateName {
                kind: NameKind::Table,
                name,
            });
        }

        let id = TableId(self.tables.len() as u32);
        let table = Table::resolve(id, def, &self.lattice)?;

        if let Some(ColumnKind::Entity(ty)) = table.key_column().map(|c| c.kind) {
            let ty = self.lattice.resolve(ty);
            if self.lattice.get(ty).kind == TypeKind::PrimaryKey {
                if let Some(existing) = self.stores.get(&ty) {
                    return Err(SchemaError::ConflictingModifiers {
                        table: table.name,
                        reason: format!(
                            "@{} is already keyed by table '{}'",
                            self.lattice.name(ty),
                            self.tables[existing.index()].name
                        ),
                    });
                }
                self.stores.insert(ty, id);
            }
        }

        debug!(table = %table.name, columns = table.columns.len(), "declared table");
        self.table_by_name.insert(table.name.clone(), id);
        self.tables.push(table);
        self.items.push(Item::Table(id));
        Ok(id)
    }

    // ========== Raw fragments ==========

    /// Store `text` verbatim at the current position of the item list
    pub fn add_raw_fragment(&mut self, text: impl Into<String>) {
        let index = self.fragments.len();
        self.fragments.push(text.into());
        self.items.push(Item::Fragment(index));
    }

    // ========== Inspection ==========

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    /// Validate the whole declaration graph and freeze it.
    ///
    /// Fails with `CyclicUnion` when supertype edges form a cycle. Computes the
    /// union closure, the id domains and the diagnostics exactly once.
    pub fn close(self) -> Result<Schema> {
        let closure = Closure::compute(&self.lattice)?;
        let domains = Domains::compute(&self.lattice, &closure, &self.tables, &self.stores);
        let diagnostics = diagnostics::analyze(&self.lattice, &closure, &self.tables, &self.stores);

        for item in &diagnostics {
            warn!(code = %item.code, subject = %item.subject, "{}", item.message);
        }
        info!(
            types = self.lattice.len(),
            cases = self.lattice.cases().len(),
            tables = self.tables.len(),
            fragments = self.fragments.len(),
            domains = domains.names.len(),
            "schema closed"
        );

        Ok(Schema {
            lattice: self.lattice,
            closure,
            tables: self.tables,
            table_by_name: self.table_by_name,
            stores: self.stores,
            fragments: self.fragments,
            items: self.items,
            options: self.options,
            domains,
            diagnostics,
        })
    }
}

// =============================================================================
// Id domains
// =============================================================================

/// Assignment of concrete types to id domains
#[derive(Debug, Clone, Default)]
struct Domains {
    /// Per type (by index): domain index, for concrete types only
    of_type: Vec<Option<usize>>,
    /// Per domain: name of the type it is reported under
    names: Vec<String>,
}

impl Domains {
    /// Every primary-key type starts in its own domain. Unstored primary-key
    /// members of a union that keys a table share that table's key column and
    /// are merged into one domain. Branches draw from their case base.
    fn compute(
        lattice: &TypeLattice,
        closure: &Closure,
        tables: &[Table],
        stores: &HashMap<TypeId, TableId>,
    ) -> Self {
        let mut sets: UnionFind<usize> = UnionFind::new(lattice.len());

        for table in tables {
            let Some(ColumnKind::Entity(key)) = table.key_column().map(|c| c.kind) else {
                continue;
            };
            let key = lattice.resolve(key);
            if lattice.get(key).kind != TypeKind::Union {
                continue;
            }
            let Some(extent) = closure.extent(key) else {
                continue;
            };
            let shared: Vec<TypeId> = extent
                .iter()
                .copied()
                .filter(|&ty| lattice.get(ty).kind == TypeKind::PrimaryKey && !stores.contains_key(&ty))
                .collect();
            if let Some((&first, rest)) = shared.split_first() {
                for &ty in rest {
                    sets.union(first.index(), ty.index());
                }
            }
        }

        let mut of_type = vec![None; lattice.len()];
        let mut by_root: HashMap<usize, usize> = HashMap::new();
        let mut names = Vec::new();

        // Declaration order: a domain is named after its earliest member
        for ty in lattice.types() {
            if ty.kind != TypeKind::PrimaryKey {
                continue;
            }
            let root = sets.find_mut(ty.id.index());
            let domain = *by_root.entry(root).or_insert_with(|| {
                names.push(ty.name.clone());
                names.len() - 1
            });
            of_type[ty.id.index()] = Some(domain);
        }

        for ty in lattice.types() {
            if let TypeKind::Branch { case, .. } = ty.kind {
                of_type[ty.id.index()] = of_type[lattice.case(case).base.index()];
            }
        }

        Self { of_type, names }
    }
}

// =============================================================================
// Frozen schema
// =============================================================================

/// A closed, immutable schema.
///
/// Safe to share between threads by reference or `Arc`; every query is a
/// lookup into state computed at close.
#[derive(Debug)]
pub struct Schema {
    lattice: TypeLattice,
    closure: Closure,
    tables: Vec<Table>,
    table_by_name: HashMap<String, TableId>,
    stores: HashMap<TypeId, TableId>,
    fragments: Vec<String>,
    items: Vec<Item>,
    options: SchemaOptions,
    domains: Domains,
    diagnostics: Diagnostics,
}

impl Schema {
    /// Render the schema text. Byte-identical across calls.
    pub fn emit(&self) -> String {
        let text = emit::render(self);
        info!(items = self.items.len(), bytes = text.len(), "emitted schema");
        text
    }

    /// GraphViz rendering of the type lattice
    pub fn to_dot(&self) -> String {
        crate::lattice::dot::to_dot(&self.lattice)
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn fragment(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(String::as_str)
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // ========== Types ==========

    /// Look up a type by name, with or without the `@` sigil
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.lattice.lookup(name)
    }

    pub fn entity_type(&self, id: TypeId) -> &EntityType {
        self.lattice.get(id)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.lattice.name(id)
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.lattice.get(id).kind
    }

    pub fn types(&self) -> &[EntityType] {
        self.lattice.types()
    }

    /// Every union `ty` belongs to, transitively. Aliases report their target's.
    pub fn unions_of(&self, ty: TypeId) -> Option<&BTreeSet<TypeId>> {
        self.closure.unions_of(ty)
    }

    /// Whether a supertype path leads from `ty` to `union`
    pub fn is_member(&self, ty: TypeId, union: TypeId) -> bool {
        self.lattice
            .try_resolve(union)
            .is_some_and(|union| self.closure.contains(ty, union))
    }

    /// Concrete types whose ids may appear in a column typed by `union`
    pub fn extent(&self, union: TypeId) -> Vec<TypeId> {
        self.lattice
            .try_resolve(union)
            .and_then(|union| self.closure.extent(union))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether an entity of `value` may be stored in a column typed `column`
    pub fn accepts(&self, column: TypeId, value: TypeId) -> bool {
        let (Some(column), Some(value)) = (self.lattice.try_resolve(column), self.lattice.try_resolve(value)) else {
            return false;
        };
        if column == value {
            return true;
        }
        if self.closure.contains(value, column) {
            return true;
        }
        // A branch is an instance of its case base
        match self.lattice.get(value).kind {
            TypeKind::Branch { case, .. } => self.lattice.case(case).base == column,
            _ => false,
        }
    }

    // ========== Cases and tags ==========

    pub fn cases(&self) -> &[CaseType] {
        self.lattice.cases()
    }

    /// `None` for a case handle from another schema
    pub fn case(&self, id: CaseId) -> Option<&CaseType> {
        self.lattice.cases().get(id.index())
    }

    /// Case type discriminating `base`, if any
    pub fn case_of(&self, base: TypeId) -> Option<CaseId> {
        self.lattice.case_of(base)
    }

    /// Emitted name of a case, e.g. `expr.kind`
    pub fn case_name(&self, id: CaseId) -> Option<String> {
        self.case(id).map(|_| self.lattice.case_name(id))
    }

    /// Find a case by its emitted name (`expr.kind`) or by its base type name
    pub fn find_case(&self, name: &str) -> Option<CaseId> {
        let bare = names::bare_type_name(name);
        match bare.split_once('.') {
            Some((base, column)) => {
                let id = self.case_of(self.type_id(base)?)?;
                (self.case(id)?.column == column).then_some(id)
            }
            None => self.case_of(self.type_id(bare)?),
        }
    }

    /// Tag of `branch` within `case`
    pub fn tag(&self, case: CaseId, branch: TypeId) -> Option<u32> {
        match self.lattice.get(self.lattice.try_resolve(branch)?).kind {
            TypeKind::Branch { case: owner, tag } if owner == case => Some(tag),
            _ => None,
        }
    }

    /// Tag of a branch type, whichever case it belongs to
    pub fn branch_tag(&self, branch: TypeId) -> Option<u32> {
        match self.lattice.get(self.lattice.try_resolve(branch)?).kind {
            TypeKind::Branch { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Tag lookup by names, e.g. `("expr.kind", "addexpr")`
    pub fn tag_by_name(&self, case: &str, branch: &str) -> Option<u32> {
        let case = self.find_case(case)?;
        self.tag(case, self.type_id(branch)?)
    }

    /// Branch carrying `tag` in `case`
    pub fn branch_for_tag(&self, case: CaseId, tag: u32) -> Option<TypeId> {
        self.case(case)?.branches.get(tag as usize).copied()
    }

    // ========== Tables ==========

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.table_by_name.get(name).map(|id| &self.tables[id.index()])
    }

    pub fn table_by_id(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    /// Table keyed by the primary-key type `ty`, if any
    pub fn canonical_store(&self, ty: TypeId) -> Option<&Table> {
        self.stores
            .get(&self.lattice.try_resolve(ty)?)
            .map(|id| &self.tables[id.index()])
    }

    // ========== Id domains ==========

    /// Id domain a concrete type allocates from
    pub fn domain_of(&self, ty: TypeId) -> Option<usize> {
        self.domains
            .of_type
            .get(self.lattice.try_resolve(ty)?.index())
            .copied()
            .flatten()
    }

    pub fn domain_count(&self) -> usize {
        self.domains.names.len()
    }

    /// Name of the type a domain is reported under
    pub fn domain_name(&self, domain: usize) -> Option<&str> {
        self.domains.names.get(domain).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::table::Column;

    fn shapes() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("shape", &[]).unwrap();
        builder.declare_primary_key("circle", &["shape"]).unwrap();
        builder.declare_primary_key("square", &["shape"]).unwrap();
        builder
            .declare_table(
                TableDef::new("shapes").columns([Column::entity("shape", "id").key(), Column::int("radius")]),
            )
            .unwrap();
        builder
    }

    #[test]
    fn test_union_keyed_members_share_a_domain() {
        let schema = shapes().close().unwrap();
        let circle = schema.type_id("circle").unwrap();
        let square = schema.type_id("@square").unwrap();

        assert_eq!(schema.domain_count(), 1);
        assert_eq!(schema.domain_of(circle), schema.domain_of(square));
        assert_eq!(schema.domain_of(schema.type_id("shape").unwrap()), None);
        assert!(schema.diagnostics().is_empty());
    }

    #[test]
    fn test_second_store_conflicts() {
        let mut builder = SchemaBuilder::new();
        builder.declare_primary_key("file", &[]).unwrap();
        builder
            .declare_table(TableDef::new("files").column(Column::entity("file", "id").key()))
            .unwrap();
        let err = builder
            .declare_table(TableDef::new("more_files").column(Column::entity("file", "id").key()))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ConflictingModifiers { .. }));
    }

    #[test]
    fn test_duplicate_table() {
        let mut builder = shapes();
        let err = builder
            .declare_table(TableDef::new("shapes").column(Column::int("x")))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { kind: NameKind::Table, .. }));
    }

    #[test]
    fn test_tag_lookups() {
        let mut builder = SchemaBuilder::new();
        builder.declare_primary_key("expr", &[]).unwrap();
        let kind = builder.declare_case("expr", "kind").unwrap();
        let add = builder.new_branch(kind, "add", &[]).unwrap();
        builder.new_branch(kind, "sub", &[]).unwrap();
        let schema = builder.close().unwrap();

        assert_eq!(schema.tag(kind, add.ty), Some(0));
        assert_eq!(schema.tag_by_name("expr.kind", "sub"), Some(1));
        assert_eq!(schema.tag_by_name("@expr", "add"), Some(0));
        assert_eq!(schema.tag_by_name("expr.sort", "add"), None);
        assert_eq!(schema.branch_for_tag(kind, 1), schema.type_id("sub"));
        assert_eq!(schema.branch_for_tag(kind, 2), None);
        assert_eq!(schema.tag(kind, schema.type_id("expr").unwrap()), None);
    }

    #[test]
    fn test_accepts_members_and_branches() {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("exprparent", &[]).unwrap();
        builder.declare_primary_key("expr", &["exprparent"]).unwrap();
        let kind = builder.declare_case("expr", "kind").unwrap();
        builder.new_branch(kind, "ident", &[]).unwrap();
        builder.declare_primary_key("file", &[]).unwrap();
        let schema = builder.close().unwrap();

        let parent = schema.type_id("exprparent").unwrap();
        let expr = schema.type_id("expr").unwrap();
        let ident = schema.type_id("ident").unwrap();
        let file = schema.type_id("file").unwrap();

        assert!(schema.accepts(parent, ident));
        assert!(schema.accepts(expr, ident));
        assert!(!schema.accepts(parent, file));
        assert!(!schema.accepts(ident, expr));
        assert_eq!(schema.domain_of(ident), schema.domain_of(expr));
    }

    #[test]
    fn test_merged_domain_is_named_after_earliest_member() {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("node", &[]).unwrap();
        builder.declare_primary_key("file", &["node"]).unwrap();
        builder.declare_primary_key("folder", &["node"]).unwrap();
        builder.declare_primary_key("package", &[]).unwrap();
        builder.declare_primary_key("symlink", &["node"]).unwrap();
        builder
            .declare_table(TableDef::new("nodes").column(Column::entity("node", "id").key()))
            .unwrap();
        builder
            .declare_table(TableDef::new("packages").column(Column::entity("package", "id").key()))
            .unwrap();
        let schema = builder.close().unwrap();

        let domain = |name: &str| schema.domain_of(schema.type_id(name).unwrap());
        assert_eq!(schema.domain_count(), 2);
        assert_eq!(domain("file"), domain("folder"));
        assert_eq!(domain("file"), domain("symlink"));
        assert_ne!(domain("file"), domain("package"));
        assert_eq!(schema.domain_name(domain("symlink").unwrap()), Some("file"));
        assert_eq!(schema.domain_name(domain("package").unwrap()), Some("package"));
    }

    #[test]
    fn test_handles_from_another_schema_are_rejected() {
        let mut big = SchemaBuilder::new();
        big.declare_union("exprparent", &[]).unwrap();
        for base in ["comment", "expr", "stmt"] {
            big.declare_primary_key(base, &["exprparent"]).unwrap();
        }
        let mut foreign_case = None;
        for base in ["comment", "expr", "stmt"] {
            foreign_case = Some(big.declare_case(base, "kind").unwrap());
        }
        let foreign_case = foreign_case.unwrap();
        let foreign_type = big.new_branch(foreign_case, "ifstmt", &[]).unwrap().ty;

        let mut small = SchemaBuilder::new();
        small.declare_primary_key("expr", &[]).unwrap();
        let kind = small.declare_case("expr", "kind").unwrap();
        small.new_branch(kind, "ident", &[]).unwrap();
        let schema = small.close().unwrap();
        let expr = schema.type_id("expr").unwrap();

        assert!(schema.case(foreign_case).is_none());
        assert_eq!(schema.case_name(foreign_case), None);
        assert_eq!(schema.branch_for_tag(foreign_case, 0), None);
        assert_eq!(schema.tag(kind, foreign_type), None);
        assert_eq!(schema.branch_tag(foreign_type), None);
        assert_eq!(schema.unions_of(foreign_type), None);
        assert!(!schema.is_member(expr, foreign_type));
        assert!(!schema.accepts(expr, foreign_type));
        assert!(schema.extent(foreign_type).is_empty());
        assert_eq!(schema.domain_of(foreign_type), None);
    }

    #[test]
    fn test_close_reports_diagnostics() {
        let mut builder = SchemaBuilder::new();
        builder.declare_union("empty", &[]).unwrap();
        builder.declare_primary_key("stmt", &[]).unwrap();
        builder.declare_case("stmt", "kind").unwrap();
        builder
            .declare_table(TableDef::new("stmts").column(Column::entity("stmt", "id").key()))
            .unwrap();
        let schema = builder.close().unwrap();

        let diags = schema.diagnostics();
        assert!(diags.has_code(DiagnosticCode::EmptyUnion));
        assert!(diags.has_code(DiagnosticCode::EmptyCase));
        assert!(diags.has_code(DiagnosticCode::MissingDiscriminator));
        assert!(!diags.has_code(DiagnosticCode::UnstoredPrimaryKey));
    }
}
