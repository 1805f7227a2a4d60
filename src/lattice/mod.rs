//! Entity Type Lattice
//!
//! The DAG of declared entity types, kept in a petgraph `DiGraph`. Nodes are
//! unions, primary-key types, branches and aliases. Edges run from a member to
//! the union it belongs to, and from a branch to the primary-key type its case
//! discriminates.
//!
//! Every reference must name an already declared type, so declaration order is
//! a topological order for everything except `add_supertypes`. Cycles are
//! therefore only possible through `add_supertypes` and are rejected when the
//! lattice is closed (see [`closure`]).

pub mod closure;
pub mod dot;

pub use closure::Closure;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{NameKind, Result, SchemaError};
use crate::names;

// =============================================================================
// Identifiers
// =============================================================================

/// Handle for a declared type. Ids are dense and follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn node(self) -> NodeIndex {
        NodeIndex::new(self.index())
    }

    pub(crate) fn from_node(node: NodeIndex) -> Self {
        Self(node.index() as u32)
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Handle for a declared case type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(u32);

impl CaseId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// Types
// =============================================================================

/// What a declared type is.
///
/// A *case type* is not a separate kind: it is a primary-key type that gained
/// a discriminator column through `declare_case` (see [`CaseType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Abstract grouping with no storage
    Union,
    /// Concrete type with its own id domain
    PrimaryKey,
    /// Concrete sub-type of a case, tagged within it
    Branch { case: CaseId, tag: u32 },
    /// Rename of another type
    Alias { target: TypeId },
}

impl TypeKind {
    /// Concrete types own (or share) an id domain and can be instantiated
    pub fn is_concrete(&self) -> bool {
        matches!(self, TypeKind::PrimaryKey | TypeKind::Branch { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Union => "union",
            TypeKind::PrimaryKey => "primary-key type",
            TypeKind::Branch { .. } => "branch type",
            TypeKind::Alias { .. } => "alias",
        }
    }
}

/// Types of edges in the lattice graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Member -> union it belongs to
    Supertype,
    /// Branch -> primary-key type discriminated by its case
    CaseBase,
}

/// A declared type
#[derive(Debug, Clone)]
pub struct EntityType {
    pub id: TypeId,
    /// Bare name, without the `@` sigil
    pub name: String,
    pub kind: TypeKind,
    /// Unions this type is a direct member of, in the order the edges were added
    pub supertypes: Vec<TypeId>,
    /// Direct members (unions only), in the order membership was established
    pub members: Vec<TypeId>,
}

/// A primary-key type discriminated by an integer column.
///
/// Each case owns its tag counter, so tag allocation is positional and isolated
/// per case and per lattice.
#[derive(Debug, Clone)]
pub struct CaseType {
    pub id: CaseId,
    pub base: TypeId,
    pub column: String,
    /// Branches in tag order
    pub branches: Vec<TypeId>,
    next_tag: u32,
}

/// Handle returned when a branch is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub ty: TypeId,
    pub case: CaseId,
    pub tag: u32,
}

// =============================================================================
// Lattice
// =============================================================================

/// Mutable registry of types, owned by the schema builder until close
#[derive(Debug, Clone, Default)]
pub struct TypeLattice {
    pub(crate) types: Vec<EntityType>,
    pub(crate) by_name: HashMap<String, TypeId>,
    pub(crate) cases: Vec<CaseType>,
    pub(crate) case_by_base: HashMap<TypeId, CaseId>,
    pub(crate) graph: DiGraph<TypeId, EdgeKind>,
}

impl TypeLattice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an abstract union, optionally itself a member of `supertypes`
    pub fn declare_union(&mut self, name: &str, supertypes: &[&str]) -> Result<TypeId> {
        self.declare_member(name, TypeKind::Union, supertypes)
    }

    /// Declare a concrete primary-key type belonging to `supertypes`
    pub fn declare_primary_key(&mut self, name: &str, supertypes: &[&str]) -> Result<TypeId> {
        self.declare_member(name, TypeKind::PrimaryKey, supertypes)
    }

    /// Turn the primary-key type `base` into a case type discriminated by `column`
    pub fn declare_case(&mut self, base: &str, column: &str) -> Result<CaseId> {
        let column = names::column_name(column)?;
        let declared = self.require(base, "case base")?;
        let base_id = self.resolve(declared);
        let base_type = self.get(base_id);

        if base_type.kind != TypeKind::PrimaryKey {
            return Err(SchemaError::InvalidCaseBase {
                base: names::bare_type_name(base).to_string(),
                reason: format!("'@{}' is a {}", base_type.name, base_type.kind.label()),
            });
        }
        if let Some(&existing) = self.case_by_base.get(&base_id) {
            return Err(SchemaError::InvalidCaseBase {
                base: names::bare_type_name(base).to_string(),
                reason: format!("already discriminated by case @{}", self.case_name(existing)),
            });
        }

        let id = CaseId(self.cases.len() as u32);
        self.cases.push(CaseType {
            id,
            base: base_id,
            column,
            branches: Vec::new(),
            next_tag: 0,
        });
        self.case_by_base.insert(base_id, id);
        debug!(case = %self.case_name(id), "declared case type");
        Ok(id)
    }

    /// Declare the next branch of `case`.
    ///
    /// The tag is the case's next unused integer, independent of `name`. A call
    /// that fails validation does not consume a tag.
    pub fn new_branch(&mut self, case: CaseId, name: &str, extra_supertypes: &[&str]) -> Result<Branch> {
        let name = names::type_name(name)?;
        self.ensure_fresh(&name)?;
        let supers = self.resolve_supertypes(&name, extra_supertypes)?;

        let case_type = self.cases.get_mut(case.index()).ok_or_else(|| {
            SchemaError::UnknownTypeReference {
                name: format!("case #{}", case.index()),
                context: format!("branch '{}'", name),
                suggestion: None,
            }
        })?;
        let tag = case_type.next_tag;
        case_type.next_tag += 1;
        let base = case_type.base;

        let ty = self.insert(name, TypeKind::Branch { case, tag }, supers);
        self.graph.add_edge(ty.node(), base.node(), EdgeKind::CaseBase);
        self.cases[case.index()].branches.push(ty);

        Ok(Branch { ty, case, tag })
    }

    /// Declare `name` as another name for `target`
    pub fn declare_alias(&mut self, name: &str, target: &str) -> Result<TypeId> {
        let name = names::type_name(name)?;
        self.ensure_fresh(&name)?;
        let target = self.require(target, &format!("alias '{}'", name))?;
        Ok(self.insert(name, TypeKind::Alias { target }, Vec::new()))
    }

    /// Make an existing type a member of further unions.
    ///
    /// Aliases forward the membership to the type they name. Edges that already
    /// exist are ignored.
    pub fn add_supertypes(&mut self, name: &str, supertypes: &[&str]) -> Result<()> {
        let declared = self.require(name, "supertype extension")?;
        let member = self.resolve(declared);
        let supers = self.resolve_supertypes(names::bare_type_name(name), supertypes)?;
        for union in supers {
            self.link(member, union);
        }
        Ok(())
    }

    // ========== Lookup ==========

    /// Find a type by name (with or without the `@` sigil)
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(names::bare_type_name(name)).copied()
    }

    /// Find a type by name or fail with `UnknownTypeReference`
    pub fn require(&self, name: &str, context: &str) -> Result<TypeId> {
        let bare = names::bare_type_name(name);
        self.lookup(bare).ok_or_else(|| SchemaError::UnknownTypeReference {
            name: bare.to_string(),
            context: context.to_string(),
            suggestion: self.suggest(bare),
        })
    }

    /// Closest declared name to `query`, if any matches at all
    pub fn suggest(&self, query: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.types
            .iter()
            .filter_map(|t| matcher.fuzzy_match(&t.name, query).map(|score| (score, &t.name)))
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, name)| name.clone())
    }

    /// Follow alias chains to the type they finally name
    pub fn resolve(&self, id: TypeId) -> TypeId {
        let mut current = id;
        // Alias targets are always declared earlier, so this terminates.
        while let TypeKind::Alias { target } = self.get(current).kind {
            current = target;
        }
        current
    }

    /// Like [`resolve`](Self::resolve), but `None` for an id this lattice
    /// never handed out
    pub fn try_resolve(&self, id: TypeId) -> Option<TypeId> {
        self.types.get(id.index()).map(|_| self.resolve(id))
    }

    pub fn get(&self, id: TypeId) -> &EntityType {
        &self.types[id.index()]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn types(&self) -> &[EntityType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn case(&self, id: CaseId) -> &CaseType {
        &self.cases[id.index()]
    }

    pub fn cases(&self) -> &[CaseType] {
        &self.cases
    }

    /// Case type discriminating `base`, if one was declared
    pub fn case_of(&self, base: TypeId) -> Option<CaseId> {
        self.case_by_base.get(&self.resolve(base)).copied()
    }

    /// Emitted name of a case, e.g. `expr.kind`
    pub fn case_name(&self, id: CaseId) -> String {
        let case = self.case(id);
        format!("{}.{}", self.name(case.base), case.column)
    }

    /// Direct successors over lattice edges, in id order
    pub(crate) fn successors(&self, id: TypeId) -> Vec<TypeId> {
        let mut next: Vec<TypeId> = self
            .graph
            .neighbors_directed(id.node(), Direction::Outgoing)
            .map(TypeId::from_node)
            .collect();
        next.sort();
        next.dedup();
        next
    }

    // ========== Internals ==========

    fn declare_member(&mut self, name: &str, kind: TypeKind, supertypes: &[&str]) -> Result<TypeId> {
        let name = names::type_name(name)?;
        self.ensure_fresh(&name)?;
        let supers = self.resolve_supertypes(&name, supertypes)?;
        Ok(self.insert(name, kind, supers))
    }

    fn insert(&mut self, name: String, kind: TypeKind, supertypes: Vec<TypeId>) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        let node = self.graph.add_node(id);
        debug_assert_eq!(node, id.node());

        debug!(name = %name, kind = kind.label(), "declared type");
        self.types.push(EntityType {
            id,
            name: name.clone(),
            kind,
            supertypes: Vec::new(),
            members: Vec::new(),
        });
        self.by_name.insert(name, id);

        for union in supertypes {
            self.link(id, union);
        }
        id
    }

    fn link(&mut self, member: TypeId, union: TypeId) {
        if self.types[member.index()].supertypes.contains(&union) {
            return;
        }
        self.types[member.index()].supertypes.push(union);
        self.types[union.index()].members.push(member);
        self.graph.add_edge(member.node(), union.node(), EdgeKind::Supertype);
    }

    fn resolve_supertypes(&self, name: &str, supertypes: &[&str]) -> Result<Vec<TypeId>> {
        supertypes
            .iter()
            .map(|supertype| {
                let declared = self.require(supertype, &format!("supertypes of '{}'", name))?;
                let resolved = self.resolve(declared);
                if self.get(resolved).kind != TypeKind::Union {
                    return Err(SchemaError::InvalidSupertype {
                        name: name.to_string(),
                        supertype: names::bare_type_name(supertype).to_string(),
                    });
                }
                Ok(resolved)
            })
            .collect()
    }

    fn ensure_fresh(&self, name: &str) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(SchemaError::DuplicateName {
                kind: NameKind::Type,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
