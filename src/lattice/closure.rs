//! Lattice Closure
//!
//! Runs once, when the schema is closed: rejects cyclic supertype graphs
//! (found as strongly connected components of the lattice graph) and
//! precomputes, for every type, the set of unions it transitively belongs to.
//! Membership queries after close are set lookups; nothing is recomputed.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::kosaraju_scc;

use super::{TypeId, TypeKind, TypeLattice};
use crate::error::{Result, SchemaError};

/// Transitive union membership of a closed lattice
#[derive(Debug, Clone, Default)]
pub struct Closure {
    /// Per type (by index): every union reachable over lattice edges
    unions: Vec<BTreeSet<TypeId>>,
    /// Per union: every concrete type whose closure contains it
    extents: HashMap<TypeId, BTreeSet<TypeId>>,
}

impl Closure {
    /// Validate acyclicity and compute the closure
    pub fn compute(lattice: &TypeLattice) -> Result<Self> {
        if let Some(cycle) = find_cycle(lattice) {
            return Err(SchemaError::CyclicUnion {
                cycle: cycle.iter().map(|&id| format!("@{}", lattice.name(id))).collect(),
            });
        }

        let mut memo: Vec<Option<BTreeSet<TypeId>>> = vec![None; lattice.len()];
        for ty in lattice.types() {
            unions_of(lattice, ty.id, &mut memo);
        }
        let unions: Vec<BTreeSet<TypeId>> = memo.into_iter().map(Option::unwrap_or_default).collect();

        let mut extents: HashMap<TypeId, BTreeSet<TypeId>> = HashMap::new();
        for ty in lattice.types().iter().filter(|t| t.kind.is_concrete()) {
            for &union in &unions[ty.id.index()] {
                extents.entry(union).or_default().insert(ty.id);
            }
        }

        Ok(Self { unions, extents })
    }

    /// Every union `ty` belongs to, directly or transitively. `None` for an
    /// id this lattice never handed out.
    pub fn unions_of(&self, ty: TypeId) -> Option<&BTreeSet<TypeId>> {
        self.unions.get(ty.index())
    }

    /// Whether `ty` is a (transitive) member of `union`
    pub fn contains(&self, ty: TypeId, union: TypeId) -> bool {
        self.unions_of(ty).is_some_and(|set| set.contains(&union))
    }

    /// Concrete types belonging to `union`
    pub fn extent(&self, union: TypeId) -> Option<&BTreeSet<TypeId>> {
        self.extents.get(&union)
    }
}

fn unions_of(lattice: &TypeLattice, id: TypeId, memo: &mut Vec<Option<BTreeSet<TypeId>>>) -> BTreeSet<TypeId> {
    if let Some(done) = &memo[id.index()] {
        return done.clone();
    }

    let acc = match lattice.get(id).kind {
        TypeKind::Alias { target } => unions_of(lattice, target, memo),
        _ => {
            let mut acc = BTreeSet::new();
            for next in lattice.successors(id) {
                if lattice.get(next).kind == TypeKind::Union {
                    acc.insert(next);
                }
                acc.extend(unions_of(lattice, next, memo));
            }
            acc
        }
    };

    memo[id.index()] = Some(acc.clone());
    acc
}

/// Find a cycle over lattice edges.
///
/// Cyclic strongly connected components are those with more than one type or
/// a type with an edge to itself. The component holding the lowest type id is
/// reported, as a path that starts and ends on that type, so the failure is the
/// same on every run.
pub fn find_cycle(lattice: &TypeLattice) -> Option<Vec<TypeId>> {
    let graph = &lattice.graph;
    let mut cyclic: Vec<Vec<TypeId>> = kosaraju_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut ids: Vec<TypeId> = scc.into_iter().map(TypeId::from_node).collect();
            ids.sort();
            ids
        })
        .collect();
    cyclic.sort();
    cyclic.into_iter().next().map(|component| cycle_within(lattice, &component))
}

/// Shortest path from the component's lowest type back to itself, staying
/// inside the component. `component` is sorted and strongly connected.
fn cycle_within(lattice: &TypeLattice, component: &[TypeId]) -> Vec<TypeId> {
    let start = component[0];
    let inside: HashSet<TypeId> = component.iter().copied().collect();
    let mut came_from: HashMap<TypeId, TypeId> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in lattice.successors(current) {
            if !inside.contains(&next) {
                continue;
            }
            if next == start {
                let mut path = Vec::new();
                let mut at = current;
                while let Some(&prev) = came_from.get(&at) {
                    path.push(at);
                    at = prev;
                }
                path.push(start);
                path.reverse();
                path.push(start);
                return path;
            }
            if let Entry::Vacant(slot) = came_from.entry(next) {
                slot.insert(current);
                queue.push_back(next);
            }
        }
    }
    // Unreachable for a strongly connected component
    let mut path = component.to_vec();
    path.push(start);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_through_intermediate_unions() {
        let mut lattice = TypeLattice::new();
        let operator = lattice.declare_union("operatorexpr", &[]).unwrap();
        let binary = lattice.declare_union("binaryexpr", &["operatorexpr"]).unwrap();
        let arith = lattice.declare_union("arithmeticexpr", &["operatorexpr"]).unwrap();
        let arith_binary = lattice
            .declare_union("arithmeticbinaryexpr", &["binaryexpr", "arithmeticexpr"])
            .unwrap();
        lattice.declare_primary_key("expr", &[]).unwrap();
        let kind = lattice.declare_case("expr", "kind").unwrap();
        let add = lattice.new_branch(kind, "addexpr", &["arithmeticbinaryexpr"]).unwrap();
        let ident = lattice.new_branch(kind, "ident", &[]).unwrap();

        let closure = Closure::compute(&lattice).unwrap();
        let expected: BTreeSet<TypeId> = [operator, binary, arith, arith_binary].into_iter().collect();
        assert_eq!(closure.unions_of(add.ty), Some(&expected));
        assert!(closure.unions_of(ident.ty).unwrap().is_empty());
        assert_eq!(closure.unions_of(TypeId::from_index(99)), None);
        assert!(!closure.contains(TypeId::from_index(99), operator));
        assert!(closure.extent(operator).unwrap().contains(&add.ty));
    }

    #[test]
    fn test_branch_inherits_case_base_membership() {
        let mut lattice = TypeLattice::new();
        let parent = lattice.declare_union("exprparent", &[]).unwrap();
        lattice.declare_primary_key("expr", &["exprparent"]).unwrap();
        let kind = lattice.declare_case("expr", "kind").unwrap();
        let ident = lattice.new_branch(kind, "ident", &[]).unwrap();

        let closure = Closure::compute(&lattice).unwrap();
        assert!(closure.contains(ident.ty, parent));
    }

    #[test]
    fn test_two_node_cycle_is_reported_with_path() {
        let mut lattice = TypeLattice::new();
        lattice.declare_union("a", &[]).unwrap();
        lattice.declare_union("b", &["a"]).unwrap();
        lattice.add_supertypes("a", &["b"]).unwrap();

        match Closure::compute(&lattice) {
            Err(SchemaError::CyclicUnion { cycle }) => {
                assert_eq!(cycle, vec!["@a", "@b", "@a"]);
            }
            other => panic!("Expected CyclicUnion, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut lattice = TypeLattice::new();
        lattice.declare_union("loopy", &[]).unwrap();
        lattice.add_supertypes("loopy", &["loopy"]).unwrap();
        let loopy = lattice.lookup("loopy").unwrap();
        assert_eq!(find_cycle(&lattice), Some(vec![loopy, loopy]));
    }

    #[test]
    fn test_cycle_path_stays_inside_its_component() {
        let mut lattice = TypeLattice::new();
        lattice.declare_union("root", &[]).unwrap();
        lattice.declare_union("x", &["root"]).unwrap();
        lattice.declare_union("y", &["x"]).unwrap();
        lattice.declare_union("z", &["y", "root"]).unwrap();
        lattice.declare_primary_key("leaf", &["z"]).unwrap();
        lattice.add_supertypes("x", &["z"]).unwrap();

        match Closure::compute(&lattice) {
            Err(SchemaError::CyclicUnion { cycle }) => {
                assert_eq!(cycle, vec!["@x", "@z", "@y", "@x"]);
            }
            other => panic!("Expected CyclicUnion, got {:?}", other),
        }
    }

    #[test]
    fn test_acyclic_diamond_has_no_cycle() {
        let mut lattice = TypeLattice::new();
        lattice.declare_union("top", &[]).unwrap();
        lattice.declare_union("left", &["top"]).unwrap();
        lattice.declare_union("right", &["top"]).unwrap();
        lattice.declare_primary_key("bottom", &["left", "right"]).unwrap();
        assert_eq!(find_cycle(&lattice), None);
    }

    #[test]
    fn test_alias_shares_target_closure() {
        let mut lattice = TypeLattice::new();
        let locatable = lattice.declare_union("locatable", &[]).unwrap();
        lattice.declare_union("node", &["locatable"]).unwrap();
        let sourceline = lattice.declare_alias("sourceline", "node").unwrap();

        let closure = Closure::compute(&lattice).unwrap();
        assert!(closure.contains(sourceline, locatable));
    }
}
