//! GraphViz export of the type lattice

use petgraph::visit::EdgeRef;

use super::{EdgeKind, TypeKind, TypeLattice};

/// Export the lattice to GraphViz DOT format.
///
/// Nodes are emitted in declaration order and edges in insertion order, so the
/// output is stable for an unchanged lattice.
pub fn to_dot(lattice: &TypeLattice) -> String {
    let mut output = String::new();

    output.push_str("digraph TypeLattice {\n");
    output.push_str("  rankdir=BT;\n");
    output.push_str("  bgcolor=\"#1e1e1e\";\n");
    output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n");
    output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\", color=\"#808080\"];\n");
    output.push('\n');

    for ty in lattice.types() {
        let color = match ty.kind {
            TypeKind::Union => "#9C27B0",
            TypeKind::PrimaryKey if lattice.case_of(ty.id).is_some() => "#FF9800",
            TypeKind::PrimaryKey => "#00BCD4",
            TypeKind::Branch { .. } => "#4CAF50",
            TypeKind::Alias { .. } => "#607D8B",
        };
        let label = match ty.kind {
            TypeKind::Branch { tag, .. } => format!("@{} [{}]", ty.name, tag),
            _ => format!("@{}", ty.name),
        };
        output.push_str(&format!("  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n", ty.name, label, color));
    }

    output.push('\n');

    for edge in lattice.graph.edge_references() {
        let source = lattice.graph[edge.source()];
        let target = lattice.graph[edge.target()];
        let style = match edge.weight() {
            EdgeKind::Supertype => "solid",
            EdgeKind::CaseBase => "dashed",
        };
        output.push_str(&format!(
            "  \"{}\" -> \"{}\" [style={}];\n",
            lattice.name(source),
            lattice.name(target),
            style
        ));
    }

    for ty in lattice.types() {
        if let TypeKind::Alias { target } = ty.kind {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style=dotted, label=\"alias\"];\n",
                ty.name,
                lattice.name(target)
            ));
        }
    }

    output.push_str("}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_lists_nodes_and_edges() {
        let mut lattice = TypeLattice::new();
        lattice.declare_union("shape", &[]).unwrap();
        lattice.declare_primary_key("circle", &["shape"]).unwrap();
        lattice.declare_alias("round", "circle").unwrap();

        let dot = to_dot(&lattice);
        assert!(dot.starts_with("digraph TypeLattice {"));
        assert!(dot.contains("\"circle\" -> \"shape\" [style=solid];"));
        assert!(dot.contains("\"round\" -> \"circle\" [style=dotted, label=\"alias\"];"));
        assert_eq!(dot, to_dot(&lattice));
    }
}
