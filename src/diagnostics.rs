//! Diagnostics
//!
//! Non-fatal findings collected when a schema is closed. Anything that makes a
//! schema unusable is a [`SchemaError`](crate::SchemaError) instead; these only
//! point at declarations that are legal but probably unintended.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::lattice::{Closure, TypeId, TypeKind, TypeLattice};
use crate::table::{ColumnKind, Table, TableId};

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Union with no members; it is left out of the emitted schema
    EmptyUnion,
    /// Primary-key type that no table stores
    UnstoredPrimaryKey,
    /// Case whose discriminator is not an int column of the base type's table
    MissingDiscriminator,
    /// Case type without branches; it is left out of the emitted schema
    EmptyCase,
    /// Alias naming another alias
    AliasOfAlias,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyUnion => "W001",
            Self::UnstoredPrimaryKey => "W002",
            Self::MissingDiscriminator => "W003",
            Self::EmptyCase => "W004",
            Self::AliasOfAlias => "I001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::EmptyUnion
            | Self::UnstoredPrimaryKey
            | Self::MissingDiscriminator
            | Self::EmptyCase => Severity::Warning,

            Self::AliasOfAlias => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Declaration the finding is about (`@type`, `@base.column` or table name)
    pub subject: String,
    pub code: DiagnosticCode,
    pub message: String,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.code, self.severity(), self.message, self.subject)
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.items.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        if !self.is_empty() {
            writeln!(f, "\n{} warning(s)", self.warning_count())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Run every check over a closed lattice and its tables
pub(crate) fn analyze(
    lattice: &TypeLattice,
    closure: &Closure,
    tables: &[Table],
    stores: &HashMap<TypeId, TableId>,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    // Types whose ids land in some key column, directly or through a union key
    let mut stored: HashSet<TypeId> = stores.keys().copied().collect();
    for table in tables {
        if let Some(ColumnKind::Entity(ty)) = table.key_column().map(|c| c.kind) {
            let ty = lattice.resolve(ty);
            if let Some(extent) = closure.extent(ty) {
                stored.extend(extent.iter().copied());
            }
        }
    }

    for ty in lattice.types() {
        match ty.kind {
            TypeKind::Union if ty.members.is_empty() => {
                diagnostics.push(DiagnosticItem::new(
                    format!("@{}", ty.name),
                    DiagnosticCode::EmptyUnion,
                    "union has no members and is not emitted",
                ));
            }
            TypeKind::PrimaryKey if !stored.contains(&ty.id) => {
                diagnostics.push(DiagnosticItem::new(
                    format!("@{}", ty.name),
                    DiagnosticCode::UnstoredPrimaryKey,
                    "no table is keyed by this type",
                ));
            }
            TypeKind::Alias { target } => {
                if let TypeKind::Alias { .. } = lattice.get(target).kind {
                    diagnostics.push(DiagnosticItem::new(
                        format!("@{}", ty.name),
                        DiagnosticCode::AliasOfAlias,
                        format!("alias of alias @{}", lattice.name(target)),
                    ));
                }
            }
            _ => {}
        }
    }

    for case in lattice.cases() {
        let case_name = format!("@{}", lattice.case_name(case.id));
        if case.branches.is_empty() {
            diagnostics.push(DiagnosticItem::new(
                case_name.clone(),
                DiagnosticCode::EmptyCase,
                "case has no branches and is not emitted",
            ));
        }
        if let Some(&store) = stores.get(&case.base) {
            let table = &tables[store.index()];
            let has_int_column = table
                .column(&case.column)
                .map(|c| c.kind == ColumnKind::Int)
                .unwrap_or(false);
            if !has_int_column {
                diagnostics.push(DiagnosticItem::new(
                    case_name,
                    DiagnosticCode::MissingDiscriminator,
                    format!("table '{}' has no int column '{}'", table.name, case.column),
                ));
            }
        }
    }

    diagnostics
}
