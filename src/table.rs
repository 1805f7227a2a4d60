//! Tables and Columns
//!
//! Callers describe a table with [`TableDef`] and [`Column`] builders; the
//! schema builder resolves the description against the lattice into a
//! [`Table`], rejecting anything the emitted schema could not express.

use std::collections::HashSet;

use crate::error::{NameKind, Result, SchemaError};
use crate::lattice::{TypeId, TypeLattice};
use crate::names;

// =============================================================================
// Declarations
// =============================================================================

/// Declared column type, before resolution against the lattice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Reference to an entity of the named type
    Entity(String),
    Int,
    String,
    Date,
    Float,
}

/// Column declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub key: bool,
    pub unique: bool,
}

impl Column {
    fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            key: false,
            unique: false,
        }
    }

    /// Column holding ids drawn from the closure of type `ty`
    pub fn entity(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Entity(ty.into()))
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Date)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    /// Mark as the table's identity column
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Mark as unique without making it the row identity
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Table declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<Column>,
    pub key_sets: Vec<Vec<String>>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            key_sets: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Add a composite uniqueness constraint over `columns`
    pub fn key_set<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_sets.push(columns.into_iter().map(Into::into).collect());
        self
    }
}

// =============================================================================
// Resolved tables
// =============================================================================

/// Handle for a declared table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) u32);

impl TableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Resolved column storage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Entity reference; the type id is as declared (it may be an alias)
    Entity(TypeId),
    Int,
    String,
    Date,
    Float,
}

impl ColumnKind {
    pub fn is_entity(&self) -> bool {
        matches!(self, ColumnKind::Entity(_))
    }
}

/// Column constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    None,
    Key,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub kind: ColumnKind,
    pub modifier: Modifier,
}

/// A validated table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<TableColumn>,
    /// Column indices of each key set, in declared order
    pub key_sets: Vec<Vec<usize>>,
}

impl Table {
    /// Resolve a declaration against the lattice.
    ///
    /// Checks, in order: names, column uniqueness, entity types, modifiers,
    /// key sets.
    pub(crate) fn resolve(id: TableId, def: TableDef, lattice: &TypeLattice) -> Result<Self> {
        let name = names::table_name(&def.name)?;
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(def.columns.len());
        let mut key_position = None;

        for (position, column) in def.columns.into_iter().enumerate() {
            let column_name = names::column_name(&column.name)?;
            if !seen.insert(column_name.clone()) {
                return Err(SchemaError::DuplicateName {
                    kind: NameKind::Column,
                    name: format!("{}.{}", name, column_name),
                });
            }

            let kind = match &column.ty {
                ColumnType::Entity(ty) => {
                    ColumnKind::Entity(lattice.require(ty, &format!("column {}.{}", name, column_name))?)
                }
                ColumnType::Int => ColumnKind::Int,
                ColumnType::String => ColumnKind::String,
                ColumnType::Date => ColumnKind::Date,
                ColumnType::Float => ColumnKind::Float,
            };

            let modifier = match (column.key, column.unique) {
                (true, true) => {
                    return Err(conflict(&name, format!("column '{}' is marked both key and unique", column_name)));
                }
                (true, false) => {
                    if let Some(first) = key_position {
                        let first: &TableColumn = &columns[first];
                        return Err(conflict(
                            &name,
                            format!("columns '{}' and '{}' are both marked key", first.name, column_name),
                        ));
                    }
                    if !kind.is_entity() {
                        return Err(conflict(&name, format!("key column '{}' must reference an entity type", column_name)));
                    }
                    if position != 0 {
                        return Err(conflict(&name, format!("key column '{}' must be the first column", column_name)));
                    }
                    key_position = Some(position);
                    Modifier::Key
                }
                (false, true) => Modifier::Unique,
                (false, false) => Modifier::None,
            };

            columns.push(TableColumn {
                name: column_name,
                kind,
                modifier,
            });
        }

        let mut key_sets = Vec::with_capacity(def.key_sets.len());
        for key_set in def.key_sets {
            if key_set.is_empty() {
                return Err(SchemaError::InvalidKeySet {
                    table: name,
                    reason: "key set is empty".to_string(),
                });
            }
            let mut indices = Vec::with_capacity(key_set.len());
            for column in &key_set {
                match columns.iter().position(|c| &c.name == column) {
                    Some(index) => indices.push(index),
                    None => {
                        return Err(SchemaError::InvalidKeySet {
                            table: name,
                            reason: format!("no column named '{}'", column),
                        })
                    }
                }
            }
            key_sets.push(indices);
        }

        Ok(Self {
            id,
            name,
            columns,
            key_sets,
        })
    }

    /// The identity column, if the table has one
    pub fn key_column(&self) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.modifier == Modifier::Key)
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names of each key set
    pub fn key_set_names(&self) -> Vec<Vec<&str>> {
        self.key_sets
            .iter()
            .map(|set| set.iter().map(|&i| self.columns[i].name.as_str()).collect())
            .collect()
    }
}

fn conflict(table: &str, reason: String) -> SchemaError {
    SchemaError::ConflictingModifiers {
        table: table.to_string(),
        reason,
    }
}
