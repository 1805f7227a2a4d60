//! Schema Manifest
//!
//! The JSON record kept next to a released schema text: its version, the
//! checksum of the text, every case's branches in tag order, every union's
//! direct members, alias targets, a checksum per raw fragment and every
//! table's rendered columns. Later builds are checked against it (see
//! [`compatibility`](crate::compatibility)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::checksum::Checksum;
use crate::error::Result;
use crate::lattice::TypeKind;
use crate::schema::Schema;
use crate::version::SchemaVersion;

/// A table as recorded in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub name: String,
    /// Rendered column lines, in column order
    pub columns: Vec<String>,
}

/// Released schema record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub version: SchemaVersion,
    pub generated_at: DateTime<Utc>,
    /// Checksum of the emitted schema text
    pub checksum: Checksum,
    /// Case name (`expr.kind`) to branch names, indexed by tag
    pub cases: BTreeMap<String, Vec<String>>,
    /// Union name to its direct members
    #[serde(default)]
    pub unions: BTreeMap<String, Vec<String>>,
    /// Alias name to the type it names
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Checksum of each raw fragment, in declaration order
    #[serde(default)]
    pub fragments: Vec<Checksum>,
    /// Tables in declaration order
    pub tables: Vec<TableManifest>,
}

impl SchemaManifest {
    /// Record a closed schema under `version`
    pub fn from_schema(schema: &Schema, version: SchemaVersion) -> Self {
        let text = schema.emit();
        Self::from_parts(schema, &text, version)
    }

    /// Like [`from_schema`](Self::from_schema) when the text was already emitted
    pub fn from_parts(schema: &Schema, text: &str, version: SchemaVersion) -> Self {
        let cases = schema
            .cases()
            .iter()
            .map(|case| {
                let branches = case
                    .branches
                    .iter()
                    .map(|&b| schema.type_name(b).to_string())
                    .collect();
                (schema.lattice().case_name(case.id), branches)
            })
            .collect();

        let mut unions = BTreeMap::new();
        let mut aliases = BTreeMap::new();
        for ty in schema.types() {
            match ty.kind {
                TypeKind::Union => {
                    let members = ty.members.iter().map(|&m| schema.type_name(m).to_string()).collect();
                    unions.insert(ty.name.clone(), members);
                }
                TypeKind::Alias { target } => {
                    aliases.insert(ty.name.clone(), schema.type_name(target).to_string());
                }
                _ => {}
            }
        }

        let fragments = (0..)
            .map_while(|index| schema.fragment(index))
            .map(Checksum::from_text)
            .collect();

        let tables = schema
            .tables()
            .iter()
            .map(|table| TableManifest {
                name: table.name.clone(),
                columns: table
                    .columns
                    .iter()
                    .map(|c| crate::emit::column_line(schema, c))
                    .collect(),
            })
            .collect();

        Self {
            version,
            generated_at: Utc::now(),
            checksum: Checksum::from_text(text),
            cases,
            unions,
            aliases,
            fragments,
            tables,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableManifest> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), version = %self.version, "wrote manifest");
        Ok(())
    }
}
