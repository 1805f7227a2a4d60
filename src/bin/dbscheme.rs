//! dbscheme CLI
//!
//! Emits the program model schema, records release manifests and checks new
//! builds against them.
//!
//! Usage:
//!   dbscheme emit --output go.dbscheme --manifest go.dbscheme.json --version 1.2.0
//!   dbscheme check --manifest go.dbscheme.json --schema go.dbscheme
//!   dbscheme graph --output lattice.dot
//!   dbscheme tags expr.kind

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dbscheme::{
    catalog, Checksum, CompatibilityChecker, DbschemeConfig, Schema, SchemaManifest, SchemaVersion,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbscheme")]
#[command(about = "Compile the program model into a relational schema")]
struct Cli {
    /// Configuration file (defaults to dbscheme.toml and friends)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the schema text, and optionally its manifest
    Emit {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the release manifest
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Version recorded in the manifest
        #[arg(short = 'v', long)]
        version: Option<String>,
    },

    /// Compare the current schema with a released manifest
    Check {
        /// Manifest of the released schema
        #[arg(short, long)]
        manifest: PathBuf,

        /// Released schema text; its checksum is verified and it is diffed
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Fail on any change, not just breaking ones
        #[arg(long)]
        strict: bool,
    },

    /// Export the type lattice as GraphViz DOT
    Graph {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print branch tags
    Tags {
        /// Case to print, e.g. `expr.kind` or `expr` (default: all)
        case: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = DbschemeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    debug!(?config, "loaded configuration");

    let schema = catalog::schema(config.schema_options()).context("building the program model schema")?;
    for item in schema.diagnostics() {
        eprintln!("⚠️  {}", item);
    }

    match cli.command {
        Commands::Emit {
            output,
            manifest,
            version,
        } => emit(&schema, &config, output, manifest, version),
        Commands::Check {
            manifest,
            schema: text,
            strict,
        } => check(&schema, &config, manifest, text, strict),
        Commands::Graph { output } => {
            write_output(output.as_ref(), &schema.to_dot())?;
            Ok(0)
        }
        Commands::Tags { case } => tags(&schema, case.as_deref()),
    }
}

fn emit(
    schema: &Schema,
    config: &DbschemeConfig,
    output: Option<PathBuf>,
    manifest: Option<PathBuf>,
    version: Option<String>,
) -> Result<i32> {
    let text = schema.emit();
    let output = output.or_else(|| config.emit.output.clone());
    write_output(output.as_ref(), &text)?;

    if let Some(path) = manifest.or_else(|| config.emit.manifest.clone()) {
        let version = version.unwrap_or_else(|| config.release.version.clone());
        let version = SchemaVersion::parse(&version).with_context(|| format!("invalid version '{}'", version))?;
        let manifest = SchemaManifest::from_parts(schema, &text, version);
        manifest.save(&path)?;
        eprintln!("📦 Manifest {} written to {}", manifest.version, path.display());
        eprintln!("🔒 Checksum: {}", manifest.checksum);
    }
    Ok(0)
}

fn check(
    schema: &Schema,
    config: &DbschemeConfig,
    manifest: PathBuf,
    text: Option<PathBuf>,
    strict: bool,
) -> Result<i32> {
    let released = SchemaManifest::load(&manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let emitted = schema.emit();
    let current = SchemaManifest::from_parts(schema, &emitted, released.version.clone());

    let mut checker = CompatibilityChecker::new();
    if strict || config.compatibility.strict {
        checker = checker.strict();
    }

    println!("📊 Compatibility check against {}", released.version);
    println!();

    if let Some(path) = text {
        let stored = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        released.checksum.ensure(&stored)?;
        println!("✅ Stored schema matches manifest checksum");

        let lines = checker.diff_text(&stored, &emitted);
        if !lines.is_empty() {
            println!("📝 {} emitted lines differ:", lines.len());
            for change in &lines {
                match (&change.old_value, &change.new_value) {
                    (Some(old), _) => println!("   - {}", old),
                    (_, Some(new)) => println!("   + {}", new),
                    _ => {}
                }
            }
            println!();
        }
    } else if Checksum::from_text(&emitted) == released.checksum {
        println!("✅ Emitted schema is identical to the release");
    }

    let result = checker.check(&released, &current);
    for change in &result.changes {
        let marker = if change.is_breaking { "❌" } else { "✅" };
        println!("{} {}: {}", marker, change.path, change.description);
    }
    println!();
    println!("{}", result.summary);
    println!("Suggested version bump: {}", result.suggested_bump);

    if result.is_breaking && config.compatibility.fail_on_breaking {
        eprintln!("\n❌ BREAKING CHANGES DETECTED");
        Ok(2)
    } else if !result.is_compatible {
        eprintln!("\n⚠️  Changes detected (strict mode) - Review required");
        Ok(1)
    } else {
        Ok(0)
    }
}

fn tags(schema: &Schema, case: Option<&str>) -> Result<i32> {
    let cases = match case {
        Some(name) => vec![schema.find_case(name).ok_or_else(|| anyhow!("unknown case '{}'", name))?],
        None => schema.cases().iter().map(|c| c.id).collect(),
    };

    for case in cases.into_iter().filter_map(|id| schema.case(id)) {
        println!("@{}", schema.lattice().case_name(case.id));
        for (tag, &branch) in case.branches.iter().enumerate() {
            println!("  {:>3}  @{}", tag, schema.type_name(branch));
        }
        println!();
    }
    Ok(0)
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("✅ Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
