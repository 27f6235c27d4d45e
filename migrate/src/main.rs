//! Disco Migrate CLI - Fold relational row dumps into document collections
//!
//! # Main Commands
//!
//! ```bash
//! disco-migrate export                      # rows/*.{json,csv} -> data/*.json
//! disco-migrate export --only usuarios      # Export a single collection
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! disco-migrate fold estoques rows.json     # Assemble one entity to stdout
//! disco-migrate parse dump.csv              # Just parse CSV to JSON rows
//! disco-migrate validate discos data.json   # Validate an exported collection
//! disco-migrate tag-date "2024-01-10 08:00" # Show the tagged form of a date
//! ```

use clap::{Parser, Subcommand};
use disco_migrate::{
    fold_entity, load_rows_file, parse_csv_file_auto, run_export, tag_date, validate_values,
    DirectorySource, Entity, ExportOptions, JsonFileExporter, MigrateConfig,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "disco-migrate")]
#[command(about = "Fold relational row dumps into document-store collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: row dumps -> documents -> collection files
    Export {
        /// Directory holding the row dumps (default: $MIGRATE_INPUT_DIR or rows)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory receiving the collections (default: $MIGRATE_OUTPUT_DIR or data)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only export these collections (repeatable)
        #[arg(long)]
        only: Vec<Entity>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,

        /// Skip schema validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Assemble one entity from a rows file and print its documents
    Fold {
        /// discos, usuarios or estoques
        entity: Entity,

        /// Rows file (JSON array or CSV)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV dump and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an exported collection against its schema
    Validate {
        /// discos, usuarios or estoques
        entity: Entity,

        /// Input JSON file (array of documents)
        input: PathBuf,
    },

    /// Print the tagged form of a date value
    TagDate {
        /// Date or timestamp, as exported by the database
        value: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export {
            input,
            output,
            only,
            compact,
            no_validate,
        } => cmd_export(input, output, only, compact, no_validate).await,

        Commands::Fold {
            entity,
            input,
            output,
        } => cmd_fold(entity, &input, output.as_deref()),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Validate { entity, input } => cmd_validate(entity, &input),

        Commands::TagDate { value } => cmd_tag_date(&value),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_export(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    only: Vec<Entity>,
    compact: bool,
    no_validate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = MigrateConfig::from_env()?;
    if let Some(dir) = input {
        config.input_dir = dir;
    }
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    if compact {
        config.pretty = false;
    }
    if no_validate {
        config.validate = false;
    }

    let mut options = ExportOptions {
        validate: config.validate,
        ..Default::default()
    };
    if !only.is_empty() {
        options.entities = Entity::ALL.into_iter().filter(|e| only.contains(e)).collect();
    }

    eprintln!("📄 Reading rows from: {}", config.input_dir.display());
    eprintln!("   Output: {}", config.output_dir.display());
    eprintln!(
        "   Collections: {}",
        options
            .entities
            .iter()
            .map(|e| e.collection())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !options.validate {
        eprintln!("   ⚠️  Schema validation disabled");
    }

    let source = DirectorySource::new(&config.input_dir);
    let sink = JsonFileExporter::new(&config.output_dir).pretty(config.pretty);
    let report = run_export(&source, &sink, &options).await?;

    eprintln!();
    for entry in &report.exported {
        eprintln!(
            "   ✅ {}: {} rows -> {} documents ({})",
            entry.entity,
            entry.rows,
            entry.documents,
            entry.path.display()
        );
    }

    eprintln!("\n✨ Done! {} documents exported", report.total_documents());
    Ok(())
}

fn cmd_fold(entity: Entity, input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Folding {}: {}", entity, input.display());

    let rows = load_rows_file(input)?;
    eprintln!("   {} rows", rows.len());

    let documents = fold_entity(entity, &rows)?;
    eprintln!("   {} documents", documents.len());

    let json = serde_json::to_string_pretty(&documents)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}' (auto-detected)", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let rows: Vec<_> = result.rows.iter().map(|r| r.columns()).collect();
    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_validate(entity: Entity, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating {}: {}", entity, input.display());

    let content = fs::read_to_string(input)?;
    let documents: Vec<Value> = serde_json::from_str(&content)?;

    match validate_values(entity, &documents) {
        Ok(()) => {
            eprintln!("\n📊 Results: {} valid, 0 invalid", documents.len());
            Ok(())
        }
        Err(failures) => {
            for (i, errors) in failures.iter().take(5) {
                eprintln!("\n❌ Document {} invalid:", i);
                for err in errors.iter().take(3) {
                    eprintln!("   - {}", err);
                }
            }
            eprintln!(
                "\n📊 Results: {} valid, {} invalid",
                documents.len() - failures.len(),
                failures.len()
            );
            std::process::exit(1);
        }
    }
}

fn cmd_tag_date(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let tagged = tag_date("value", &Value::String(value.to_string()))?;
    println!("{}", serde_json::to_string(&tagged)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
