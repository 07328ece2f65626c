//! Rekap CLI - Turn customs import exports into monthly recap sheets
//!
//! # Main Commands
//!
//! ```bash
//! rekap report impor.csv -o rekap.json      # Build the recap report
//! rekap report impor.csv --csv-dir out/     # One CSV file per sheet
//! rekap profile list                        # Manage mapping profiles
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! rekap parse impor.csv            # Just parse the input to JSON rows
//! rekap normalize impor.csv        # Show canonical records
//! rekap fallbacks                  # Show the fallback column table
//! ```

use clap::{Parser, Subcommand};
use rekap::{
    normalize_rows, parse_file_auto, report_file, write_csv_sheets, write_json, DateFormat,
    Field, FieldMapping, IncotermMode, NumberFormat, PartitionMode, ProfileRegistry,
    ReportBundle, ReportOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "rekap")]
#[command(about = "Build monthly recap sheets from customs import exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: input → records → rollup → report sheets
    Report {
        /// Input CSV or JSON file
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Fixed incoterm code for every row (default: FOB)
        #[arg(long, conflicts_with = "incoterm_from_column")]
        incoterm: Option<String>,

        /// Take the incoterm from the INCOTERMS column
        #[arg(long)]
        incoterm_from_column: bool,

        /// Sheet dimension: importer or supplier
        #[arg(long, default_value = "importer")]
        by: PartitionMode,

        /// Report period shown as the title (e.g. 2024)
        #[arg(long)]
        period: Option<String>,

        /// Sheet name for rows without an importer
        #[arg(long)]
        blank_sheet: Option<String>,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write one CSV file per sheet into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Parse an input file and output its rows as JSON
    Parse {
        /// Input CSV or JSON file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize rows and output canonical records
    Normalize {
        /// Input CSV or JSON file
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the fallback column labels per field
    Fallbacks {
        /// Mapping JSON file whose overrides should be shown
        #[arg(short, long)]
        mapping: Option<PathBuf>,
    },

    /// Manage field mapping profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

/// How to read the input: mapping and locale hints.
#[derive(clap::Args)]
struct SourceArgs {
    /// Field mapping JSON file
    #[arg(short, long, conflicts_with = "profile")]
    mapping: Option<PathBuf>,

    /// Stored mapping profile ID
    #[arg(short, long)]
    profile: Option<String>,

    /// Date format: auto, DD/MM/YYYY, MM/DD/YYYY or DD-MONTH-YYYY
    #[arg(long, env = "REKAP_DATE_FORMAT", default_value = "auto")]
    date_format: DateFormat,

    /// Number format: auto, american or european
    #[arg(long, env = "REKAP_NUMBER_FORMAT", default_value = "auto")]
    number_format: NumberFormat,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List all stored profiles
    List,

    /// Import a mapping JSON file as profile
    Import {
        /// Mapping JSON file to import
        file: PathBuf,
        /// Name for the profile
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show details of a profile
    Show {
        /// Profile ID
        id: String,
    },

    /// Delete a profile
    Delete {
        /// Profile ID
        id: String,
    },

    /// Suggest stored profiles matching an input file's columns
    Suggest {
        /// Input CSV or JSON file
        input: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Report {
            input,
            source,
            incoterm,
            incoterm_from_column,
            by,
            period,
            blank_sheet,
            output,
            csv_dir,
        } => {
            let incoterm = match (incoterm_from_column, incoterm) {
                (true, _) => IncotermMode::FromColumn,
                (false, Some(code)) => IncotermMode::Manual(code),
                (false, None) => IncotermMode::default(),
            };
            let mut options = ReportOptions {
                date_format: source.date_format,
                number_format: source.number_format,
                incoterm,
                partition_by: by,
                period,
                ..ReportOptions::default()
            };
            if let Some(name) = blank_sheet {
                options.blank_partition_name = name;
            }
            cmd_report(&input, &source, options, output.as_deref(), csv_dir.as_deref())
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Normalize {
            input,
            source,
            output,
        } => cmd_normalize(&input, &source, output.as_deref()),

        Commands::Fallbacks { mapping } => cmd_fallbacks(mapping.as_deref()),

        Commands::Profile { action } => cmd_profile(action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_report(
    input: &Path,
    source: &SourceArgs,
    options: ReportOptions,
    output: Option<&Path>,
    csv_dir: Option<&Path>,
) -> CliResult {
    eprintln!("📄 Processing: {}", input.display());

    let mapping = load_mapping(source)?;
    let result = report_file(input, &mapping, &options)?;

    if let Some(info) = &result.input {
        eprintln!("   Rows: {}", info.row_count);
        eprintln!("   Columns: {}", info.headers.join(", "));
    }
    eprintln!("\n📊 {}", result.diagnostics.summary());

    let bundle = ReportBundle::new(result.sheets, result.diagnostics, options.period);
    for sheet in &bundle.sheets {
        eprintln!(
            "   📄 {} ({} blocks, {} rows)",
            sheet.sheet_name,
            sheet.grid.groups.len(),
            sheet.grid.rows.len()
        );
    }

    if let Some(dir) = csv_dir {
        let files = write_csv_sheets(&bundle, dir)?;
        eprintln!("   💾 {} CSV files in: {}", files.len(), dir.display());
    }

    match output {
        Some(path) => write_json(&bundle, path)?,
        None if csv_dir.is_none() => println!("{}", bundle.to_json()?),
        None => {}
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing: {}", input.display());

    let result = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let rows: Vec<_> = result.rows.iter().map(|row| row.to_json()).collect();
    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)
}

fn cmd_normalize(input: &Path, source: &SourceArgs, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Normalizing: {}", input.display());

    let mapping = load_mapping(source)?;
    let parsed = parse_file_auto(input)?;
    let result = normalize_rows(&parsed.rows, &mapping, source.date_format, source.number_format);

    eprintln!("   Records: {} ({} usable)", result.records.len(), result.usable_count());
    eprintln!("   {}", result.diagnostics.summary());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

fn cmd_fallbacks(mapping: Option<&Path>) -> CliResult {
    let mapping = match mapping {
        Some(path) => FieldMapping::from_json(&fs::read_to_string(path)?)?,
        None => FieldMapping::default(),
    };

    for field in Field::ALL {
        let column = mapping
            .columns
            .get(&field)
            .map(|c| format!(" = '{}'", c))
            .unwrap_or_default();
        println!("{}{}", field, column);
        println!("   {}", mapping.fallback_labels(field).join(", "));
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
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

/// Mapping from `--mapping`, `--profile`, or the built-in fallbacks.
fn load_mapping(source: &SourceArgs) -> Result<FieldMapping, Box<dyn std::error::Error>> {
    if let Some(path) = &source.mapping {
        eprintln!("   Mapping: {}", path.display());
        return Ok(FieldMapping::from_json(&fs::read_to_string(path)?)?);
    }

    if let Some(id) = &source.profile {
        let mut registry = ProfileRegistry::new();
        let mapping = {
            let profile = registry.get(id)?;
            eprintln!("   Profile: {} ({})", profile.name, profile.id);
            profile.mapping.clone()
        };
        registry.touch(id)?;
        return Ok(mapping);
    }

    Ok(FieldMapping::default())
}

fn cmd_profile(action: ProfileAction) -> CliResult {
    let mut registry = ProfileRegistry::new();

    match action {
        ProfileAction::List => {
            let profiles = registry.list();
            if profiles.is_empty() {
                eprintln!("📋 No profiles stored yet.");
                eprintln!("   Use 'rekap profile import <file>' to add one.");
                return Ok(());
            }

            eprintln!("📋 Stored profiles ({}):\n", profiles.len());
            for p in profiles {
                println!("  📄 {} ({})", p.name, p.id);
                println!("     Columns: {}", p.columns.join(", "));
                println!("     Uses: {}", p.use_count);
                if let Some(ref last) = p.last_used {
                    println!("     Last used: {}", last);
                }
                println!();
            }
        }

        ProfileAction::Import { file, name } => {
            eprintln!("📥 Importing profile from: {}", file.display());
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Profile saved with ID: {}", id);
        }

        ProfileAction::Show { id } => {
            let p = registry.get(&id)?;
            println!("📄 Profile: {} ({})\n", p.name, p.id);
            println!("Columns: {}", p.columns.join(", "));
            println!("Created: {}", p.created_at);
            println!("Uses: {}", p.use_count);
            println!("\nMapping:");
            println!("{}", p.mapping.to_json()?);
        }

        ProfileAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Profile deleted: {}", id);
        }

        ProfileAction::Suggest { input } => {
            let parsed = parse_file_auto(&input)?;
            let matches = registry.find_compatible(&parsed.headers);
            if matches.is_empty() {
                eprintln!("📋 No stored profile matches {}", input.display());
                return Ok(());
            }

            for (p, score) in matches {
                println!("  📄 {} ({}) - {:.0}% of columns", p.name, p.id, score * 100.0);
            }
        }
    }

    Ok(())
}
