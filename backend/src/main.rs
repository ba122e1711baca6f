//! Feedcheck CLI - validate product feeds and generate schema.org markup
//!
//! # Main Commands
//!
//! ```bash
//! feedcheck validate feed.csv              # Validate a CSV or JSON feed
//! feedcheck markup feed.csv --row 0        # JSON-LD for one product
//! feedcheck extract https://shop/p/1       # Records from a product page
//! feedcheck serve                          # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! feedcheck parse feed.csv                 # Just parse CSV to JSON
//! feedcheck specs                          # Show the field specification table
//! ```

use chrono::Local;
use clap::{Parser, Subcommand};
use feedcheck::config::Settings;
use feedcheck::pipeline::{
    extract_from_html, format_delimiter, load_registry, markup_for, read_feed, scrape_records,
    validate_file, validate_records, PipelineOptions, RecordSelector,
};
use feedcheck::report::{render_summary, report_file_name};
use feedcheck::{parse_csv_file_auto, Requirement, ValidationOptions};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "feedcheck")]
#[command(about = "Validate product feeds and generate schema.org Product markup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a feed (CSV, or JSON array of objects)
    Validate {
        /// Input feed file
        input: PathBuf,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the JSON report under a timestamped name in the current directory
        #[arg(long, conflicts_with = "output")]
        save: bool,

        /// Field specification table (default: built-in)
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Report triggered conditional requirements as errors
        #[arg(long)]
        strict_conditionals: bool,

        /// Only check the fields each record declares
        #[arg(long)]
        declared_only: bool,

        /// Maximum error/warning entries in the report
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print a human-readable summary instead of JSON
        #[arg(long)]
        summary: bool,
    },

    /// Generate schema.org Product JSON-LD for one record of a feed
    Markup {
        /// Input feed file
        input: PathBuf,

        /// Zero-based row index (default: 0)
        #[arg(short, long, conflicts_with = "id")]
        row: Option<usize>,

        /// Select the record by its `id` field
        #[arg(long)]
        id: Option<String>,

        /// Wrap the JSON-LD in a <script> tag
        #[arg(long)]
        html: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract feed records from a product page's structured data
    Extract {
        /// Page URL (base for relative links with --html-file)
        #[arg(required_unless_present = "html_file")]
        url: Option<String>,

        /// Read the page from a local HTML file instead
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Also validate the extracted records
        #[arg(long)]
        validate: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON records
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the field specification table
    Specs {
        /// Field specification table (default: built-in)
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: FEEDCHECK_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Field specification table (default: FEEDCHECK_SPEC_PATH or built-in)
        #[arg(long)]
        spec: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Err(e) => Err(e.into()),
        Ok(settings) => run(cli.command, settings).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Validate {
            input,
            output,
            save,
            spec,
            strict_conditionals,
            declared_only,
            limit,
            summary,
        } => {
            let options = PipelineOptions {
                spec_path: spec.or(settings.spec_path),
                validation: ValidationOptions {
                    declared_fields_only: declared_only,
                    strict_conditionals,
                },
                report_limit: limit.unwrap_or(settings.report_limit),
            };
            let output = if save {
                Some(PathBuf::from(report_file_name(&Local::now())))
            } else {
                output
            };
            cmd_validate(&input, &options, output.as_deref(), summary)
        }

        Commands::Markup {
            input,
            row,
            id,
            html,
            output,
        } => {
            let selector = match id {
                Some(id) => RecordSelector::Id(id),
                None => RecordSelector::Index(row.unwrap_or(0)),
            };
            cmd_markup(&input, &selector, html, output.as_deref())
        }

        Commands::Extract {
            url,
            html_file,
            validate,
            output,
        } => {
            let options = PipelineOptions {
                spec_path: settings.spec_path,
                report_limit: settings.report_limit,
                ..PipelineOptions::default()
            };
            cmd_extract(url.as_deref(), html_file.as_deref(), validate, &options, output.as_deref()).await
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Specs { spec, json } => cmd_specs(spec.or(settings.spec_path).as_deref(), json),

        Commands::Serve { port, spec } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                spec_path: spec.or(settings.spec_path),
                ..settings
            };
            feedcheck::server::start_server(settings).await
        }
    }
}

fn cmd_validate(
    input: &Path,
    options: &PipelineOptions,
    output: Option<&Path>,
    summary: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Validating: {}", input.display());

    let run = validate_file(input, options)?;

    if summary {
        let registry = load_registry(options.spec_path.as_deref())?;
        write_output(&render_summary(&run.report, &registry), output)?;
    } else {
        write_output(&run.export.to_json_pretty()?, output)?;
    }

    if run.report.records_with_errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_markup(
    input: &Path,
    selector: &RecordSelector,
    html: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🏷️  Generating markup: {}", input.display());

    let (records, _) = read_feed(input)?;
    let markup = markup_for(&records, selector)?;

    if let Err(errors) = markup.validate() {
        eprintln!("⚠️  Markup does not satisfy the Product schema:");
        for err in errors.iter().take(5) {
            eprintln!("   - {}", err);
        }
    }

    let content = if html {
        markup.to_script_tag()?
    } else {
        markup.to_json_pretty()?
    };
    write_output(&content, output)?;

    Ok(())
}

async fn cmd_extract(
    url: Option<&str>,
    html_file: Option<&Path>,
    validate: bool,
    options: &PipelineOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = match (url, html_file) {
        (_, Some(path)) => {
            eprintln!("📄 Reading page: {}", path.display());
            let html = fs::read_to_string(path)?;
            extract_from_html(&html, url)
        }
        (Some(url), None) => scrape_records(url).await?,
        (None, None) => return Err("Provide a URL or --html-file".into()),
    };

    if validate {
        let run = validate_records(records.clone(), options)?;
        let registry = load_registry(options.spec_path.as_deref())?;
        eprintln!("{}", render_summary(&run.report, &registry));
    }

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_specs(spec_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let registry = load_registry(spec_path)?;

    if json {
        println!("{}", registry.to_json()?);
        return Ok(());
    }

    println!("📋 {} fields ({} required)\n", registry.len(), registry.required_fields().len());
    for spec in registry.iter() {
        let marker = if spec.is_required() {
            "required"
        } else if matches!(spec.requirement, Requirement::Conditional(_)) {
            "conditional"
        } else if spec.recommended {
            "recommended"
        } else {
            "optional"
        };
        println!("  {:<28} {:<10} {:<12} {}", spec.name, spec.kind.type_name(), marker, spec.description);
    }

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
