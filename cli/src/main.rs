//! docanchor CLI - document structure analysis and LLM response validation

use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docanchor::{
    load_document, render, AnalyzerOptions, AnchorAllocator, AnchorOptions, JsonFormat,
    LlmParsingRequest, ParseOutcome, ResponseParser, SchemaStore, SchemaType, StructureAnalyzer,
    ValidationRule,
};

#[derive(Parser)]
#[command(name = "docanchor")]
#[command(version)]
#[command(about = "Split documents into anchored sections and validate LLM responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a document's section structure
    Analyze {
        /// Input document (plain text, or JSON extracted document)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyze many documents in parallel
    Batch {
        /// Input documents
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "docanchor_output")]
        output: PathBuf,

        /// Analyze one document at a time
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Parse and validate a raw LLM response
    Parse {
        /// Response file ("-" for stdin)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Schema to validate against (e.g. translation_response)
        #[arg(short, long)]
        schema: Option<String>,

        /// Response type (detected from the data if omitted)
        #[arg(short = 't', long = "type", value_enum)]
        schema_type: Option<TypeArg>,

        /// Expected anchor ids, comma separated
        #[arg(short, long, value_delimiter = ',')]
        anchors: Vec<String>,

        /// Rule checks, comma separated (anchors_required, confidence_required, ...)
        #[arg(short, long, value_delimiter = ',')]
        rules: Vec<String>,

        /// Treat missing required fields as fatal
        #[arg(long)]
        strict: bool,

        /// Retry without schema and strictness if the first pass fails
        #[arg(long)]
        fallback: bool,

        /// Directory with additional schemas
        #[arg(long, env = "DOCANCHOR_SCHEMA_DIR", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Replace an anchor marker in anchored text
    Replace {
        /// Anchored text file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Anchor id, section id or full marker
        #[arg(short, long)]
        anchor: String,

        /// Replacement content
        #[arg(short, long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read replacement content from a file
        #[arg(long, value_name = "FILE")]
        content_file: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        markers: MarkerArgs,
    },

    /// Inspect response schemas
    Schema {
        /// Directory with additional schemas
        #[arg(long, env = "DOCANCHOR_SCHEMA_DIR", value_name = "DIR", global = true)]
        schema_dir: Option<PathBuf>,

        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List available schemas
    List,

    /// Print a schema document
    Show {
        /// Schema name
        name: String,
    },

    /// Generate a sample response for a schema
    Sample {
        /// Schema name
        name: String,
    },
}

#[derive(clap::Args)]
struct AnalysisArgs {
    /// Drop sections below this confidence
    #[arg(long, env = "DOCANCHOR_MIN_CONFIDENCE", default_value = "0.5")]
    min_confidence: f32,

    /// Per-document time budget in seconds
    #[arg(long, env = "DOCANCHOR_MAX_ANALYSIS_TIME", default_value = "30")]
    max_time: u64,

    /// Maximum number of elements per document
    #[arg(long, env = "DOCANCHOR_MAX_ELEMENTS", default_value = "10000")]
    max_elements: usize,

    #[command(flatten)]
    markers: MarkerArgs,
}

#[derive(clap::Args, Default)]
struct MarkerArgs {
    /// Anchor marker prefix
    #[arg(long, env = "DOCANCHOR_ANCHOR_PREFIX")]
    anchor_prefix: Option<String>,

    /// Anchor marker suffix
    #[arg(long, env = "DOCANCHOR_ANCHOR_SUFFIX")]
    anchor_suffix: Option<String>,
}

impl MarkerArgs {
    fn anchor_options(&self) -> AnchorOptions {
        let anchor = AnchorOptions::default();
        if self.anchor_prefix.is_none() && self.anchor_suffix.is_none() {
            return anchor;
        }
        let prefix = self.anchor_prefix.clone().unwrap_or(anchor.prefix.clone());
        let suffix = self.anchor_suffix.clone().unwrap_or(anchor.suffix.clone());
        anchor.with_markers(prefix, suffix)
    }
}

impl AnalysisArgs {
    fn options(&self) -> AnalyzerOptions {
        AnalyzerOptions::new()
            .with_min_confidence(self.min_confidence)
            .with_max_analysis_time(Duration::from_secs(self.max_time))
            .with_max_elements(self.max_elements)
            .with_anchor_options(self.markers.anchor_options())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full analysis result as JSON
    Json,
    /// Section text with anchor markers
    Anchored,
    /// Indented section outline
    Outline,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TypeArg {
    Translation,
    Contradiction,
    Ambiguity,
    General,
}

impl From<TypeArg> for SchemaType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Translation => SchemaType::Translation,
            TypeArg::Contradiction => SchemaType::Contradiction,
            TypeArg::Ambiguity => SchemaType::Ambiguity,
            TypeArg::General => SchemaType::General,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
            compact,
            analysis,
        } => cmd_analyze(&input, output.as_deref(), format, compact, &analysis),
        Commands::Batch {
            inputs,
            output,
            sequential,
            analysis,
        } => cmd_batch(&inputs, &output, sequential, &analysis),
        Commands::Parse {
            input,
            schema,
            schema_type,
            anchors,
            rules,
            strict,
            fallback,
            schema_dir,
            compact,
        } => {
            let args = ParseArgs {
                schema,
                schema_type,
                anchors,
                rules,
                strict,
                fallback,
                compact,
            };
            cmd_parse(&input, args, schema_dir.as_deref())
        }
        Commands::Replace {
            input,
            anchor,
            content,
            content_file,
            output,
            markers,
        } => cmd_replace(
            &input,
            &anchor,
            content,
            content_file.as_deref(),
            output.as_deref(),
            &markers,
        ),
        Commands::Schema {
            schema_dir,
            command,
        } => cmd_schema(command, schema_dir.as_deref()),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    analysis: &AnalysisArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(input)?;
    let analyzer = StructureAnalyzer::new(analysis.options());
    let result = analyzer.analyze(&doc);

    for warning in &result.warnings {
        eprintln!("{}: {}", "Warning".yellow(), warning);
    }
    if let Some(error) = result.error() {
        return Err(format!("Analysis failed: {}", error).into());
    }

    let rendered = match format {
        OutputFormat::Json => render::to_json(&result, json_format(compact))?,
        OutputFormat::Anchored => render::anchored_text(&result),
        OutputFormat::Outline => render::outline(&result),
    };
    write_or_print(output, &rendered)
}

fn cmd_batch(
    inputs: &[PathBuf],
    output_dir: &Path,
    sequential: bool,
    analysis: &AnalysisArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;

    let pb = ProgressBar::new(inputs.len() as u64 * 2);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    pb.set_message("Loading documents...");
    let mut docs = Vec::with_capacity(inputs.len());
    let mut loaded = Vec::with_capacity(inputs.len());
    for input in inputs {
        match load_document(input) {
            Ok(doc) => {
                docs.push(doc);
                loaded.push(input.as_path());
            }
            Err(e) => pb.println(format!("{} {}: {}", "Skipped".yellow(), input.display(), e)),
        }
        pb.inc(1);
    }

    log::debug!("Loaded {} of {} documents", docs.len(), inputs.len());
    let names = output_names(&loaded);

    pb.set_message("Analyzing...");
    let mut options = analysis.options();
    if sequential {
        options = options.sequential();
    }
    let results = StructureAnalyzer::new(options).analyze_batch(&docs);

    pb.set_message("Writing results...");
    let mut failed = 0;
    for (name, result) in names.iter().zip(&results) {
        if result.error().is_some() {
            failed += 1;
        }
        let json = render::to_json(result, JsonFormat::Pretty)?;
        fs::write(output_dir.join(format!("{}.sections.json", name)), json)?;
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} analyzed, {} degraded, {} skipped",
        "Batch complete:".green().bold(),
        results.len(),
        failed,
        inputs.len() - docs.len()
    );
    println!("  {} {}", "└─".dimmed(), output_dir.display());
    Ok(())
}

/// Output file stems for batch inputs. Repeated stems from different
/// directories get a `_2`, `_3`, ... suffix in input order.
fn output_names(inputs: &[&Path]) -> Vec<String> {
    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let mut name = stem.clone();
            let mut counter = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", stem, counter);
                counter += 1;
            }
            name
        })
        .collect()
}

struct ParseArgs {
    schema: Option<String>,
    schema_type: Option<TypeArg>,
    anchors: Vec<String>,
    rules: Vec<String>,
    strict: bool,
    fallback: bool,
    compact: bool,
}

fn read_input(input: &Path) -> io::Result<String> {
    if input == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
    }
}

fn schema_store(schema_dir: Option<&Path>) -> SchemaStore {
    match schema_dir {
        Some(dir) => SchemaStore::with_directory(dir),
        None => SchemaStore::with_defaults(),
    }
}

fn cmd_parse(
    input: &Path,
    args: ParseArgs,
    schema_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_input(input)?;

    let mut request = LlmParsingRequest::new(raw)
        .with_original_anchors(args.anchors)
        .strict(args.strict);
    if let Some(schema) = args.schema {
        request = request.with_schema(schema);
    }
    if let Some(schema_type) = args.schema_type {
        request = request.with_schema_type(schema_type.into());
    }
    for rule in &args.rules {
        request = request.with_rule(rule.parse::<ValidationRule>()?);
    }

    if let Some(dir) = schema_dir {
        log::debug!("Using schema directory {}", dir.display());
    }
    let parser = ResponseParser::new(Arc::new(schema_store(schema_dir)));
    let outcome = if args.fallback {
        parser.parse_with_fallback(&request)
    } else {
        let response = parser.parse(&request);
        if response.is_valid {
            ParseOutcome::Primary(response)
        } else {
            ParseOutcome::Invalid(response)
        }
    };

    let response = outcome.response();
    for warning in &response.warnings {
        eprintln!("{}: {}", "Warning".yellow(), warning);
    }
    for error in &response.errors {
        eprintln!("{}: {}", "Invalid".red(), error);
    }
    println!("{}", render::to_json(response, json_format(args.compact))?);

    if !outcome.is_usable() {
        return Err("response could not be parsed".into());
    }
    Ok(())
}

fn cmd_replace(
    input: &Path,
    anchor: &str,
    content: Option<String>,
    content_file: Option<&Path>,
    output: Option<&Path>,
    markers: &MarkerArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(input)?;
    let content = match (content, content_file) {
        (Some(content), _) => content,
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => return Err("either --content or --content-file is required".into()),
    };

    let allocator = AnchorAllocator::new(markers.anchor_options());
    let replaced = allocator.replace_anchor(&text, anchor, &content);
    if replaced == text {
        return Err(format!("anchor '{}' not found in {}", anchor, input.display()).into());
    }
    write_or_print(output, &replaced)
}

fn cmd_schema(
    command: SchemaCommands,
    schema_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = schema_store(schema_dir);

    match command {
        SchemaCommands::List => {
            println!("{}", "Available schemas".cyan().bold());
            println!("{}", "─".repeat(40).dimmed());
            for name in store.list_schemas() {
                let schema = store.get_schema(&name)?;
                println!(
                    "{} ({} required)",
                    name.bold(),
                    schema.required_fields().len()
                );
            }
        }
        SchemaCommands::Show { name } => {
            let schema = store.get_schema(&name)?;
            println!("{}", serde_json::to_string_pretty(&schema.raw)?);
        }
        SchemaCommands::Sample { name } => {
            let sample = store.generate_sample_response(&name)?;
            println!("{}", render::to_json(&sample, JsonFormat::Pretty)?);
        }
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docanchor".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document structure analysis and LLM response validation");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_are_unique() {
        let a = PathBuf::from("contracts/2024/lease.txt");
        let b = PathBuf::from("contracts/2025/lease.txt");
        let c = PathBuf::from("memo.json");
        let names = output_names(&[a.as_path(), b.as_path(), c.as_path()]);
        assert_eq!(names, vec!["lease", "lease_2", "memo"]);
    }

    #[test]
    fn test_output_names_avoid_existing_suffix() {
        let a = PathBuf::from("a/lease.txt");
        let b = PathBuf::from("lease_2.txt");
        let c = PathBuf::from("b/lease.txt");
        let names = output_names(&[a.as_path(), b.as_path(), c.as_path()]);
        assert_eq!(names, vec!["lease", "lease_2", "lease_3"]);
    }

    #[test]
    fn test_replace_uses_custom_markers() {
        let markers = MarkerArgs {
            anchor_prefix: Some("[[".to_string()),
            anchor_suffix: Some("]]".to_string()),
        };
        let allocator = AnchorAllocator::new(markers.anchor_options());
        let text = "Intro\n[[section_1_terms]]\nend";
        let replaced = allocator.replace_anchor(text, "section_1", "BODY");
        assert_eq!(replaced, "Intro\nBODY\nend");
    }

    #[test]
    fn test_default_markers() {
        let options = MarkerArgs::default().anchor_options();
        assert_eq!(options.prefix, AnchorOptions::default().prefix);
    }
}
