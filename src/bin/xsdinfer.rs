//! xsdinfer CLI — infer XML Schema sets from sample documents.

use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::Path;
use std::process;
use xsdinfer::schema::PRIMARY_LOCATION;
use xsdinfer::{codec, infer_all, write_schema_set, InferOptions, SchemaDocument};

#[derive(Parser)]
#[command(name = "xsdinfer", about = "Infer XML Schema sets from sample XML documents")]
struct Cli {
    /// Debug-Logging (RUST_LOG hat Vorrang)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Infer a schema set from one or more samples
    Infer(InferArgs),
    /// Read a schema set back and write it out again
    Roundtrip(RoundtripArgs),
}

#[derive(Args)]
struct InferArgs {
    /// Sample XML file (- for stdin), repeatable
    #[arg(short, long, required = true)]
    input: Vec<String>,

    /// Output directory for the schema set (without -o: primary schema to stdout)
    #[arg(short, long)]
    output: Option<String>,

    #[command(flatten)]
    limits: LimitArgs,
}

#[derive(Args)]
struct RoundtripArgs {
    /// Directory holding a schema set (0.xsd and its imports)
    #[arg(short, long)]
    dir: String,

    /// Output directory (without -o: primary schema to stdout)
    #[arg(short, long)]
    output: Option<String>,

    #[command(flatten)]
    limits: LimitArgs,
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum nesting depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum size of one input in bytes
    #[arg(long)]
    max_input_bytes: Option<usize>,
}

impl LimitArgs {
    fn to_options(&self) -> InferOptions {
        let mut opts = InferOptions::default();
        if let Some(depth) = self.max_depth {
            opts = opts.with_max_depth(depth);
        }
        if let Some(bytes) = self.max_input_bytes {
            opts = opts.with_max_input_bytes(bytes);
        }
        opts
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Infer(args) => run_infer(args),
        Command::Roundtrip(args) => run_roundtrip(args),
    }
}

fn run_infer(args: InferArgs) -> Result<(), String> {
    let opts = args.limits.to_options();

    let samples = args
        .input
        .iter()
        .map(|path| read_input(path))
        .collect::<Result<Vec<_>, _>>()?;

    let doc = infer_all(&samples, &opts)
        .map_err(|e| format!("Inferenz fehlgeschlagen: {e}"))?
        .ok_or_else(|| "keine Eingabe".to_string())?;

    emit(&doc, args.output.as_deref())
}

fn run_roundtrip(args: RoundtripArgs) -> Result<(), String> {
    let opts = args.limits.to_options();
    let doc = codec::read_schema_set(Path::new(&args.dir), PRIMARY_LOCATION, &opts)
        .map_err(|e| format!("Schema-Parse-Fehler: {e}"))?;

    emit(&doc, args.output.as_deref())
}

/// Writes the schema set to `output`, or the primary document to stdout.
fn emit(doc: &SchemaDocument, output: Option<&str>) -> Result<(), String> {
    match output {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| format!("Kann '{dir}' nicht anlegen: {e}"))?;
            let primary = write_schema_set(doc, Path::new(dir))
                .map_err(|e| format!("Schreiben fehlgeschlagen: {e}"))?;
            eprintln!(
                "{} schema(s) written, primary: {}",
                doc.document_count(),
                primary.display()
            );
        }
        None => {
            let text = codec::serialize(doc).map_err(|e| e.to_string())?;
            print!("{text}");
            if !doc.imports.is_empty() {
                log::warn!(
                    "{} imported schema(s) not printed, use -o DIR",
                    doc.document_count() - 1
                );
            }
        }
    }
    Ok(())
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .map_err(|e| format!("Kann stdin nicht lesen: {e}"))?;
        Ok(s)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Kann '{path}' nicht lesen: {e}"))
    }
}
