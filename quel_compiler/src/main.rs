use quel_compiler::batch::{self, BatchConfig, ParsedSource, SourceKind};
use quel_compiler::config::{ConfigMap, RuntimeConfig};
use quel_compiler::syntax::{self, ImportTable, ParseContext, ParserError, TypeRegistry};
use quel_compiler::utils::SourceMap;
use quel_compiler::{lexical, logging};
use std::env;
use std::fs;
use std::path::PathBuf;

/// What to do with a single input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Pick the grammar from the file extension
    Auto,
    Query,
    Annotations,
    Condition,
    Tokens,
}

#[derive(Debug)]
struct Options {
    input: PathBuf,
    mode: Mode,
    context: ParseContext,
    types: TypeRegistry,
    runtime: RuntimeConfig,
    max_sources: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("quel-compiler");

    if args.len() < 2 {
        eprintln!("Usage: {} [options] <file|directory>", program);
        eprintln!("       {} --help", program);
        std::process::exit(1);
    }
    if args[1..].iter().any(|arg| arg == "--help") {
        print_help(program);
        return Ok(());
    }

    let options = match parse_options(&args[1..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    logging::config::init_runtime_preferences(options.runtime.logging.clone())?;
    logging::init_global_logging()?;

    if options.input.is_dir() {
        process_directory(&options)
    } else if options.input.is_file() {
        process_single_file(&options)
    } else {
        eprintln!("Error: input must be a file or a directory");
        eprintln!("  Path: {}", options.input.display());
        std::process::exit(1);
    }
}

fn print_help(program: &str) {
    println!("ObjectQuel compiler v{}", env!("CARGO_PKG_VERSION"));
    println!("Parses ObjectQuel queries and annotation docblocks into JSON");
    println!();
    println!("USAGE:");
    println!("    {} [options] <file>         # Parse one source", program);
    println!("    {} [options] <directory>    # Parse every .quel and .doc file", program);
    println!();
    println!("OPTIONS:");
    println!("    --help                 Show this help message");
    println!("    --query                Parse the file as a query");
    println!("    --annotations          Parse the file as a docblock");
    println!("    --condition            Parse the file as a standalone condition");
    println!("    --tokens               Print the token stream instead of parsing");
    println!("    --config FILE          TOML or JSON map for ${{key}} placeholders");
    println!("    --settings FILE        TOML runtime settings");
    println!("    --import ALIAS=FQN     Add an import (repeatable; FQN alone uses its last segment)");
    println!("    --namespace NS         Current namespace for class-name resolution");
    println!("    --known CLASS          Register an annotation class (repeatable)");
    println!("    --max-depth N          Maximum nesting depth");
    println!("    --threads N            Worker threads for directories");
    println!("    --sequential           Same as --threads 1");
    println!("    --no-recursive         Don't search subdirectories");
    println!("    --max-sources N        Stop discovery after N sources");
    println!("    --fail-fast            Stop after the first failing chunk");
    println!("    --json-logs            Emit log events as JSON lines");
    println!();
    println!("EXAMPLES:");
    println!("    {} orders.quel --import Order=App\\\\Entity\\\\Order", program);
    println!("    {} Customer.doc --known App\\\\Mapping\\\\Table --import ORM=App\\\\Mapping", program);
    println!("    {} queries/ --threads 4 --fail-fast", program);
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut input = None;
    let mut mode = Mode::Auto;
    let mut config_file = None;
    let mut imports = ImportTable::new();
    let mut namespace = None;
    let mut types = TypeRegistry::new();
    let mut max_sources = None;

    let mut runtime = RuntimeConfig::default();
    if let Some(path) = option_value(args, "--settings") {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        runtime = RuntimeConfig::from_toml_str(&text).map_err(|e| e.to_string())?;
    }

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", flag))
        };

        match arg.as_str() {
            "--query" => mode = Mode::Query,
            "--annotations" => mode = Mode::Annotations,
            "--condition" => mode = Mode::Condition,
            "--tokens" => mode = Mode::Tokens,
            "--config" => config_file = Some(PathBuf::from(value(arg)?)),
            "--settings" => {
                value(arg)?;
            }
            "--import" => {
                let entry = value(arg)?;
                let (alias, fqn) = ImportTable::parse_entry(&entry)
                    .ok_or_else(|| format!("invalid import '{}'", entry))?;
                imports.insert(alias, fqn);
            }
            "--namespace" => namespace = Some(value(arg)?),
            "--known" => types.register(&value(arg)?),
            "--max-depth" => runtime.parser.max_nesting_depth = parse_number(arg, &value(arg)?)?,
            "--threads" => runtime.batch.threads = parse_number(arg, &value(arg)?)?,
            "--sequential" => runtime.batch.threads = 1,
            "--no-recursive" => runtime.batch.recursive = false,
            "--max-sources" => max_sources = Some(parse_number(arg, &value(arg)?)?),
            "--fail-fast" => runtime.batch.fail_fast = true,
            "--json-logs" => runtime.logging.use_structured_logging = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    return Err("only one input path is accepted".to_string());
                }
            }
        }
    }

    runtime.validate().map_err(|e| e.to_string())?;

    let mut context = ParseContext::new();
    if let Some(path) = config_file {
        context = context.with_config(ConfigMap::from_file(&path).map_err(|e| e.to_string())?);
    }
    for (alias, fqn) in imports.iter() {
        context = context.with_import(alias, fqn);
    }
    if let Some(namespace) = namespace {
        context = context.with_namespace(namespace);
    }

    Ok(Options {
        input: input.ok_or("missing input path")?,
        mode,
        context,
        types,
        runtime,
        max_sources,
    })
}

fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_number(flag: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

fn process_single_file(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(&options.input)?;
    let context = options.context.clone();
    let types = &options.types;
    let runtime = &options.runtime;

    let mode = match options.mode {
        Mode::Auto => match SourceKind::from_path(&options.input) {
            Some(SourceKind::Docblock) => Mode::Annotations,
            _ => Mode::Query,
        },
        mode => mode,
    };

    let output = match mode {
        Mode::Tokens => {
            let tokens = lexical::tokenize_with_preferences(&text, runtime.lexical.clone())?;
            Ok(serde_json::to_value(tokens)?)
        }
        Mode::Annotations => syntax::parse_annotations_with_config(&text, context, types, runtime)
            .map(|annotations| ParsedSource::Annotations(annotations).to_json()),
        Mode::Condition => {
            syntax::parse_condition_with_config(&text, context, types, runtime).map(|tree| tree.to_json())
        }
        Mode::Query | Mode::Auto => {
            syntax::parse_query_with_config(&text, context, types, runtime).map(|tree| tree.to_json())
        }
    };

    match output {
        Ok(json) => {
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        Err(error) => {
            let name = options.input.display().to_string();
            eprint!("{}", render_error(&options.runtime, &name, Some(&text), &error));
            std::process::exit(1);
        }
    }
}

fn process_directory(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = BatchConfig {
        max_sources: options.max_sources,
        ..BatchConfig::from_runtime(&options.runtime).with_context(options.context.clone())
    };

    println!("Parsing directory: {}", options.input.display());
    println!(
        "Configuration: {} threads, recursive={}, fail_fast={}",
        config.max_threads, config.recursive, config.fail_fast
    );

    let results = match batch::parse_directory(&options.input, &options.types, &config) {
        Ok(results) => results,
        Err(error) => {
            eprintln!("error[{}]: {}", error.error_code(), error);
            std::process::exit(1);
        }
    };

    for (name, error) in &results.failures {
        let text = fs::read_to_string(name).ok();
        eprint!("{}", render_error(&options.runtime, name, text.as_deref(), error));
    }
    println!();
    println!("{}", results.summary());

    if results.failure_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Renders a parse error under its source line, or as a header and file
/// name when positions are turned off or the source is gone
fn render_error(
    runtime: &RuntimeConfig,
    name: &str,
    source: Option<&str>,
    error: &ParserError,
) -> String {
    let code = error.error_code();
    match source {
        Some(text) if runtime.lexical.include_position_in_errors => SourceMap::new(text)
            .with_name(name)
            .format_error(Some(code.as_str()), &error.span(), &error.to_string()),
        _ => format!("error[{}]: {}\n  --> {}\n", code, error, name),
    }
}
