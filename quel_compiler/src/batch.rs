//! Batch parsing of many independent sources
//!
//! Each source gets its own `Lexer` and `Parser`, so sources parse in
//! parallel without sharing mutable state. Only the type resolver is shared,
//! by reference. Directory discovery picks up `*.quel` files (queries) and
//! `*.doc` files (docblocks).

use crate::config::constants::compile_time::batch::{
    MAX_CHUNK_SIZE, MAX_SOURCES_PER_BATCH, MAX_THREADS,
};
use crate::config::RuntimeConfig;
use crate::logging::{self, codes, Code};
use crate::syntax::{self, AnnotationCollection, ParseContext, ParserError, SyntaxTree, TypeResolver};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// BATCH TYPES
// ============================================================================

/// What grammar a source is parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Query,
    Docblock,
}

impl SourceKind {
    /// `.quel` is a query, `.doc` a docblock; anything else is skipped
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("quel") {
            Some(Self::Query)
        } else if ext.eq_ignore_ascii_case("doc") {
            Some(Self::Docblock)
        } else {
            None
        }
    }
}

/// One named source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub kind: SourceKind,
    pub text: String,
}

impl Source {
    pub fn query(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Query,
            text: text.into(),
        }
    }

    pub fn docblock(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Docblock,
            text: text.into(),
        }
    }
}

/// Output of one successful parse
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSource {
    Query(SyntaxTree),
    Annotations(AnnotationCollection),
}

impl ParsedSource {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Query(tree) => tree.to_json(),
            Self::Annotations(annotations) => {
                serde_json::to_value(annotations).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_sources: Option<usize>,
    pub fail_fast: bool,
    /// Imports, namespace and placeholder values shared by every source
    pub context: ParseContext,
    pub runtime: RuntimeConfig,
}

impl BatchConfig {
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            max_threads: runtime.batch.threads.clamp(1, MAX_THREADS),
            recursive: runtime.batch.recursive,
            max_sources: None,
            fail_fast: runtime.batch.fail_fast,
            context: ParseContext::default(),
            runtime: runtime.clone(),
        }
    }

    pub fn with_context(mut self, context: ParseContext) -> Self {
        self.context = context;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_runtime(&RuntimeConfig::default())
    }
}

#[derive(Debug, Default)]
pub struct BatchResults {
    pub successes: Vec<(String, ParsedSource)>,
    pub failures: Vec<(String, ParserError)>,
    pub processing_duration: Duration,
    pub sources_processed: usize,
    pub sources_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.sources_processed == 0 {
            0.0
        } else {
            self.successes.len() as f64 / self.sources_processed as f64
        }
    }

    fn record(&mut self, name: String, result: Result<ParsedSource, ParserError>) {
        match result {
            Ok(parsed) => self.successes.push((name, parsed)),
            Err(error) => self.failures.push((name, error)),
        }
        self.sources_processed += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch parsing completed: {} sources processed, {} successful ({:.1}%), {} failed, {:.2}s total",
            self.sources_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("No .quel or .doc sources found in: {path}")]
    NoSourcesFound { path: String },

    #[error("Too many sources: {count} (max: {max})")]
    TooManySources { count: usize, max: usize },

    #[error("Cannot read {path}: {message}")]
    SourceRead { path: String, message: String },

    #[error("Worker thread failed: {message}")]
    ThreadFailure { message: String },
}

impl BatchError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DirectoryNotFound { .. } => codes::batch::DIRECTORY_NOT_FOUND,
            Self::NoSourcesFound { .. } => codes::batch::NO_SOURCES_FOUND,
            Self::TooManySources { .. } => codes::batch::TOO_MANY_SOURCES,
            Self::SourceRead { .. } => codes::batch::SOURCE_READ_FAILED,
            Self::ThreadFailure { .. } => codes::batch::THREAD_FAILURE,
        }
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Find `.quel` and `.doc` files under `dir`, sorted by path
pub fn discover_sources(dir: &Path, config: &BatchConfig) -> Result<Vec<PathBuf>, BatchError> {
    crate::log_info!("Starting source discovery",
        "directory" => dir.display(),
        "recursive" => config.recursive
    );

    if !dir.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut files = Vec::new();
    visit_directory(dir, &mut files, config)?;

    if files.is_empty() {
        return Err(BatchError::NoSourcesFound {
            path: dir.display().to_string(),
        });
    }
    if files.len() > MAX_SOURCES_PER_BATCH {
        return Err(BatchError::TooManySources {
            count: files.len(),
            max: MAX_SOURCES_PER_BATCH,
        });
    }

    files.sort();
    crate::log_debug!("Source discovery completed", "sources" => files.len());
    Ok(files)
}

fn visit_directory(
    dir: &Path,
    files: &mut Vec<PathBuf>,
    config: &BatchConfig,
) -> Result<(), BatchError> {
    let io_error = |e: std::io::Error| BatchError::SourceRead {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        if limit_reached(files, config) {
            break;
        }
        let path = entry.map_err(io_error)?.path();

        if path.is_dir() {
            if config.recursive {
                visit_directory(&path, files, config)?;
            }
        } else if SourceKind::from_path(&path).is_some() {
            files.push(path);
            if limit_reached(files, config) {
                crate::log_warning!("Reached maximum source limit", "limit" => files.len());
            }
        }
    }

    Ok(())
}

/// The `max_sources` cap counts files across every directory visited
fn limit_reached(files: &[PathBuf], config: &BatchConfig) -> bool {
    config.max_sources.is_some_and(|max| files.len() >= max)
}

/// Read discovered files into memory
pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<Source>, BatchError> {
    paths
        .iter()
        .filter_map(|path| SourceKind::from_path(path).map(|kind| (path, kind)))
        .map(|(path, kind)| {
            let text = fs::read_to_string(path).map_err(|e| BatchError::SourceRead {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Ok(Source {
                name: path.display().to_string(),
                kind,
                text,
            })
        })
        .collect()
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse one source with the grammar its kind selects
pub fn parse_source<R: TypeResolver>(
    source: &Source,
    types: R,
    config: &BatchConfig,
) -> Result<ParsedSource, ParserError> {
    let context = config.context.clone();
    match source.kind {
        SourceKind::Query => {
            syntax::parse_query_with_config(&source.text, context, types, &config.runtime)
                .map(ParsedSource::Query)
        }
        SourceKind::Docblock => {
            syntax::parse_annotations_with_config(&source.text, context, types, &config.runtime)
                .map(ParsedSource::Annotations)
        }
    }
}

/// Parse every source, in parallel when more than one thread is configured.
/// Results keep the input order.
pub fn parse_sources<R>(
    sources: &[Source],
    types: &R,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError>
where
    R: TypeResolver + Sync,
{
    let start_time = Instant::now();
    if sources.len() > MAX_SOURCES_PER_BATCH {
        return Err(BatchError::TooManySources {
            count: sources.len(),
            max: MAX_SOURCES_PER_BATCH,
        });
    }

    let threads = config.max_threads.clamp(1, MAX_THREADS);
    crate::log_info!("Starting batch parsing",
        "sources" => sources.len(),
        "threads" => threads
    );

    let mut results = BatchResults::new();
    results.sources_discovered = sources.len();

    if threads == 1 {
        for (id, source) in sources.iter().enumerate() {
            let result = parse_with_context(id, source, types, config);
            let failed = result.is_err();
            results.record(source.name.clone(), result);
            if failed && config.fail_fast {
                crate::log_warning!("Fail-fast enabled, stopping batch", "source" => &source.name);
                break;
            }
        }
    } else {
        let chunk_size = calculate_chunk_size(sources.len(), threads);
        for (chunk_id, chunk) in sources.chunks(chunk_size).enumerate() {
            let offset = chunk_id * chunk_size;
            for (name, result) in parse_chunk(chunk, offset, threads, types, config)? {
                results.record(name, result);
            }
            if config.fail_fast && results.failure_count() > 0 {
                crate::log_warning!("Fail-fast enabled, stopping batch after failing chunk");
                break;
            }
        }
    }

    results.processing_duration = start_time.elapsed();
    crate::log_success!(
        codes::success::BATCH_COMPLETE,
        "Batch parsing completed",
        "processed" => results.sources_processed,
        "successful" => results.success_count(),
        "failed" => results.failure_count(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

/// Discover, read and parse everything under `dir`
pub fn parse_directory<R>(
    dir: &Path,
    types: &R,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError>
where
    R: TypeResolver + Sync,
{
    let paths = discover_sources(dir, config)?;
    let sources = read_sources(&paths)?;
    parse_sources(&sources, types, config)
}

type SourceOutcome = (String, Result<ParsedSource, ParserError>);

fn parse_with_context<R: TypeResolver>(
    id: usize,
    source: &Source,
    types: &R,
    config: &BatchConfig,
) -> Result<ParsedSource, ParserError> {
    logging::with_source_context(source.name.clone(), id, || {
        parse_source(source, types, config)
    })
}

/// Split a chunk across scoped workers; each returns its own slice of outcomes
fn parse_chunk<R>(
    chunk: &[Source],
    offset: usize,
    threads: usize,
    types: &R,
    config: &BatchConfig,
) -> Result<Vec<SourceOutcome>, BatchError>
where
    R: TypeResolver + Sync,
{
    let per_thread = chunk.len().div_ceil(threads).max(1);

    thread::scope(|scope| {
        let handles: Vec<_> = chunk
            .chunks(per_thread)
            .enumerate()
            .map(|(worker, sources)| {
                let first_id = offset + worker * per_thread;
                scope.spawn(move || {
                    sources
                        .iter()
                        .enumerate()
                        .map(|(i, source)| {
                            let result = parse_with_context(first_id + i, source, types, config);
                            (source.name.clone(), result)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(chunk.len());
        for handle in handles {
            let worker_outcomes = handle.join().map_err(|_| BatchError::ThreadFailure {
                message: "worker panicked while parsing".to_string(),
            })?;
            outcomes.extend(worker_outcomes);
        }
        Ok(outcomes)
    })
}

fn calculate_chunk_size(sources: usize, threads: usize) -> usize {
    sources.div_ceil(threads.max(1)).clamp(1, MAX_CHUNK_SIZE)
}
