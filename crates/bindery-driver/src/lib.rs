//! Run orchestration: discover headers, build one declaration tree for all
//! of them, run the pass pipeline and write the output channels.

use bindery_clang::{load_header, AstSource, Ast, ClangJsonSource, DumpFileSource};
use bindery_common::{is_header_path, GenError, Result, SourceMap};
use bindery_config::{BinderyConfig, ParserArgs, Separator, SymbolFilter};
use bindery_passes::{Facts, FileUnit, OutputSink, Pipeline, Settings};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Where parser trees come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParserMode {
    /// Run clang (`program`, or the default executable) per header.
    #[default]
    Clang,
    ClangProgram(String),
    /// Read `<header>.ast.json` files written ahead of time.
    Dumps,
    /// Parse in process through libclang.
    #[cfg(feature = "libclang")]
    Libclang,
}

/// Everything one `generate` run needs.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Header directory, or a single header
    pub input: PathBuf,
    pub output: PathBuf,
    /// Explicit configuration file; `<input>/bindery.toml` otherwise
    pub config: Option<PathBuf>,
    pub parser_args: ParserArgs,
    pub parser: ParserMode,
}

impl GenerateOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: None,
            parser_args: ParserArgs::default(),
            parser: ParserMode::default(),
        }
    }
}

/// A header selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated
    pub relative: String,
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub headers: usize,
    pub written: Vec<PathBuf>,
}

/// Orchestrates one generation run over an input root.
pub struct Driver {
    root: PathBuf,
    single: Option<PathBuf>,
    config: BinderyConfig,
    settings: Settings,
}

impl Driver {
    /// Prepare a run over `input` (a directory or one header).
    pub fn new(input: &Path, config: BinderyConfig) -> Result<Self> {
        let (root, single) = if input.is_file() {
            let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, Some(input.to_path_buf()))
        } else if input.is_dir() {
            (input.to_path_buf(), None)
        } else {
            return Err(GenError::io(
                input,
                std::io::Error::new(std::io::ErrorKind::NotFound, "input does not exist"),
            ));
        };
        let settings = Settings::from_config(&config)?;
        Ok(Self {
            root,
            single,
            config,
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &BinderyConfig {
        &self.config
    }

    /// Headers to process, sorted by relative path. The order decides every
    /// first-match-wins choice a pass makes, so it must be stable.
    pub fn discover(&self) -> Result<Vec<Header>> {
        let filter = SymbolFilter::new(&self.config.headers, Separator::Path)?;
        let candidates: Vec<PathBuf> = match &self.single {
            Some(file) => vec![file.clone()],
            None => {
                let mut found = Vec::new();
                for entry in WalkDir::new(&self.root).follow_links(true) {
                    let entry = entry.map_err(|e| {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                        GenError::io(path, std::io::Error::other(e.to_string()))
                    })?;
                    if entry.file_type().is_file() && is_header_path(entry.path()) {
                        found.push(entry.into_path());
                    }
                }
                found
            }
        };

        let mut headers: Vec<Header> = candidates
            .into_iter()
            .map(|path| Header {
                relative: relative_key(&self.root, &path),
                path,
            })
            .filter(|h| {
                let keep = filter.is_included(&h.relative);
                if !keep {
                    debug!(header = %h.relative, "header filtered out");
                }
                keep
            })
            .collect();
        headers.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(headers)
    }

    /// Parse every header into one shared tree.
    pub fn load(&self, source: &dyn AstSource, headers: &[Header]) -> Result<(Ast, Vec<FileUnit>)> {
        let mut ast = Ast::new();
        let mut sources = SourceMap::new();
        let mut files = Vec::with_capacity(headers.len());
        for header in headers {
            debug!(header = %header.relative, parser = source.name(), "loading");
            let root = load_header(&mut ast, &mut sources, source, &header.path)?;
            files.push(FileUnit::new(root, &header.path, &header.relative));
        }
        info!(headers = files.len(), symbols = ast.registry_len(), "declaration tree built");
        Ok((ast, files))
    }

    /// Run the standard pipeline, writing into `sink`.
    pub fn run(&self, source: &dyn AstSource, sink: &mut OutputSink) -> Result<usize> {
        self.run_with(Pipeline::standard(), source, sink)
    }

    /// Run `pipeline`, writing into `sink`. The sink is finished whether or
    /// not the run succeeds; a pipeline error wins over a close error.
    pub fn run_with(
        &self,
        pipeline: Pipeline,
        source: &dyn AstSource,
        sink: &mut OutputSink,
    ) -> Result<usize> {
        let result = self.run_pipeline(pipeline, source, sink);
        let finished = sink.finish();
        let headers = result?;
        finished?;
        Ok(headers)
    }

    fn run_pipeline(
        &self,
        pipeline: Pipeline,
        source: &dyn AstSource,
        sink: &mut OutputSink,
    ) -> Result<usize> {
        let headers = self.discover()?;
        info!(root = %self.root.display(), headers = headers.len(), "generating");
        let (mut ast, files) = self.load(source, &headers)?;
        debug!(passes = ?pipeline.pass_names(), "pipeline");
        let mut facts = Facts::default();
        pipeline.run(&mut ast, &files, &mut facts, sink, &self.settings)?;
        debug!(
            flag_enums = facts.flag_enums.len(),
            interfaces = facts.interfaces.len(),
            hidden_accessors = facts.hidden_accessors.len(),
            "pipeline finished"
        );
        Ok(files.len())
    }
}

/// `/`-joined path of `path` below `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parser adapter for `mode`, with `args` passed through unmodified.
pub fn make_source(mode: &ParserMode, args: Vec<String>) -> Result<Box<dyn AstSource>> {
    Ok(match mode {
        ParserMode::Clang => Box::new(ClangJsonSource::new(args)),
        ParserMode::ClangProgram(program) => Box::new(ClangJsonSource::new(args).with_program(program)),
        ParserMode::Dumps => Box::new(DumpFileSource::new()),
        #[cfg(feature = "libclang")]
        ParserMode::Libclang => Box::new(bindery_clang::LibclangSource::new(args)?),
    })
}

/// Directory holding `input`'s `bindery.toml`.
fn config_root(input: &Path) -> PathBuf {
    if input.is_file() {
        input.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        input.to_path_buf()
    }
}

/// Generate directives for `options.input` into `options.output`.
pub fn generate(options: &GenerateOptions) -> Result<RunSummary> {
    let config = BinderyConfig::discover(options.config.as_deref(), &config_root(&options.input))?;
    let driver = Driver::new(&options.input, config)?;
    let args = options.parser_args.resolve(driver.config(), driver.root())?;
    debug!(?args, "parser arguments");
    let source = make_source(&options.parser, args)?;

    let mut sink = OutputSink::to_directory(&options.output);
    let headers = driver.run(source.as_ref(), &mut sink)?;
    let summary = RunSummary {
        headers,
        written: sink.written_files().to_vec(),
    };
    info!(headers = summary.headers, files = summary.written.len(), "done");
    Ok(summary)
}

/// Parse one header the way `generate` would and render its tree.
pub fn dump_header(header: &Path, mode: &ParserMode, parser_args: &ParserArgs) -> Result<String> {
    let root = config_root(header);
    let config = BinderyConfig::discover(None, &root)?;
    let source = make_source(mode, parser_args.resolve(&config, &root)?)?;
    dump(header, source.as_ref())
}

/// Build the tree of one header and render it as text.
pub fn dump(header: &Path, source: &dyn AstSource) -> Result<String> {
    let mut ast = Ast::new();
    let mut sources = SourceMap::new();
    let root = load_header(&mut ast, &mut sources, source, header)?;
    Ok(ast.dump(root))
}
