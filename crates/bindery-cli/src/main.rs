use bindery_config::ParserArgs;
use bindery_driver::{dump_header, generate, GenerateOptions, ParserMode};
use clap::{Args, Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bindery")]
#[command(author, version, about = "Generates C# wrapper directives from C++ headers")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate directive files for a header tree
    Generate {
        /// Header directory, or a single header
        input: PathBuf,

        /// Directory receiving `<subsystem>/_<category>.i` files
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration file (defaults to `<input>/bindery.toml`)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        parser: ParserOpts,
    },

    /// Print the declaration tree built for one header
    Dump {
        /// Header to parse
        header: PathBuf,

        #[command(flatten)]
        parser: ParserOpts,
    },
}

/// Options shared by every command that parses headers.
#[derive(Args)]
struct ParserOpts {
    /// Include directory passed to the parser
    #[arg(short = 'I', value_name = "DIR")]
    includes: Vec<PathBuf>,

    /// Preprocessor definition passed to the parser
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Raw parser flag, passed through unmodified
    #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
    flags: Vec<String>,

    /// File with additional parser arguments
    #[arg(long = "args-file", value_name = "FILE")]
    args_files: Vec<PathBuf>,

    /// Read `<header>.ast.json` dumps instead of running clang
    #[arg(long, conflicts_with = "clang")]
    from_dumps: bool,

    /// Clang executable producing JSON dumps (default: $BINDERY_CLANG, then clang++)
    #[arg(long, value_name = "PROGRAM")]
    clang: Option<String>,

    /// Parse in process through libclang
    #[cfg(feature = "libclang")]
    #[arg(long, conflicts_with_all = ["from_dumps", "clang"])]
    libclang: bool,
}

impl ParserOpts {
    fn mode(&self) -> ParserMode {
        #[cfg(feature = "libclang")]
        {
            if self.libclang {
                return ParserMode::Libclang;
            }
        }
        match (&self.clang, self.from_dumps) {
            (_, true) => ParserMode::Dumps,
            (Some(program), false) => ParserMode::ClangProgram(program.clone()),
            (None, false) => ParserMode::Clang,
        }
    }

    fn args(&self) -> ParserArgs {
        ParserArgs {
            includes: self.includes.clone(),
            defines: self.defines.clone(),
            flags: self.flags.clone(),
            args_files: self.args_files.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("BINDERY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            input,
            output,
            config,
            parser,
        } => {
            let mut options = GenerateOptions::new(input, output);
            options.config = config;
            options.parser_args = parser.args();
            options.parser = parser.mode();

            let summary = generate(&options)?;
            println!(
                "Processed {} headers, wrote {} files to {}",
                summary.headers,
                summary.written.len(),
                options.output.display()
            );
        }

        Commands::Dump { header, parser } => {
            print!("{}", dump_header(&header, &parser.mode(), &parser.args())?);
        }
    }

    Ok(())
}
