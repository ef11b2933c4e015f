mod generate;
mod info;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use preimage_core::{
    EnumerationCtx, EnumerationCtxBuilder, HashFunction, DEFAULT_CHARSET,
    DEFAULT_PASSWORD_LENGTH, DEFAULT_STORE_URI, MAX_PASSWORD_LENGTH_ALLOWED,
};

use generate::generate;
use info::info;

/// All the hash types supported.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum HashFunctionArg {
    Md4,
    Md5,
    Sha1,
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl From<HashFunctionArg> for HashFunction {
    fn from(arg: HashFunctionArg) -> Self {
        match arg {
            HashFunctionArg::Md4 => HashFunction::Md4,
            HashFunctionArg::Md5 => HashFunction::Md5,
            HashFunctionArg::Sha1 => HashFunction::Sha1,
            HashFunctionArg::Sha2_224 => HashFunction::Sha2_224,
            HashFunctionArg::Sha2_256 => HashFunction::Sha2_256,
            HashFunctionArg::Sha2_384 => HashFunction::Sha2_384,
            HashFunctionArg::Sha2_512 => HashFunction::Sha2_512,
            HashFunctionArg::Sha3_224 => HashFunction::Sha3_224,
            HashFunctionArg::Sha3_256 => HashFunction::Sha3_256,
            HashFunctionArg::Sha3_384 => HashFunction::Sha3_384,
            HashFunctionArg::Sha3_512 => HashFunction::Sha3_512,
        }
    }
}

/// Exhaustive digest table generator.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Generate(Generate),
    Info(Info),
}

/// The parameters shared by all commands to describe a table.
#[derive(Args)]
pub struct TableArgs {
    /// The hash function.
    #[arg(long = "hash", value_enum, default_value_t = HashFunctionArg::Sha1)]
    hash_function: HashFunctionArg,

    /// The length of the candidates.
    #[arg(short, long, value_parser = value_parser!(u8).range(1..=MAX_PASSWORD_LENGTH_ALLOWED as i64), default_value_t = DEFAULT_PASSWORD_LENGTH)]
    length: u8,

    /// The charset to use. Its order defines the order of the enumeration.
    #[arg(short, long, value_parser = check_charset, default_value_t = DEFAULT_CHARSET.to_owned())]
    charset: String,
}

impl TableArgs {
    fn build_ctx(&self) -> Result<EnumerationCtx> {
        EnumerationCtxBuilder::new()
            .hash(self.hash_function.into())
            .charset(&self.charset)
            .length(self.length)
            .build()
            .context("Invalid table parameters")
    }
}

/// Digest every candidate and store it in a table.
#[derive(Args)]
pub struct Generate {
    #[command(flatten)]
    table: TableArgs,

    /// The store to write to: `memory:`, `file:<path>` or a path.
    #[arg(short, long, default_value_t = DEFAULT_STORE_URI.to_owned())]
    store: String,

    /// Where to save the resume checkpoint after every stored batch.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Resume from this candidate or prefix, inclusively.
    #[arg(long, group = "resume_source")]
    resume: Option<String>,

    /// Resume from the checkpoint file given with `--checkpoint`.
    #[arg(long, requires = "checkpoint", group = "resume_source")]
    resume_checkpoint: bool,
}

/// Print the size of a table without generating it.
#[derive(Args)]
pub struct Info {
    #[command(flatten)]
    table: TableArgs,
}

/// Checks if the charset is usable.
fn check_charset(charset: &str) -> Result<String> {
    if charset.is_empty() {
        bail!("The charset should contain at least one symbol");
    }

    if charset.chars().any(char::is_control) {
        bail!("The charset can't contain control characters");
    }

    Ok(charset.to_owned())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.commands {
        Commands::Generate(gen) => generate(gen)?,
        Commands::Info(info_args) => info(info_args)?,
    }

    Ok(())
}
