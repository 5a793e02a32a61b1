use std::path::PathBuf;

use afs_format::HeaderMagic;
use encoding_rs::Encoding;
use structopt::clap::AppSettings::*;
use structopt::StructOpt;

mod commands;
mod error;
mod util;

fn parse_header_magic(src: &str) -> Result<HeaderMagic, error::Error> {
    match src {
        "00" | "AFS_00" => Ok(HeaderMagic::Afs00),
        "20" | "AFS_20" => Ok(HeaderMagic::Afs20),
        _ => Err(error::Error::UnknownHeaderMagic(src.to_string())),
    }
}

fn parse_alignment(src: &str) -> Result<u32, error::Error> {
    let parsed = match src.strip_prefix("0x").or_else(|| src.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => src.parse(),
    };

    match parsed {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(error::Error::InvalidAlignment(src.to_string())),
    }
}

fn parse_encoding(src: &str) -> Result<&'static Encoding, error::Error> {
    Encoding::for_label(src.as_bytes()).ok_or_else(|| error::Error::UnknownEncoding(src.to_string()))
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "x",
        visible_alias = "extract",
        about = "Extract every entry of an archive into a directory and write <dir>.json next to it"
    )]
    Extract {
        #[structopt(name = "afsfile", parse(from_os_str), help = "Path to the .afs archive")]
        archive: PathBuf,

        #[structopt(name = "dir", parse(from_os_str), help = "Directory to extract into")]
        output: PathBuf,
    },

    #[structopt(
        name = "c",
        visible_alias = "create",
        about = "Create an archive from a directory, using <dir>.json when it exists"
    )]
    Create {
        #[structopt(
            short = "A",
            long,
            parse(try_from_str = parse_alignment),
            help = "Align entries to this many bytes, overriding the metadata [default: 0x800]"
        )]
        alignment: Option<u32>,

        #[structopt(
            short = "H",
            long = "header",
            parse(try_from_str = parse_header_magic),
            help = "Header magic to write (00 or 20), overriding the metadata [default: 00]"
        )]
        header_magic: Option<HeaderMagic>,

        #[structopt(
            short = "E",
            long,
            parse(try_from_str = parse_encoding),
            help = "Codepage for entry names taken from file names when there is no metadata (e.g. shift_jis)"
        )]
        encoding: Option<&'static Encoding>,

        #[structopt(name = "dir", parse(from_os_str), help = "Directory holding the files")]
        input: PathBuf,

        #[structopt(name = "afsfile", parse(from_os_str), help = "Path of the .afs archive to write")]
        archive: PathBuf,
    },

    #[structopt(name = "i", visible_alias = "info", about = "Show header and entries of an archive")]
    Info {
        #[structopt(
            short = "E",
            long,
            parse(try_from_str = parse_encoding),
            help = "Codepage to show entry names in (e.g. shift_jis)"
        )]
        encoding: Option<&'static Encoding>,

        #[structopt(name = "afsfile", parse(from_os_str), help = "Path to the .afs archive")]
        archive: PathBuf,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "afs",
    about = "Create, extract and inspect AFS archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "afs (x|c|i) [FLAGS|OPTIONS] <paths>..."
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn run(opts: CliOpts) -> anyhow::Result<()> {
    match opts.cmd {
        Commands::Extract { archive, output } => commands::extract(&archive, &output)?,
        Commands::Create {
            alignment,
            header_magic,
            encoding,
            input,
            archive,
        } => commands::create(&input, &archive, alignment, header_magic, encoding)?,
        Commands::Info { encoding, archive } => commands::info(&archive, encoding)?,
    }

    Ok(())
}

fn main() {
    let opts = CliOpts::from_iter(wild::args_os());

    let level = if opts.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(opts) {
        util::print_error(&e);
        std::process::exit(1);
    }
}
