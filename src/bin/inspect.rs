//! FWOB Inspect Binary
//!
//! Reads FWOB headers and string tables without knowing the frame type.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fwob::file::read_string_table;
use fwob::format::Header;
use fwob::storage::Storage;
use fwob::{FwobError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// FWOB file inspector
#[derive(Parser, Debug)]
#[command(name = "fwob-inspect")]
#[command(about = "Inspect FWOB file headers and string tables")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the decoded header
    Info {
        /// The FWOB file
        file: PathBuf,
    },

    /// List the string table
    Strings {
        /// The FWOB file
        file: PathBuf,
    },

    /// Check that the file size matches the header
    Check {
        /// The FWOB file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fwob=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Info { file } => info(&file),
        Commands::Strings { file } => strings(&file),
        Commands::Check { file } => check(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_header(path: &PathBuf) -> Result<(File, Header)> {
    let mut file = File::open(path)?;
    let header = Header::read(&mut file)?.ok_or_else(|| FwobError::InvalidHeader {
        path: path.clone(),
    })?;
    Ok((file, header))
}

fn info(path: &PathBuf) -> Result<()> {
    let (_, header) = open_header(path)?;

    println!("file:         {}", path.display());
    println!("version:      {}", header.version);
    println!("frame type:   {}", header.frame_type);
    println!("title:        {}", header.title);
    println!("frame length: {}", header.frame_length);
    println!("frame count:  {}", header.frame_count);
    println!(
        "strings:      {} ({} of {} bytes)",
        header.string_count, header.string_table_length, header.string_table_preserved_length
    );
    println!("fields:");
    for (i, name) in header.field_names.iter().enumerate() {
        let field_type = header
            .field_type(i)
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:>2} {:<8} {:<16} {:>3} bytes",
            i, name, field_type, header.field_lengths[i]
        );
    }
    Ok(())
}

fn strings(path: &PathBuf) -> Result<()> {
    let (mut file, header) = open_header(path)?;
    let table = read_string_table(&mut file, &header, path)?;
    for (i, s) in table.iter().enumerate() {
        println!("{:>6} {}", i, s);
    }
    Ok(())
}

fn check(path: &PathBuf) -> Result<()> {
    let (mut file, header) = open_header(path)?;
    let actual = Storage::len(&mut file)?;
    if actual != header.file_length() {
        return Err(FwobError::FileLengthMismatch {
            path: path.clone(),
            expected: header.file_length(),
            actual,
        });
    }
    read_string_table(&mut file, &header, path)?;
    println!("{}: ok ({} frames)", path.display(), header.frame_count);
    Ok(())
}
