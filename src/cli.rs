use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Copy the first N rows of a CSV file into a new file.
#[derive(Debug, Parser)]
#[command(name = "csv-head", version)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// CSV file to read rows from.
    pub source: PathBuf,

    /// File to write the rows to (created or truncated).
    pub destination: PathBuf,

    /// Maximum number of rows to copy.
    #[arg(value_parser = parse_num_lines)]
    pub num_lines: usize,
}

pub fn parse_num_lines(raw: &str) -> Result<usize> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return Ok(n);
    }
    match trimmed.parse::<i128>() {
        Ok(n) if n < 0 => Err(Error::Argument(format!(
            "num_lines must not be negative, got {n}"
        ))),
        Ok(_) => Err(Error::Argument(format!("num_lines is too large: {trimmed}"))),
        Err(_) => Err(Error::Argument(format!(
            "num_lines must be an integer, got '{raw}'"
        ))),
    }
}
