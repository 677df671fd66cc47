use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Reads newline-delimited entries, trimming each and skipping blanks.
pub fn read_entries(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            entries.push(trimmed.to_string());
        }
    }
    Ok(entries)
}

/// Replaces the file's content with `entries`, one per line.
pub fn write_entries(path: &Path, entries: &[String]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for entry in entries {
        writeln!(file, "{}", entry)?;
    }
    Ok(())
}

/// Appends `entries` to the file, creating it when absent.
pub fn append_entries(path: &Path, entries: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    for entry in entries {
        writeln!(file, "{}", entry)?;
    }
    Ok(())
}
