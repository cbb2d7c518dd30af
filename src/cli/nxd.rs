//! CLUT inspection and container patch commands

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::bridge::{
    nxd_to_sqlite_args, patch_chapters, record_byte_offset, sqlite_to_nxd_args, to_clut_record,
    update_statement, Chapter, ClutRecord,
};
use crate::color::{read_packed, to_hex};
use crate::palette::PALETTE_COLORS;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Relational mirror file name written next to the container by the converter.
const MIRROR_DB: &str = "charclut.sqlite";

/// Execute the clut command
pub fn run_clut(sprite: &Path, json: bool) -> ExitCode {
    let data = match fs::read(sprite) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: Cannot read {}: {}", sprite.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let record = match to_clut_record(&data) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error: {}: {}", sprite.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        println!("{}", record.to_json());
    } else {
        print!("{}", format_palette_table(&data, &record));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// One line per palette index: index, stored word, expanded color.
fn format_palette_table(data: &[u8], record: &ClutRecord) -> String {
    let mut out = String::new();
    for i in 0..PALETTE_COLORS {
        let word = read_packed(data[i * 2], data[i * 2 + 1]);
        out.push_str(&format!("{:>2}  {:#06X}  {}\n", i, word, to_hex(record.color(i))));
    }
    out
}

/// Where patch-nxd takes its colors from.
#[derive(Debug, Clone, Copy)]
pub enum RecordSource<'a> {
    /// Slot 0 of a sprite file
    Sprite(&'a Path),
    /// A 48-integer JSON array
    Json(&'a str),
    /// Each chapter's shipped colors
    Stock,
}

/// Execute the patch-nxd command
///
/// Every chapter is written in one pass over the container.
pub fn run_patch_nxd(
    container: &Path,
    chapters: &[String],
    source: RecordSource<'_>,
    print_sql: bool,
) -> ExitCode {
    let chapters = match parse_chapters(chapters) {
        Ok(chapters) => chapters,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let records = match chapter_records(&chapters, source) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    if let Err(e) = patch_chapters(container, &records) {
        eprintln!("Error: {}: {}", container.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    for (chapter, _) in &records {
        let (key, key2) = chapter.record_key();
        // Every chapter key is in the offset table
        let offset = record_byte_offset(key, key2).unwrap_or_default();
        println!(
            "Patched {} ({}, Key={}, Key2={}) at {:#X}",
            container.display(),
            chapter,
            key,
            key2,
            offset
        );
    }

    if print_sql {
        print!("{}", sql_script(container, &records));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Parse chapter identifiers, dropping repeats of the same record.
fn parse_chapters(names: &[String]) -> Result<Vec<Chapter>, String> {
    let mut chapters = Vec::with_capacity(names.len());
    for name in names {
        let chapter = Chapter::from_name(name).map_err(|e| e.to_string())?;
        if !chapters.contains(&chapter) {
            chapters.push(chapter);
        }
    }
    Ok(chapters)
}

fn chapter_records(
    chapters: &[Chapter],
    source: RecordSource<'_>,
) -> Result<Vec<(Chapter, ClutRecord)>, String> {
    let shared = match source {
        RecordSource::Sprite(path) => {
            let data =
                fs::read(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
            Some(to_clut_record(&data).map_err(|e| format!("{}: {}", path.display(), e))?)
        }
        RecordSource::Json(json) => Some(ClutRecord::from_json(json).map_err(|e| e.to_string())?),
        RecordSource::Stock => None,
    };
    Ok(chapters
        .iter()
        .map(|&chapter| (chapter, shared.unwrap_or_else(|| chapter.stock_record())))
        .collect())
}

/// The same edit expressed through the relational mirror: convert the
/// container directory, run one UPDATE per record, convert back.
fn sql_script(container: &Path, records: &[(Chapter, ClutRecord)]) -> String {
    let dir = match container.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let db = dir.join(MIRROR_DB);
    let mut script = format!("-- {}\n", quote_args(&nxd_to_sqlite_args(&dir, &db)));
    for (chapter, record) in records {
        let (key, key2) = chapter.record_key();
        script.push_str(&update_statement(key, key2, record));
        script.push_str(";\n");
    }
    script.push_str(&format!("-- {}\n", quote_args(&sqlite_to_nxd_args(&db, &dir))));
    script
}

fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|a| if a.starts_with('-') || !a.contains(' ') { a.clone() } else { format!("\"{}\"", a) })
        .collect::<Vec<_>>()
        .join(" ")
}
