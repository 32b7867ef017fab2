//! `xlimg` — dump embedded images from `.xlsx`/`.xls` workbooks as JSON.

use std::process;
use xlimg::XlImgError;

const USAGE: &str = "\
xlimg - extract embedded images from .xlsx and .xls workbooks

Usage: xlimg [OPTIONS] FILE

Options:
  -s, --sheet NAME  Restrict results to images anchored on this worksheet
  -h, --help        Show this help

Prints a JSON object with an `images` array (name, mimeType, base64 data,
and anchor positions per image) and a `truncated` flag. Format is detected
by magic bytes, not file extension.";

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut path: Option<String> = None;
    let mut sheet: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                println!("{USAGE}");
                return;
            }
            "-s" | "--sheet" => {
                i += 1;
                match args.get(i) {
                    Some(name) => sheet = Some(name.clone()),
                    None => {
                        eprintln!("xlimg: {} requires a value", args[i - 1]);
                        process::exit(1);
                    }
                }
            }
            s if s.starts_with('-') => {
                eprintln!("xlimg: unknown option: {s}");
                eprintln!("{USAGE}");
                process::exit(1);
            }
            _ => path = Some(args[i].clone()),
        }
        i += 1;
    }

    let Some(path) = path else {
        eprintln!("{USAGE}");
        process::exit(1);
    };

    if let Err(e) = run(&path, sheet.as_deref()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(path: &str, sheet: Option<&str>) -> xlimg::Result<()> {
    let result = xlimg::extract(std::path::Path::new(path), sheet)?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| XlImgError::Internal(format!("failed to serialize result: {e}")))?;
    println!("{json}");
    Ok(())
}
