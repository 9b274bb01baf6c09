//! Print the completions a spell document would get at a position
//!
//! Usage: `spell-complete <metadata.json> <document.yml> <line> <col>`, with a
//! zero-based line and character column.

use magic_spell_ls::parser::Document;
use magic_spell_ls::{request_completions, CompletionOptions, Cursor, Dialect, MagicSchema};
use std::error::Error;
use std::fs;
use std::path::Path;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so the listing can be piped
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [metadata, document, line, col] = args.as_slice() else {
        eprintln!("usage: spell-complete <metadata.json> <document.yml> <line> <col>");
        std::process::exit(2);
    };

    let schema = MagicSchema::load(Path::new(metadata)).await?;
    let text = fs::read_to_string(document)?;
    let document_path = fs::canonicalize(document)?;
    let dialect = Url::from_file_path(&document_path)
        .map(|uri| Dialect::for_uri(&uri))
        .unwrap_or_default();

    let document = Document::new(text);
    let cursor = Cursor::new(line.parse()?, col.parse()?);
    let options = CompletionOptions {
        dialect,
        ..CompletionOptions::default()
    };

    let Some(list) = request_completions(&schema, &document, cursor, options) else {
        println!("(no completions)");
        return Ok(());
    };

    println!(
        "{:?} completions replacing columns {}..{}",
        list.target, list.replace_from, list.replace_to
    );
    for candidate in &list.candidates {
        let marker = if candidate.is_default {
            "default"
        } else if candidate.inherited {
            "inherited"
        } else {
            ""
        };
        let summary = candidate
            .description
            .as_ref()
            .and_then(|lines| lines.first())
            .map(String::as_str)
            .unwrap_or("");
        println!("{:<32} {:<10} {}", format!("{:?}", candidate.text), marker, summary);
    }

    Ok(())
}
