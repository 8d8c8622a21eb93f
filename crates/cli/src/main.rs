//! CLI tool converting a Freeplane HTML image map into a clickable PPTX.

use anyhow::{Context, Result};
use clap::Parser;
use click2pptx_core::imagemap::DEFAULT_MAP_ID;
use click2pptx_core::{find_background, find_html, make_output_path, Error, MapExtractor};
use click2pptx_pptx::DeckBuilder;
use std::path::{Path, PathBuf};

/// Convert a Freeplane HTML export into a clickable PPTX.
#[derive(Parser, Debug)]
#[command(name = "click2pptx")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source HTML file (default: first *.html in the current directory)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Destination PPTX file (default: output/mind_map_clickable_<timestamp>.pptx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Id of the <map> element holding the clickable areas
    #[arg(long, default_value = DEFAULT_MAP_ID)]
    map_id: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let output_path = run(&args)?;
    println!("Generated PPTX: {}", output_path.display());

    Ok(())
}

/// Run the whole conversion and return the written path.
fn run(args: &Args) -> Result<PathBuf> {
    let html_path = find_html(args.input.as_deref())?;
    let output_path = make_output_path(args.output.as_deref())
        .context("Failed to prepare output path")?;

    log::info!("Reading {}", html_path.display());
    let html = std::fs::read_to_string(&html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;

    let extractor = MapExtractor::new().with_map_id(&args.map_id);
    let image_map = extractor
        .extract(&html)
        .with_context(|| format!("Failed to parse {}", html_path.display()))?;

    if image_map.is_empty() {
        return Err(Error::EmptyResult.into());
    }
    log::info!("Found {} clickable areas", image_map.clickables.len());

    let background = image_map
        .background
        .as_deref()
        .and_then(|src| locate_background(src, &html_path));

    DeckBuilder::new()
        .build(&image_map.clickables, background.as_deref(), &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(output_path)
}

fn locate_background(src: &str, html_path: &Path) -> Option<PathBuf> {
    let found = find_background(src, html_path);
    if found.is_none() {
        log::warn!("Background image not found, skipping: {}", src);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["click2pptx"]).unwrap();
        assert_eq!(args.input, None);
        assert_eq!(args.output, None);
        assert_eq!(args.map_id, "fm_imagemap");
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_short_flags() {
        let args = Args::try_parse_from(["click2pptx", "-i", "carte.html", "-o", "out/deck.pptx"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("carte.html")));
        assert_eq!(args.output, Some(PathBuf::from("out/deck.pptx")));
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::try_parse_from([
            "click2pptx",
            "--input",
            "map.htm",
            "--output",
            "deck.pptx",
            "--map-id",
            "nodes",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("map.htm")));
        assert_eq!(args.map_id, "nodes");
        assert!(args.verbose);
    }

    #[test]
    fn test_empty_result_fails_without_writing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let html_path = temp_dir.path().join("empty.html");
        std::fs::write(&html_path, "<html><body>No map here</body></html>").unwrap();
        let dest = temp_dir.path().join("deck.pptx");

        let args = Args {
            input: Some(html_path),
            output: Some(dest.clone()),
            map_id: DEFAULT_MAP_ID.to_string(),
            verbose: false,
        };
        let err = run(&args).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyResult)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_unresolved_areas_fail_without_writing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let html_path = temp_dir.path().join("carte.html");
        std::fs::write(
            &html_path,
            r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="1,2,3,4"></map>
<img src="bg.png" usemap="#fm_imagemap">
<a href="https://before.example/">early</a>
<a id="FMID_1FM"></a>Node without link"##,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("bg.png"), b"not decoded").unwrap();
        let dest = temp_dir.path().join("deck.pptx");

        let args = Args {
            input: Some(html_path),
            output: Some(dest.clone()),
            map_id: DEFAULT_MAP_ID.to_string(),
            verbose: false,
        };
        let err = run(&args).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyResult)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_missing_input_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = Args {
            input: Some(temp_dir.path().join("missing.html")),
            output: Some(temp_dir.path().join("deck.pptx")),
            map_id: DEFAULT_MAP_ID.to_string(),
            verbose: false,
        };
        let err = run(&args).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MissingFile(_))));
    }

    #[test]
    fn test_run_writes_deck() {
        let temp_dir = tempfile::tempdir().unwrap();
        let html_path = temp_dir.path().join("carte.html");
        std::fs::write(
            &html_path,
            r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="140,50,412,108"></map>
<img src="carte.html_files/image.png" usemap="#fm_imagemap">
<a id="FMID_1FM"></a>Node <a href="https://example.com/">link</a>"##,
        )
        .unwrap();
        let dest = temp_dir.path().join("nested").join("deck.pptx");

        let args = Args {
            input: Some(html_path),
            output: Some(dest.clone()),
            map_id: DEFAULT_MAP_ID.to_string(),
            verbose: false,
        };
        assert_eq!(run(&args).unwrap(), dest);

        let slides = click2pptx_pptx::DeckReader::new()
            .read(std::fs::File::open(&dest).unwrap())
            .unwrap();
        assert_eq!(slides[0].shapes.len(), 1);
        assert_eq!(slides[0].shapes[0].hyperlink.as_deref(), Some("https://example.com/"));
    }
}
