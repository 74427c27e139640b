//! Reading source documents from a directory

use chrono::{DateTime, Utc};
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::{debug, warn};
use uuid::Uuid;

use ragbot_core::{Document, Error, Result};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\v]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static ANY_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// HTML elements whose text is taken as document content
const HTML_BLOCKS: &str = "title, h1, h2, h3, h4, h5, h6, p, li, td, th, blockquote, pre";

/// Reads every file of a directory into [`Document`]s.
///
/// Markdown and HTML are converted to plain text; any other file is read as
/// UTF-8 text and skipped with a warning when it is not valid UTF-8. Files and
/// directories whose name starts with a dot are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    input_dir: PathBuf,
    recursive: bool,
    required_exts: Option<Vec<String>>,
}

impl DirectoryReader {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            recursive: false,
            required_exts: None,
        }
    }

    /// Descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Only read files with one of these extensions (without the dot)
    pub fn required_exts(mut self, exts: &[&str]) -> Self {
        self.required_exts = Some(
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        );
        self
    }

    /// Read all matching files, sorted by path
    pub fn load_data(&self) -> Result<Vec<Document>> {
        if !self.input_dir.is_dir() {
            return Err(Error::DocumentReader(format!(
                "Directory {} does not exist.",
                self.input_dir.display()
            )));
        }

        let mut files = Vec::new();
        self.collect_files(&self.input_dir, &mut files)?;
        if files.is_empty() {
            return Err(Error::DocumentReader(format!(
                "No files found in {}.",
                self.input_dir.display()
            )));
        }
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            if let Some(document) = load_file(&path)? {
                documents.push(document);
            }
        }

        debug!(count = documents.len(), dir = %self.input_dir.display(), "loaded documents");
        Ok(documents)
    }

    fn collect_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false);
            if hidden {
                continue;
            }

            if path.is_dir() {
                if self.recursive {
                    self.collect_files(&path, out)?;
                }
                continue;
            }

            if let Some(ref exts) = self.required_exts {
                if !exts.contains(&extension_of(&path)) {
                    continue;
                }
            }
            out.push(path);
        }
        Ok(())
    }
}

/// Read one file into a document; `None` when the file is not text
pub fn load_file(path: &Path) -> Result<Option<Document>> {
    let bytes = fs::read(path)?;
    let raw = match String::from_utf8(bytes) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(path = %path.display(), "skipping file that is not valid UTF-8");
            return Ok(None);
        }
    };

    let extension = extension_of(path);
    let content = match extension.as_str() {
        "md" | "markdown" => markdown_to_text(&raw),
        "html" | "htm" => html_to_text(&raw),
        _ => raw,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_meta = fs::metadata(path)?;

    let metadata = json!({
        "file_path": path.to_string_lossy(),
        "file_name": file_name,
        "file_type": mime_type(&extension),
        "file_size": file_meta.len(),
        "creation_date": file_meta.created().ok().map(format_date),
        "last_modified_date": file_meta.modified().ok().map(format_date),
        "hash": format!("{:x}", md5::compute(content.as_bytes())),
    });

    Ok(Some(Document {
        id: Uuid::new_v4().to_string(),
        title: file_name,
        content,
        metadata,
    }))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn mime_type(extension: &str) -> &'static str {
    match extension {
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "txt" | "text" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "rs" | "py" | "toml" | "yaml" | "yml" => "text/plain",
        _ => "application/octet-stream",
    }
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string()
}

/// Strip Markdown syntax, keeping block boundaries as blank lines
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::BlockQuote(_)) => text.push_str("\n\n"),
            Event::End(TagEnd::Item) => text.push('\n'),
            _ => {}
        }
    }
    normalize(&text)
}

/// Extract readable text from an HTML page
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut blocks = Vec::new();

    if let Ok(selector) = Selector::parse(HTML_BLOCKS) {
        for element in document.select(&selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = ANY_WHITESPACE.replace_all(text.trim(), " ").into_owned();
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }

    if blocks.is_empty() {
        let text = document.root_element().text().collect::<Vec<_>>().join(" ");
        return ANY_WHITESPACE.replace_all(text.trim(), " ").into_owned();
    }

    blocks.join("\n\n")
}

fn normalize(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    BLANK_LINES.replace_all(collapsed.trim(), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_to_text() {
        let text = markdown_to_text("# DuckDB VSS\n\nThe **vss** extension adds `HNSW` indexes.\n\n- fast\n- local\n");
        assert_eq!(text, "DuckDB VSS\n\nThe vss extension adds HNSW indexes.\n\nfast\nlocal");
    }

    #[test]
    fn test_html_to_text() {
        let html = r#"
            <html>
                <head><title>Guide</title><script>var x = 1;</script></head>
                <body>
                    <h1>Vector search</h1>
                    <p>Cosine   similarity ranks
                       chunks.</p>
                </body>
            </html>
        "#;
        assert_eq!(html_to_text(html), "Guide\n\nVector search\n\nCosine similarity ranks chunks.");
    }

    #[test]
    fn test_load_data_reads_sorted_visible_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "second file").unwrap();
        fs::write(dir.path().join("a.md"), "# First\n\nfirst file").unwrap();
        fs::write(dir.path().join(".hidden"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "nested file").unwrap();

        let documents = DirectoryReader::new(dir.path()).load_data().unwrap();
        let titles: Vec<_> = documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a.md", "b.txt"]);
        assert_eq!(documents[0].content, "First\n\nfirst file");
        assert_eq!(documents[0].metadata["file_type"], "text/markdown");
        assert_eq!(documents[1].metadata["file_size"], 11);
        assert_eq!(
            documents[1].metadata["hash"],
            format!("{:x}", md5::compute("second file".as_bytes()))
        );

        let all = DirectoryReader::new(dir.path()).recursive(true).load_data().unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_required_exts_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.md"), "kept").unwrap();
        fs::write(dir.path().join("drop.txt"), "dropped").unwrap();

        let documents = DirectoryReader::new(dir.path())
            .required_exts(&[".md"])
            .load_data()
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title, "keep.md");
    }

    #[test]
    fn test_binary_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        fs::write(dir.path().join("notes.txt"), "plain").unwrap();

        let documents = DirectoryReader::new(dir.path()).load_data().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content, "plain");
    }

    #[test]
    fn test_empty_or_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryReader::new(dir.path()).load_data().unwrap_err();
        assert!(err.to_string().contains("No files found"));

        let err = DirectoryReader::new(dir.path().join("missing")).load_data().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
