//! Local OCR through the `tesseract` command-line engine.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};

use super::{LanguageConfigurable, ProviderError, RecognitionProvider, RecognitionResult};

const DEFAULT_BINARY: &str = "tesseract";
/// TSV `level` value for single words.
const WORD_LEVEL: &str = "5";

pub struct TesseractProvider {
    binary: String,
    language: String,
}

impl TesseractProvider {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            language: "eng".to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            ..Self::new()
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Default for TesseractProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageConfigurable for TesseractProvider {
    fn set_language(&mut self, tag: &str) {
        self.language = tag.to_string();
    }
}

#[async_trait]
impl RecognitionProvider for TesseractProvider {
    fn name(&self) -> &'static str {
        "Tesseract"
    }

    async fn recognize(&self, png: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
        log::debug!(
            "Running {} on {} bytes (lang {})",
            self.binary,
            png.len(),
            self.language
        );

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language, "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProviderError::Unavailable(format!(
                    "failed to spawn {} (is it installed?): {}",
                    self.binary, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).await?;
            // Closing stdin lets the engine start.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Engine(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses tesseract TSV output into word results.
pub(crate) fn parse_tsv(tsv: &str) -> Result<Vec<RecognitionResult>, ProviderError> {
    let mut lines = tsv.lines();
    let header = lines
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("empty TSV output".to_string()))?;
    let columns: Vec<&str> = header.split('\t').collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| ProviderError::MalformedResponse(format!("missing TSV column '{}'", name)))
    };
    let level = column("level")?;
    let left = column("left")?;
    let top = column("top")?;
    let width = column("width")?;
    let height = column("height")?;
    let text = column("text")?;

    let mut results = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.get(level) != Some(&WORD_LEVEL) {
            continue;
        }
        let word = fields.get(text).map(|t| t.trim()).unwrap_or_default();
        if word.is_empty() {
            continue;
        }
        let number = |idx: usize| -> Result<f64, ProviderError> {
            fields
                .get(idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| ProviderError::MalformedResponse(format!("bad TSV row: {}", line)))
        };
        results.push(RecognitionResult::new(
            word,
            number(left)?,
            number(top)?,
            number(width)?,
            number(height)?,
        ));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn keeps_only_word_rows_with_text() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t300\t200\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t12\t120\t20\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t12\t50\t20\t96.5\tHello\n\
             5\t1\t1\t1\t1\t2\t70\t12\t60\t20\t95.1\tworld\n\
             5\t1\t1\t1\t1\t3\t140\t12\t5\t20\t10.0\t \n"
        );
        let results = parse_tsv(&tsv).unwrap();
        assert_eq!(
            results,
            vec![
                RecognitionResult::new("Hello", 10.0, 12.0, 50.0, 20.0),
                RecognitionResult::new("world", 70.0, 12.0, 60.0, 20.0),
            ]
        );
    }

    #[test]
    fn empty_page_yields_no_results() {
        let results = parse_tsv(&format!("{HEADER}\n")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn missing_header_is_malformed() {
        assert!(matches!(
            parse_tsv(""),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_tsv("level\ttext\n5\thi"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn language_capability_is_applied() {
        let mut provider = TesseractProvider::new();
        provider.set_language("spa");
        assert_eq!(provider.language(), "spa");
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let provider = TesseractProvider::with_binary("/nonexistent/wayscan-tesseract");
        let err = provider.recognize(b"png").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
