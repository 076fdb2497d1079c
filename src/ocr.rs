//! Text recognition of price-board images
//!
//! Recognition is delegated to the `tesseract` command-line engine. Images are
//! normalized first (grayscale, upscaled) which noticeably improves
//! recognition of the small digits on the boards.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default upper bound on a single recognition run
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);

/// Factor applied to both image dimensions before recognition
const UPSCALE_FACTOR: u32 = 2;

/// Errors that can occur while recognizing an image
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine could not be started or its pipes failed
    #[error("failed to run OCR engine: {0}")]
    Io(#[from] std::io::Error),

    /// The engine exited with a failure status
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    /// The engine did not finish in time
    #[error("OCR engine timed out after {0:?}")]
    TimedOut(Duration),
}

/// Converts an image into ordered text lines
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<String>, OcrError>;
}

/// Recognition through the `tesseract` binary
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: Option<String>,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: Option<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            language,
            timeout,
        }
    }

    /// Arguments reading the image from stdin and writing text to stdout
    fn args(&self) -> Vec<String> {
        let mut args = vec!["stdin".to_string(), "stdout".to_string()];
        if let Some(language) = &self.language {
            args.push("-l".to_string());
            args.push(language.clone());
        }
        args
    }

    async fn run(&self, image: &[u8]) -> Result<Vec<String>, OcrError> {
        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
            // Dropping stdin closes the pipe so the engine starts processing
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(OcrError::EngineFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(split_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<String>, OcrError> {
        tokio::time::timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| OcrError::TimedOut(self.timeout))?
    }
}

/// Splits engine output into lines, keeping their order
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Converts a board image to an upscaled grayscale PNG
pub fn normalize_image(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let gray = img.grayscale().resize_exact(
        img.width() * UPSCALE_FACTOR,
        img.height() * UPSCALE_FACTOR,
        FilterType::CatmullRom,
    );

    let mut out = Vec::new();
    gray.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                Rgb([200, 30, 30])
            } else {
                Rgb([20, 20, 200])
            }
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_normalize_upscales_and_grays() {
        let normalized = normalize_image(&sample_png(8, 4)).unwrap();

        let decoded = image::load_from_memory(&normalized).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.color().channel_count() <= 2, "expected a gray image");
    }

    #[test]
    fn test_normalize_rejects_non_images() {
        assert!(normalize_image(b"definitely not a png").is_err());
    }

    #[test]
    fn test_split_lines_keeps_order_and_blank_lines() {
        let lines = split_lines("Tango Utrecht\n\nEuro 95 1,859\r\nDiesel 1.649\n");
        assert_eq!(
            lines,
            vec!["Tango Utrecht", "", "Euro 95 1,859", "Diesel 1.649"]
        );
    }

    #[test]
    fn test_tesseract_args() {
        let engine = TesseractOcr::new("tesseract", Some("nld".to_string()), DEFAULT_OCR_TIMEOUT);
        assert_eq!(engine.args(), vec!["stdin", "stdout", "-l", "nld"]);

        let engine = TesseractOcr::new("tesseract", None, DEFAULT_OCR_TIMEOUT);
        assert_eq!(engine.args(), vec!["stdin", "stdout"]);
    }

    #[tokio::test]
    async fn test_missing_engine_binary_is_an_error() {
        let engine = TesseractOcr::new(
            "gasprice-no-such-ocr-engine",
            None,
            DEFAULT_OCR_TIMEOUT,
        );

        let result = engine.recognize(&sample_png(2, 2)).await;

        assert!(matches!(result, Err(OcrError::Io(_))));
    }
}
