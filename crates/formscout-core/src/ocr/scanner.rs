//! Image text recognizer: OCR over every embedded image, within a budget.

use std::time::{Duration, Instant};

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use super::TextRecognizer;
use crate::models::config::OcrConfig;
use crate::pdf::PageSource;

/// Result of scanning a document's images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Recognized text, images in page order.
    pub text: String,
    /// Images handed to the recognizer.
    pub images_processed: usize,
    /// Images or pages skipped because of an error.
    pub errors: Vec<String>,
    /// The scan stopped early because the image or time budget ran out.
    pub partial: bool,
}

/// Runs a borrowed recognizer over the images of every page.
pub struct ImageTextScanner<'a> {
    recognizer: &'a dyn TextRecognizer,
    max_images: usize,
    max_image_size: u32,
    time_budget: Duration,
    annotate: bool,
}

impl<'a> ImageTextScanner<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer, config: &OcrConfig) -> Self {
        Self {
            recognizer,
            max_images: config.max_images,
            max_image_size: config.max_image_size,
            time_budget: Duration::from_millis(config.time_budget_ms),
            annotate: config.annotate_images,
        }
    }

    /// Recognize text in every embedded image of the document.
    ///
    /// A failure on one image or page is recorded and skipped. The budget is
    /// checked between images: a running recognition is never interrupted.
    pub fn scan(&self, source: &dyn PageSource) -> ScanOutcome {
        let start = Instant::now();
        let mut outcome = ScanOutcome::default();
        let mut chunks: Vec<String> = Vec::new();

        'pages: for page in 0..source.page_count() {
            let images = match source.page_images(page) {
                Ok(images) => images,
                Err(e) => {
                    warn!("Failed to extract images from page {}: {}", page, e);
                    outcome.errors.push(format!("page {}: {}", page, e));
                    continue;
                }
            };

            for (index, image) in images.iter().enumerate() {
                if outcome.images_processed >= self.max_images {
                    warn!("Image limit of {} reached, stopping OCR", self.max_images);
                    outcome.partial = true;
                    break 'pages;
                }
                if start.elapsed() >= self.time_budget {
                    warn!(
                        "OCR time budget of {}ms exhausted, stopping",
                        self.time_budget.as_millis()
                    );
                    outcome.partial = true;
                    break 'pages;
                }

                outcome.images_processed += 1;
                let image = self.fit(image);

                match self.recognizer.recognize(&image) {
                    Ok(text) if !text.trim().is_empty() => {
                        if self.annotate {
                            chunks.push(format!(
                                "--- page {}, image {} ---\n{}",
                                page + 1,
                                index + 1,
                                text.trim()
                            ));
                        } else {
                            chunks.push(text.trim().to_string());
                        }
                    }
                    Ok(_) => debug!("No text detected in page {} image {}", page, index),
                    Err(e) => {
                        warn!("OCR failed for page {} image {}: {}", page, index, e);
                        outcome.errors.push(format!("page {} image {}: {}", page, index, e));
                    }
                }
            }
        }

        outcome.text = chunks.join("\n\n");
        info!(
            "OCR scanned {} images in {}ms ({} chars, {} errors{})",
            outcome.images_processed,
            start.elapsed().as_millis(),
            outcome.text.len(),
            outcome.errors.len(),
            if outcome.partial { ", partial" } else { "" }
        );
        outcome
    }

    /// Downscale so the longer side fits `max_image_size`.
    fn fit(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        if width.max(height) <= self.max_image_size {
            return image.clone();
        }
        debug!(
            "Downscaling {}x{} image to fit {}",
            width, height, self.max_image_size
        );
        image.resize(
            self.max_image_size,
            self.max_image_size,
            image::imageops::FilterType::Triangle,
        )
    }
}
