//! Diagram extraction pipeline: sample, detect, filter, dedup, save

use super::detector::{Classification, Classifier, Detector, HttpClassifier, HttpDetector};
use super::filter::{crop_filename, CropFilter, HashRegistry};
use super::frames::{download_video, FrameSampler};
use super::phash::phash;
use crate::config::VideoConfig;
use crate::error::{EdutopiaError, Result};
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timeout for a single detector or classifier call
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// A saved crop
#[derive(Debug, Clone, Serialize)]
pub struct DetectedObject {
    pub class_name: String,
    pub confidence: f32,
    pub resolution: String,
    /// File name relative to the output directory
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub objects: Vec<DetectedObject>,
    pub object_count: usize,
    pub frames_processed: usize,
}

impl Extraction {
    pub fn message(&self) -> String {
        format!(
            "Successfully processed video and detected {} objects",
            self.object_count
        )
    }
}

pub struct DiagramExtractor {
    detector: Arc<dyn Detector>,
    classifier: Option<Arc<dyn Classifier>>,
    sampler: FrameSampler,
    filter: CropFilter,
    hash_threshold: u32,
    download_timeout: Duration,
}

impl DiagramExtractor {
    pub fn new(
        detector: Arc<dyn Detector>,
        classifier: Option<Arc<dyn Classifier>>,
        config: &VideoConfig,
    ) -> Self {
        let download_timeout = Duration::from_secs(config.download_timeout_secs);
        Self {
            detector,
            classifier,
            sampler: FrameSampler::new(
                config.ffmpeg_cmd.clone(),
                config.frame_interval_secs,
                config.frame_width,
                download_timeout,
            ),
            filter: CropFilter::from_config(config),
            hash_threshold: config.hash_threshold,
            download_timeout,
        }
    }

    /// Extractor using the HTTP detector and, if configured, classifier services
    pub fn from_config(config: &VideoConfig) -> Result<Self> {
        let detector: Arc<dyn Detector> =
            Arc::new(HttpDetector::new(config.detector_url.clone(), MODEL_TIMEOUT)?);
        let classifier = match config.classifier_url {
            Some(ref url) => {
                Some(Arc::new(HttpClassifier::new(url.clone(), MODEL_TIMEOUT)?) as Arc<dyn Classifier>)
            }
            None => None,
        };
        Ok(Self::new(detector, classifier, config))
    }

    /// Download a video into a scratch directory and extract from it
    pub async fn extract_url(
        &self,
        url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        let scratch = tempfile::tempdir()?;
        let video = scratch.path().join(format!("video_{}.mp4", uuid::Uuid::new_v4()));

        tracing::info!("Downloading video from {}", url);
        tokio::select! {
            _ = cancel.cancelled() => return Err(EdutopiaError::Cancelled),
            result = download_video(url, &video, self.download_timeout) => { result?; }
        }

        self.extract(&video, output_dir, cancel).await
    }

    /// Extract diagram crops from a local video into `output_dir`
    pub async fn extract(
        &self,
        video: &Path,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        tokio::fs::create_dir_all(output_dir).await?;
        let frames_dir = tempfile::tempdir()?;
        let frames = self.sampler.sample(video, frames_dir.path()).await?;

        let mut registry = HashRegistry::new(self.hash_threshold);
        let mut objects = Vec::new();

        for frame_path in &frames {
            if cancel.is_cancelled() {
                return Err(EdutopiaError::Cancelled);
            }
            let path = frame_path.clone();
            let frame = tokio::task::spawn_blocking(move || image::open(path))
                .await
                .map_err(|e| EdutopiaError::Other(e.into()))??;
            self.process_frame(&frame, output_dir, &mut registry, &mut objects)
                .await?;
        }

        tracing::info!(
            "Processed {} frames, detected {} objects",
            frames.len(),
            objects.len()
        );
        Ok(Extraction {
            object_count: objects.len(),
            frames_processed: frames.len(),
            objects,
        })
    }

    async fn process_frame(
        &self,
        frame: &DynamicImage,
        output_dir: &Path,
        registry: &mut HashRegistry,
        objects: &mut Vec<DetectedObject>,
    ) -> Result<()> {
        let detections = self.detector.detect(frame).await?;
        tracing::debug!("{} detections in frame", detections.len());

        for detection in &detections {
            let Some(region) = self.filter.region(detection, frame.width(), frame.height()) else {
                continue;
            };

            let crop = frame.crop_imm(region.x, region.y, region.width, region.height);
            if !registry.insert_if_new(&detection.class_name, phash(&crop)) {
                continue;
            }

            let filename = crop_filename(
                &detection.class_name,
                detection.confidence,
                region.width,
                region.height,
            );
            crop.to_rgb8().save(output_dir.join(&filename))?;

            let classification = match self.classifier {
                Some(ref classifier) => match classifier.classify(&crop).await {
                    Ok(c) => Some(c),
                    Err(e) => {
                        tracing::warn!("Failed to classify {}: {}", filename, e);
                        None
                    }
                },
                None => None,
            };

            objects.push(DetectedObject {
                class_name: detection.class_name.clone(),
                confidence: detection.confidence,
                resolution: region.resolution(),
                file_path: filename,
                classification,
            });
        }
        Ok(())
    }

    /// Run detection on already decoded frames
    pub async fn extract_frames(
        &self,
        frames: &[DynamicImage],
        output_dir: &Path,
    ) -> Result<Extraction> {
        tokio::fs::create_dir_all(output_dir).await?;
        let mut registry = HashRegistry::new(self.hash_threshold);
        let mut objects = Vec::new();

        for frame in frames {
            self.process_frame(frame, output_dir, &mut registry, &mut objects)
                .await?;
        }

        Ok(Extraction {
            object_count: objects.len(),
            frames_processed: frames.len(),
            objects,
        })
    }
}
