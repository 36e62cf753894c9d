//! Diagram extraction from lecture videos
//!
//! Frames are sampled with ffmpeg, passed to a detection model service,
//! filtered, deduplicated per class by perceptual hash and saved as JPEG
//! crops. Long-running extractions go through the [`JobRegistry`].

mod detector;
mod extractor;
mod filter;
mod frames;
mod jobs;
mod phash;

pub use detector::{
    Classification, Classifier, DetectionBox, Detector, HttpClassifier, HttpDetector,
};
pub use extractor::{DetectedObject, DiagramExtractor, Extraction};
pub use filter::{crop_filename, CropFilter, CropRegion, HashRegistry};
pub use frames::{download_video, FrameSampler};
pub use jobs::{JobRegistry, JobSnapshot, JobStatus, VideoProcessor};
pub use phash::{phash, ImageHash};
