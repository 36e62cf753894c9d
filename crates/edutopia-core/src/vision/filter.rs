//! Detection filtering and per-class duplicate suppression

use super::detector::DetectionBox;
use super::phash::ImageHash;
use crate::config::VideoConfig;
use std::collections::HashMap;

/// Pixel rectangle to crop from a frame, margin included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Thresholds deciding which detections become saved crops
#[derive(Debug, Clone)]
pub struct CropFilter {
    skip_classes: Vec<String>,
    confidence_threshold: f32,
    min_resolution: i64,
    margin: i64,
    min_area: i64,
}

impl CropFilter {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            skip_classes: config
                .skip_classes
                .iter()
                .map(|c| c.to_lowercase())
                .collect(),
            confidence_threshold: config.confidence_threshold,
            min_resolution: config.min_resolution as i64,
            margin: config.margin as i64,
            min_area: config.min_area as i64,
        }
    }

    /// Crop region for a detection, or `None` if it is filtered out
    pub fn region(
        &self,
        detection: &DetectionBox,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<CropRegion> {
        if self
            .skip_classes
            .contains(&detection.class_name.to_lowercase())
        {
            return None;
        }
        if detection.confidence < self.confidence_threshold {
            return None;
        }

        let (x1, y1) = (detection.x1 as i64, detection.y1 as i64);
        let (x2, y2) = (detection.x2 as i64, detection.y2 as i64);

        // Only boxes small in both dimensions are dropped
        if x2 - x1 < self.min_resolution && y2 - y1 < self.min_resolution {
            return None;
        }

        let x1 = (x1 - self.margin).max(0);
        let y1 = (y1 - self.margin).max(0);
        let x2 = (x2 + self.margin).min(frame_width as i64);
        let y2 = (y2 + self.margin).min(frame_height as i64);

        let (width, height) = (x2 - x1, y2 - y1);
        if width <= 0 || height <= 0 || width * height < self.min_area {
            return None;
        }

        Some(CropRegion {
            x: x1 as u32,
            y: y1 as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Perceptual hashes of saved crops, grouped by class
#[derive(Debug, Default)]
pub struct HashRegistry {
    threshold: u32,
    hashes: HashMap<String, Vec<ImageHash>>,
}

impl HashRegistry {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            hashes: HashMap::new(),
        }
    }

    /// Whether a crop of the same class within the distance threshold was already saved
    pub fn is_duplicate(&self, class_name: &str, hash: &ImageHash) -> bool {
        self.hashes
            .get(class_name)
            .is_some_and(|saved| saved.iter().any(|h| h.distance(hash) < self.threshold))
    }

    /// Record a hash unless it duplicates one already saved. Returns true if recorded.
    pub fn insert_if_new(&mut self, class_name: &str, hash: ImageHash) -> bool {
        if self.is_duplicate(class_name, &hash) {
            return false;
        }
        self.hashes
            .entry(class_name.to_string())
            .or_default()
            .push(hash);
        true
    }

    pub fn len(&self) -> usize {
        self.hashes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// File name for a saved crop: `{class}_{confidence:.2}_{w}x{h}.jpg`
pub fn crop_filename(class_name: &str, confidence: f32, width: u32, height: u32) -> String {
    format!("{}_{:.2}_{}x{}.jpg", class_name, confidence, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(class: &str, conf: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> DetectionBox {
        DetectionBox {
            class_name: class.to_string(),
            confidence: conf,
            x1,
            y1,
            x2,
            y2,
        }
    }

    fn filter() -> CropFilter {
        CropFilter::from_config(&VideoConfig::default())
    }

    #[test]
    fn test_skips_legend_case_insensitively() {
        let det = detection("Legend", 0.9, 0.0, 0.0, 400.0, 400.0);
        assert_eq!(filter().region(&det, 640, 480), None);
    }

    #[test]
    fn test_small_in_both_dimensions_is_dropped() {
        let det = detection("chart", 0.9, 100.0, 100.0, 299.0, 299.0);
        assert_eq!(filter().region(&det, 640, 480), None);

        // Wide but short boxes survive
        let det = detection("chart", 0.9, 100.0, 100.0, 350.0, 150.0);
        assert!(filter().region(&det, 640, 480).is_some());
    }

    #[test]
    fn test_margin_is_clamped_to_frame() {
        let det = detection("chart", 0.5, 10.0, 20.0, 620.0, 300.0);
        let region = filter().region(&det, 640, 480).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 0,
                width: 640,
                height: 340
            }
        );
        assert_eq!(region.resolution(), "640x340");
    }

    #[test]
    fn test_confidence_threshold() {
        let mut config = VideoConfig::default();
        config.confidence_threshold = 0.5;
        let filter = CropFilter::from_config(&config);
        let det = detection("chart", 0.4, 0.0, 0.0, 400.0, 400.0);
        assert_eq!(filter.region(&det, 640, 480), None);
    }

    #[test]
    fn test_hash_registry_dedups_per_class() {
        let mut registry = HashRegistry::new(9);
        assert!(registry.insert_if_new("chart", ImageHash(0)));
        // 8 bits apart is a duplicate, 9 is not
        assert!(!registry.insert_if_new("chart", ImageHash(0xff)));
        assert!(registry.insert_if_new("chart", ImageHash(0x1ff)));
        // Same hash in another class is kept
        assert!(registry.insert_if_new("table", ImageHash(0)));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_crop_filename() {
        assert_eq!(crop_filename("bar_chart", 0.876, 320, 240), "bar_chart_0.88_320x240.jpg");
    }
}
