//! Object detection and crop classification over HTTP model services

use crate::error::{EdutopiaError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

/// One detection in frame pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub class_name: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Label assigned to a saved crop by the second model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectionBox>>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, crop: &DynamicImage) -> Result<Classification>;
}

#[derive(Serialize)]
struct ImageRequest {
    /// Base64-encoded PNG
    image: String,
}

fn encode_png(image: &DynamicImage) -> Result<String> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(STANDARD.encode(buf))
}

async fn post_image<T: for<'de> Deserialize<'de>>(
    http: &reqwest::Client,
    url: &str,
    image: &DynamicImage,
    service: &str,
) -> Result<T> {
    let request = ImageRequest {
        image: encode_png(image)?,
    };
    let response = http.post(url).json(&request).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(EdutopiaError::ExternalError(format!(
            "{} service error (HTTP {}): {}",
            service, status, body
        )));
    }
    Ok(response.json().await?)
}

/// Detector backed by a model server that accepts `{"image": <base64 png>}`
/// and answers `{"detections": [...]}`
pub struct HttpDetector {
    http: reqwest::Client,
    url: String,
}

impl HttpDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectionBox>> {
        #[derive(Deserialize)]
        struct DetectResponse {
            #[serde(default)]
            detections: Vec<DetectionBox>,
        }

        let response: DetectResponse =
            post_image(&self.http, &self.url, frame, "Detection").await?;
        Ok(response.detections)
    }
}

/// Classifier backed by a model server answering `{"label", "confidence"}`
pub struct HttpClassifier {
    http: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, crop: &DynamicImage) -> Result<Classification> {
        post_image(&self.http, &self.url, crop, "Classification").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_encode_png_round_trips_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(7, 3));
        let encoded = encode_png(&image).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }

    #[test]
    fn test_detection_box_wire_format() {
        let json = r#"{"class_name":"bar_chart","confidence":0.91,"x1":1,"y1":2.5,"x2":300,"y2":240}"#;
        let det: DetectionBox = serde_json::from_str(json).unwrap();
        assert_eq!(det.class_name, "bar_chart");
        assert_eq!(det.x2, 300.0);
    }
}
