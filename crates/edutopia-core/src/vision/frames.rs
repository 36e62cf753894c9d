//! Video download and frame sampling

use crate::command;
use crate::error::{EdutopiaError, Result};
use futures::StreamExt;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Extracts one frame per interval with ffmpeg, scaled to a fixed width
#[derive(Debug, Clone)]
pub struct FrameSampler {
    ffmpeg: String,
    interval_secs: u32,
    width: u32,
    timeout: Duration,
}

impl FrameSampler {
    pub fn new(ffmpeg: impl Into<String>, interval_secs: u32, width: u32, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            interval_secs: interval_secs.max(1),
            width,
            timeout,
        }
    }

    /// Write sampled frames as PNG files into `dir`, returning them in time order
    pub async fn sample(&self, video: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        if !video.exists() {
            return Err(EdutopiaError::NotFound(format!(
                "Video file not found: {}",
                video.display()
            )));
        }
        tokio::fs::create_dir_all(dir).await?;

        let filter = format!("fps=1/{},scale={}:-2", self.interval_secs, self.width);
        let pattern = dir.join("frame_%06d.png");
        let args: [&OsStr; 8] = [
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-vf"),
            OsStr::new(&filter),
            pattern.as_os_str(),
        ];
        command::run(&self.ffmpeg, args, self.timeout).await?;

        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_frame = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".png"));
            if is_frame {
                frames.push(path);
            }
        }
        frames.sort();
        tracing::debug!("Sampled {} frames from {}", frames.len(), video.display());
        Ok(frames)
    }
}

/// Stream a remote video to `dest`
pub async fn download_video(url: &str, dest: &Path, timeout: Duration) -> Result<u64> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?.error_for_status()?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::info!("Downloaded {} bytes from {}", written, url);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = FrameSampler::new("ffmpeg", 10, 640, Duration::from_secs(5));
        let err = sampler
            .sample(&dir.path().join("absent.mp4"), &dir.path().join("frames"))
            .await
            .unwrap_err();
        assert!(matches!(err, EdutopiaError::NotFound(_)));
    }
}
