use crate::foundation::core::{FrameIndex, FramePlan};
use crate::foundation::error::{FrameclockError, FrameclockResult};
use anyhow::Context as _;
use sha2::Digest as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// printf-style pattern of frame files, as handed to the encoder.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Name of the manifest written next to the frames.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of frame `idx` (`frame_000042.png`).
pub fn frame_file_name(idx: FrameIndex) -> String {
    format!("frame_{:06}.png", idx.0)
}

/// One persisted frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRecord {
    pub index: u64,
    /// Virtual time the frame was sampled at.
    pub t_ms: f64,
    pub file: String,
    pub sha256: String,
}

/// Description of a completed frame sequence.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameManifest {
    pub fps: u32,
    pub duration_ms: u64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<FrameRecord>,
}

impl FrameManifest {
    pub fn read(dir: &Path) -> FrameclockResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FrameclockError::serde(format!("decode '{}': {e}", path.display())))
    }
}

/// Writes numbered PNG frames into a directory.
///
/// Frames must arrive in index order starting at 0. Each file appears atomically (temp file in
/// the same directory, then rename), so a reader never sees a partially written frame.
#[derive(Debug)]
pub struct FrameWriter {
    dir: PathBuf,
    plan: FramePlan,
    records: Vec<FrameRecord>,
    size: Option<(u32, u32)>,
}

impl FrameWriter {
    /// Create (or reuse) `dir`, removing frames and manifest left by an earlier run.
    pub fn create(dir: impl Into<PathBuf>, plan: FramePlan) -> FrameclockResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create frames directory '{}'", dir.display()))?;

        let mut stale = 0usize;
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list '{}'", dir.display()))?
        {
            let entry = entry.context("failed to read directory entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_frame_file(&name) || name == MANIFEST_FILE {
                std::fs::remove_file(entry.path()).with_context(|| {
                    format!("failed to remove stale '{}'", entry.path().display())
                })?;
                stale += 1;
            }
        }
        if stale > 0 {
            tracing::debug!(stale, dir = %dir.display(), "removed stale frames");
        }

        Ok(Self {
            dir,
            plan,
            records: Vec::new(),
            size: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full printf-style path pattern for the encoder.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(FRAME_PATTERN)
    }

    pub fn written(&self) -> usize {
        self.records.len()
    }

    /// Pixel size of the frames written so far.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Persist one PNG frame.
    pub fn write_frame(
        &mut self,
        idx: FrameIndex,
        t_ms: f64,
        png: &[u8],
    ) -> FrameclockResult<PathBuf> {
        let expected = self.records.len() as u64;
        if idx.0 != expected {
            return Err(FrameclockError::capture(format!(
                "frame {} written out of order (expected {expected})",
                idx.0
            )));
        }

        let dims = image::ImageReader::with_format(std::io::Cursor::new(png), image::ImageFormat::Png)
            .into_dimensions()
            .map_err(|e| FrameclockError::capture(format!("frame {} is not a PNG: {e}", idx.0)))?;
        match self.size {
            None => self.size = Some(dims),
            Some(size) if size != dims => {
                return Err(FrameclockError::capture(format!(
                    "frame {} is {}x{}, earlier frames are {}x{}",
                    idx.0, dims.0, dims.1, size.0, size.1
                )));
            }
            Some(_) => {}
        }

        let file = frame_file_name(idx);
        let path = self.dir.join(&file);
        write_atomic(&self.dir, &path, png)?;

        self.records.push(FrameRecord {
            index: idx.0,
            t_ms,
            file,
            sha256: sha256_hex(png),
        });
        Ok(path)
    }

    /// Check the sequence is complete and write the manifest.
    pub fn finish(self) -> FrameclockResult<FrameManifest> {
        let frame_count = self.records.len() as u64;
        if frame_count != self.plan.total_frames() {
            return Err(FrameclockError::capture(format!(
                "incomplete frame sequence: {frame_count} of {} frames",
                self.plan.total_frames()
            )));
        }
        let (width, height) = self.size.unwrap_or((0, 0));
        let manifest = FrameManifest {
            fps: self.plan.fps,
            duration_ms: self.plan.duration_ms,
            frame_count,
            width,
            height,
            frames: self.records,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| FrameclockError::serde(format!("encode manifest: {e}")))?;
        write_atomic(&self.dir, &self.dir.join(MANIFEST_FILE), &json)?;
        Ok(manifest)
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> FrameclockResult<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in '{}'", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    tmp.persist(path)
        .map_err(|e| FrameclockError::capture(format!("persist '{}': {e}", path.display())))?;
    Ok(())
}

fn is_frame_file(name: &str) -> bool {
    name.strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/capture/frames.rs"]
mod tests;
