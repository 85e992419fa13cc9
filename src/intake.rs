//! File intake: MIME/size validation and off-thread decoding of selected
//! images into previews.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui;
use image::RgbaImage;

use crate::edit::Ticket;
use crate::error::{CaptureError, Result};

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Where the bytes of an incoming file live until it is decoded.
#[derive(Clone, Debug)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// A file offered to a slot by the picker or a drop, not yet validated.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub source: FileSource,
}

impl IncomingFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| CaptureError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            mime: mime_for_name(&name).to_owned(),
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, mime: Option<&str>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime = match mime {
            Some(m) if !m.is_empty() => m.to_owned(),
            _ => mime_for_name(&name).to_owned(),
        };
        Self {
            name,
            mime,
            size: bytes.len() as u64,
            source: FileSource::Bytes(bytes),
        }
    }

    /// Normalizes a dropped file into the picker path. Drops carrying neither
    /// a path nor bytes are ignored.
    pub fn from_dropped(file: &egui::DroppedFile) -> Option<Result<Self>> {
        if let Some(path) = &file.path {
            let mut incoming = match Self::from_path(path) {
                Ok(incoming) => incoming,
                Err(e) => return Some(Err(e)),
            };
            if !file.mime.is_empty() {
                incoming.mime = file.mime.clone();
            }
            return Some(Ok(incoming));
        }
        file.bytes
            .as_ref()
            .map(|bytes| Ok(Self::from_bytes(file.name.clone(), Some(&file.mime), bytes.clone())))
    }

    pub fn read(&self) -> Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => std::fs::read(path)
                .map(Arc::from)
                .map_err(|e| CaptureError::io(path, e)),
        }
    }
}

pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Human-readable size: bytes, then KB/MB with one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

pub fn validate(file: &IncomingFile, max_bytes: u64) -> Result<()> {
    let mime = file.mime.to_ascii_lowercase();
    if !ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(CaptureError::InvalidFileType {
            name: file.name.clone(),
            mime: file.mime.clone(),
        });
    }
    if file.size > max_bytes {
        return Err(CaptureError::FileTooLarge {
            name: file.name.clone(),
            size: format_size(file.size),
            limit: format_size(max_bytes),
        });
    }
    Ok(())
}

/// Where the files of one drop end up.
#[derive(Debug, Default)]
pub struct DropPlan {
    pub assigned: Vec<(usize, IncomingFile)>,
    pub rejected: Vec<CaptureError>,
    /// Valid files left over once every free slot is taken.
    pub unplaced: Vec<IncomingFile>,
}

/// Routes a multi-file drop. The first accepted file goes to `selected`, the
/// following ones to `free` slots in order; rejected files never use up a
/// slot.
pub fn route_drop(
    files: impl IntoIterator<Item = Result<IncomingFile>>,
    max_bytes: u64,
    selected: usize,
    free: &[usize],
) -> DropPlan {
    let mut targets = std::iter::once(selected).chain(free.iter().copied().filter(|&i| i != selected));
    let mut plan = DropPlan::default();
    for file in files {
        let file = match file.and_then(|f| validate(&f, max_bytes).map(|()| f)) {
            Ok(file) => file,
            Err(e) => {
                plan.rejected.push(e);
                continue;
            }
        };
        match targets.next() {
            Some(index) => plan.assigned.push((index, file)),
            None => plan.unplaced.push(file),
        }
    }
    plan
}

/// Raw bytes a slot holds; replaced wholesale on every selection or commit.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Decoded raster shown to the user. Equality compares pixels.
#[derive(Clone, Debug)]
pub struct Preview {
    pub image: Arc<RgbaImage>,
}

impl Preview {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| CaptureError::Decode {
            name: name.to_owned(),
            source,
        })?;
        Ok(Self::new(image.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl PartialEq for Preview {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
            || (self.image.dimensions() == other.image.dimensions()
                && self.image.as_raw() == other.image.as_raw())
    }
}

#[derive(Debug)]
pub struct Decoded {
    pub source: SourceFile,
    pub preview: Preview,
}

/// Decoding work for an accepted file, run off the UI thread.
#[derive(Debug)]
pub struct DecodeJob {
    pub ticket: Ticket,
    pub file: IncomingFile,
}

impl DecodeJob {
    pub fn run(self) -> (Ticket, Result<Decoded>) {
        let result = self.file.read().and_then(|bytes| {
            let preview = Preview::decode(&self.file.name, &bytes)?;
            Ok(Decoded {
                source: SourceFile {
                    name: self.file.name.clone(),
                    mime: self.file.mime.clone(),
                    bytes,
                },
                preview,
            })
        });
        (self.ticket, result)
    }
}
