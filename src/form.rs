use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::edit::FieldUpdate;
use crate::error::{CaptureError, Result};
use crate::intake::{SourceFile, format_size};
use crate::slot::SlotKind;

/// Named field values of the surrounding intake form.
#[derive(Debug, Default)]
pub struct FormFields {
    values: BTreeMap<SlotKind, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, slot: SlotKind, update: FieldUpdate) {
        match update {
            FieldUpdate::Set(name) => {
                self.values.insert(slot, name);
            }
            FieldUpdate::Clear => {
                self.values.insert(slot, String::new());
            }
        }
    }

    pub fn value(&self, slot: SlotKind) -> &str {
        self.values.get(&slot).map(String::as_str).unwrap_or("")
    }

    pub fn missing_required(&self) -> Vec<SlotKind> {
        SlotKind::ALL
            .into_iter()
            .filter(|kind| kind.required() && self.value(*kind).is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingAttachment {
    pub slot: SlotKind,
    pub file: SourceFile,
}

impl PendingAttachment {
    pub fn size_label(&self) -> String {
        format_size(self.file.size())
    }
}

/// Files waiting to be saved, grouped by attachment category.
#[derive(Debug, Default)]
pub struct PendingAttachments {
    groups: Vec<(&'static str, Vec<PendingAttachment>)>,
}

impl PendingAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, files)| files.len()).sum()
    }

    pub fn groups(&self) -> &[(&'static str, Vec<PendingAttachment>)] {
        &self.groups
    }

    /// Files the slot attached earlier are replaced, not duplicated.
    pub fn attach(&mut self, slot: SlotKind, file: SourceFile) {
        self.detach_slot(slot);
        let category = slot.category();
        let attachment = PendingAttachment { slot, file };
        match self.groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, files)) => files.push(attachment),
            None => self.groups.push((category, vec![attachment])),
        }
    }

    pub fn detach_slot(&mut self, slot: SlotKind) {
        for (_, files) in &mut self.groups {
            files.retain(|a| a.slot != slot);
        }
        self.groups.retain(|(_, files)| !files.is_empty());
    }

    /// Removes one file; an emptied category disappears with it.
    pub fn remove(&mut self, group: usize, index: usize) -> Option<PendingAttachment> {
        let (_, files) = self.groups.get_mut(group)?;
        if index >= files.len() {
            return None;
        }
        let removed = files.remove(index);
        if files.is_empty() {
            self.groups.remove(group);
        }
        Some(removed)
    }

    /// Writes every pending file into `dir` as `<field>_<name>`.
    pub fn save_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| CaptureError::io(dir, e))?;
        let mut written = Vec::with_capacity(self.len());
        for (_, files) in &self.groups {
            for attachment in files {
                let path = dir.join(file_name_for(attachment));
                std::fs::write(&path, &attachment.file.bytes).map_err(|e| CaptureError::io(&path, e))?;
                tracing::info!(path = %path.display(), size = attachment.file.size(), "saved attachment");
                written.push(path);
            }
        }
        Ok(written)
    }
}

fn file_name_for(attachment: &PendingAttachment) -> String {
    let stem = Path::new(&attachment.file.name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    let ext = match attachment.file.mime.as_str() {
        "image/png" => "png",
        _ => "jpg",
    };
    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}_{}.{}", attachment.slot.field(), stem, ext)
}
