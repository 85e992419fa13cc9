//! Per-slot edit state: the selected file, its preview, rotate/zoom/pan and
//! the crop state machine.
//!
//! Gestures are modelled as one [`Mode`] so panning and crop-resizing can
//! never overlap, and a crop in progress always carries the snapshot it
//! reverts to. Decode and commit results come back asynchronously and are
//! matched against the slot's generation through a [`Ticket`]; anything that
//! resolves after a reset or a newer selection is dropped.

use eframe::egui;

use crate::error::Result;
use crate::geometry::{CropRect, Handle};
use crate::intake::{self, DecodeJob, Decoded, IncomingFile, Preview, SourceFile};
use crate::raster::{CommitJob, Committed, Transform};
use crate::slot::{SlotKind, SlotProfile};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const WHEEL_STEP: f32 = 0.1;

/// Identifies which selection an async result belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub slot: SlotKind,
    pub generation: u64,
}

/// What the pre-crop state looked like, restored on cancel.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub preview: Preview,
    pub crop: CropRect,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Mode {
    #[default]
    Idle,
    Panning {
        last: egui::Pos2,
    },
    CroppingIdle {
        snapshot: Snapshot,
    },
    CroppingDragging {
        snapshot: Snapshot,
        handle: Handle,
        last: egui::Pos2,
    },
    /// Crop confirmed; waiting for the rendered JPEG.
    Committing {
        snapshot: Snapshot,
    },
}

/// Limits applied by the transform controls and intake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditLimits {
    pub min_scale: f32,
    pub max_scale: f32,
    pub wheel_step: f32,
    pub max_file_bytes: u64,
    pub jpeg_quality: u8,
}

impl Default for EditLimits {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_step: WHEEL_STEP,
            max_file_bytes: intake::MAX_FILE_BYTES,
            jpeg_quality: crate::raster::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Form-field effect of a state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    Set(String),
    Clear,
}

pub struct ImageSlot {
    profile: SlotProfile,
    limits: EditLimits,
    generation: u64,
    source: Option<SourceFile>,
    preview: Option<Preview>,
    scale: f32,
    rotation: u16,
    pan: egui::Vec2,
    crop: CropRect,
    mode: Mode,
    /// Decode requested and not yet applied.
    loading: bool,
}

impl ImageSlot {
    pub fn new(profile: SlotProfile, limits: EditLimits) -> Self {
        Self {
            profile,
            limits,
            generation: 0,
            source: None,
            preview: None,
            scale: 1.0,
            rotation: 0,
            pan: egui::Vec2::ZERO,
            crop: profile.default_crop,
            mode: Mode::Idle,
            loading: false,
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.profile.kind
    }

    pub fn limits(&self) -> &EditLimits {
        &self.limits
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn pan(&self) -> egui::Vec2 {
        self.pan
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_cropping(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.mode, Mode::Committing { .. })
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.mode {
            Mode::CroppingIdle { snapshot }
            | Mode::CroppingDragging { snapshot, .. }
            | Mode::Committing { snapshot } => Some(snapshot),
            Mode::Idle | Mode::Panning { .. } => None,
        }
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            slot: self.profile.kind,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket == self.ticket()
    }

    // ---- intake ----

    /// Validates a new file and hands back the decode job. A rejected file
    /// leaves the slot untouched.
    pub fn select(&mut self, file: IncomingFile) -> Result<DecodeJob> {
        if let Err(e) = intake::validate(&file, self.limits.max_file_bytes) {
            tracing::warn!(slot = self.profile.kind.field(), error = %e, "rejected file");
            return Err(e);
        }
        self.generation += 1;
        self.loading = true;
        tracing::info!(
            slot = self.profile.kind.field(),
            file = %file.name,
            size = file.size,
            "accepted file, decoding"
        );
        Ok(DecodeJob {
            ticket: self.ticket(),
            file,
        })
    }

    /// Applies a finished decode. Returns the form update on success and
    /// `Ok(None)` when the result is stale.
    pub fn apply_decoded(&mut self, ticket: Ticket, result: Result<Decoded>) -> Result<Option<FieldUpdate>> {
        if !self.is_current(ticket) {
            tracing::debug!(slot = self.profile.kind.field(), ?ticket, "dropping stale decode");
            return Ok(None);
        }
        self.loading = false;
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                // The newer ticket already orphaned any commit in flight
                self.mode = match std::mem::take(&mut self.mode) {
                    Mode::Committing { snapshot } => Mode::CroppingIdle { snapshot },
                    other => other,
                };
                return Err(e);
            }
        };
        let name = decoded.source.name.clone();
        self.source = Some(decoded.source);
        self.preview = Some(decoded.preview);
        self.reset_view();
        Ok(Some(FieldUpdate::Set(name)))
    }

    fn reset_view(&mut self) {
        self.scale = 1.0;
        self.rotation = 0;
        self.pan = egui::Vec2::ZERO;
        self.crop = self.profile.default_crop;
        self.mode = Mode::Idle;
    }

    /// Back to the empty state the slot started in.
    pub fn remove(&mut self) -> FieldUpdate {
        self.generation += 1;
        self.loading = false;
        self.source = None;
        self.preview = None;
        self.reset_view();
        tracing::info!(slot = self.profile.kind.field(), "slot cleared");
        FieldUpdate::Clear
    }

    // ---- transform controls ----

    pub fn rotate(&mut self) {
        self.rotation = (self.rotation + 90) % 360;
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.set_zoom(self.scale + delta);
    }

    pub fn set_zoom(&mut self, scale: f32) {
        if scale.is_nan() {
            return;
        }
        self.scale = scale.clamp(self.limits.min_scale, self.limits.max_scale);
    }

    /// One zoom step in the direction of `direction`'s sign.
    pub fn step_zoom(&mut self, direction: f32) {
        if direction != 0.0 {
            self.zoom_by(self.limits.wheel_step * direction.signum());
        }
    }

    /// One wheel notch; the sign of `steps` picks the direction.
    pub fn wheel(&mut self, steps: f32) {
        self.step_zoom(steps);
    }

    // ---- panning ----

    pub fn begin_pan(&mut self, pos: egui::Pos2) -> bool {
        if self.preview.is_none() || !matches!(self.mode, Mode::Idle) {
            return false;
        }
        self.mode = Mode::Panning { last: pos };
        true
    }

    pub fn pan_to(&mut self, pos: egui::Pos2) {
        if let Mode::Panning { last } = &mut self.mode {
            self.pan += pos - *last;
            *last = pos;
        }
    }

    pub fn end_pan(&mut self) {
        if matches!(self.mode, Mode::Panning { .. }) {
            self.mode = Mode::Idle;
        }
    }

    // ---- crop editor ----

    pub fn begin_crop(&mut self) -> bool {
        let Some(preview) = &self.preview else {
            return false;
        };
        if !matches!(self.mode, Mode::Idle | Mode::Panning { .. }) {
            return false;
        }
        self.mode = Mode::CroppingIdle {
            snapshot: Snapshot {
                preview: preview.clone(),
                crop: self.crop,
            },
        };
        true
    }

    /// Starts a resize from `handle`; `pos` is in image pixels.
    pub fn begin_handle_drag(&mut self, handle: Handle, pos: egui::Pos2) -> bool {
        match std::mem::take(&mut self.mode) {
            Mode::CroppingIdle { snapshot } => {
                tracing::trace!(slot = self.profile.kind.field(), handle = handle.short_name(), "resize started");
                self.mode = Mode::CroppingDragging {
                    snapshot,
                    handle,
                    last: pos,
                };
                true
            }
            other => {
                self.mode = other;
                false
            }
        }
    }

    /// Resizes by the movement since the previous point, then advances the
    /// anchor so the drag stays relative.
    pub fn drag_to(&mut self, pos: egui::Pos2) {
        if let Mode::CroppingDragging { handle, last, .. } = &mut self.mode {
            let delta = pos - *last;
            self.crop.resize(*handle, delta, &self.profile.constraints);
            *last = pos;
        }
    }

    pub fn end_handle_drag(&mut self) {
        match std::mem::take(&mut self.mode) {
            Mode::CroppingDragging { snapshot, .. } => self.mode = Mode::CroppingIdle { snapshot },
            other => self.mode = other,
        }
    }

    pub fn cancel_crop(&mut self) {
        match std::mem::take(&mut self.mode) {
            Mode::CroppingIdle { snapshot } | Mode::CroppingDragging { snapshot, .. } => {
                self.preview = Some(snapshot.preview);
                self.crop = snapshot.crop;
                tracing::debug!(slot = self.profile.kind.field(), "crop cancelled");
            }
            other => self.mode = other,
        }
    }

    /// Starts the commit of the current crop. `None` when there is nothing
    /// to commit (no file, no preview, or not cropping).
    pub fn confirm_crop(&mut self) -> Option<CommitJob> {
        let (Some(source), Some(preview)) = (&self.source, &self.preview) else {
            return None;
        };
        let name = source.name.clone();
        let image = preview.image.clone();
        let snapshot = match std::mem::take(&mut self.mode) {
            Mode::CroppingIdle { snapshot } | Mode::CroppingDragging { snapshot, .. } => snapshot,
            other => {
                self.mode = other;
                return None;
            }
        };
        self.mode = Mode::Committing { snapshot };
        tracing::info!(
            slot = self.profile.kind.field(),
            crop = ?self.crop,
            rotation = self.rotation,
            scale = self.scale,
            "committing crop"
        );
        Some(CommitJob {
            ticket: self.ticket(),
            name,
            source: image,
            crop: self.crop,
            transform: Transform {
                rotation_degrees: self.rotation,
                scale: self.scale,
            },
            quality: self.limits.jpeg_quality,
        })
    }

    /// Applies a finished commit. On failure the slot goes back to cropping
    /// with its snapshot intact.
    pub fn apply_commit(&mut self, ticket: Ticket, result: Result<Committed>) -> Result<Option<FieldUpdate>> {
        if !self.is_current(ticket) || !self.is_committing() {
            tracing::debug!(slot = self.profile.kind.field(), ?ticket, "dropping stale commit");
            return Ok(None);
        }
        let snapshot = match std::mem::take(&mut self.mode) {
            Mode::Committing { snapshot } => snapshot,
            other => {
                self.mode = other;
                return Ok(None);
            }
        };
        match result {
            Ok(committed) => {
                let name = committed.file.name.clone();
                tracing::info!(
                    slot = self.profile.kind.field(),
                    file = %name,
                    width = committed.preview.width(),
                    height = committed.preview.height(),
                    "crop committed"
                );
                self.source = Some(committed.file);
                self.preview = Some(committed.preview);
                self.reset_view();
                Ok(Some(FieldUpdate::Set(name)))
            }
            Err(e) => {
                self.mode = Mode::CroppingIdle { snapshot };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptureError;
    use crate::intake::tests::{jpeg_bytes, png_bytes};
    use proptest::prelude::*;

    fn slot(kind: SlotKind) -> ImageSlot {
        ImageSlot::new(kind.profile(), EditLimits::default())
    }

    fn loaded(kind: SlotKind, width: u32, height: u32) -> ImageSlot {
        let mut slot = slot(kind);
        let job = slot
            .select(IncomingFile::from_bytes("doc.png", None, png_bytes(width, height)))
            .unwrap();
        let (ticket, result) = job.run();
        slot.apply_decoded(ticket, result).unwrap();
        slot
    }

    fn commit(slot: &mut ImageSlot) -> Result<Option<FieldUpdate>> {
        let job = slot.confirm_crop().expect("commit job");
        let (ticket, result) = job.run();
        slot.apply_commit(ticket, result)
    }

    #[test]
    fn new_slot_is_empty() {
        let slot = slot(SlotKind::IdCardFront);
        assert!(slot.preview().is_none());
        assert!(slot.source().is_none());
        assert_eq!(slot.scale(), 1.0);
        assert_eq!(slot.rotation(), 0);
        assert_eq!(slot.crop(), SlotKind::IdCardFront.profile().default_crop);
        assert!(!slot.is_cropping());
    }

    #[test]
    fn text_file_is_rejected_without_mutation() {
        let mut slot = loaded(SlotKind::IdCardFront, 32, 32);
        let before = slot.preview().cloned();
        let err = slot
            .select(IncomingFile::from_bytes("notes.txt", Some("text/plain"), b"hi".to_vec()))
            .err()
            .unwrap();
        assert!(matches!(err, CaptureError::InvalidFileType { .. }));
        assert_eq!(slot.preview().cloned(), before);
        assert!(!slot.is_loading());
    }

    #[test]
    fn oversize_jpeg_is_rejected() {
        let mut slot = slot(SlotKind::IdCardBack);
        let file = IncomingFile::from_bytes("huge.jpg", None, vec![0u8; 11 * 1024 * 1024]);
        assert!(matches!(slot.select(file), Err(CaptureError::FileTooLarge { .. })));
        assert!(slot.preview().is_none());
    }

    #[test]
    fn nine_mebibyte_jpeg_is_accepted() {
        let mut slot = slot(SlotKind::IdCardBack);
        // Trailing bytes after the end-of-image marker are ignored by decoders
        let mut bytes = jpeg_bytes(64, 48);
        bytes.resize(9 * 1024 * 1024, 0);
        let job = slot
            .select(IncomingFile::from_bytes("back.jpg", None, bytes))
            .unwrap();
        let (ticket, result) = job.run();
        let update = slot.apply_decoded(ticket, result).unwrap();
        assert_eq!(update, Some(FieldUpdate::Set("back.jpg".into())));
        assert!(slot.preview().is_some());
    }

    #[test]
    fn selection_resets_view() {
        let mut slot = loaded(SlotKind::GuardianId, 100, 100);
        slot.rotate();
        slot.zoom_by(1.0);
        slot.begin_crop();
        let job = slot
            .select(IncomingFile::from_bytes("next.png", None, png_bytes(20, 20)))
            .unwrap();
        let (ticket, result) = job.run();
        slot.apply_decoded(ticket, result).unwrap();
        assert_eq!(slot.scale(), 1.0);
        assert_eq!(slot.rotation(), 0);
        assert!(!slot.is_cropping());
        assert_eq!(slot.crop(), SlotKind::GuardianId.profile().default_crop);
    }

    #[test]
    fn stale_decode_after_remove_is_dropped() {
        let mut slot = slot(SlotKind::PoliceReport);
        let job = slot
            .select(IncomingFile::from_bytes("report.png", None, png_bytes(10, 10)))
            .unwrap();
        assert_eq!(slot.remove(), FieldUpdate::Clear);
        let (ticket, result) = job.run();
        assert_eq!(slot.apply_decoded(ticket, result).unwrap(), None);
        assert!(slot.preview().is_none());
    }

    #[test]
    fn older_selection_cannot_overwrite_newer() {
        let mut slot = slot(SlotKind::OldDocument);
        let first = slot
            .select(IncomingFile::from_bytes("old.png", None, png_bytes(10, 10)))
            .unwrap();
        let second = slot
            .select(IncomingFile::from_bytes("new.png", None, png_bytes(12, 12)))
            .unwrap();
        let (t2, r2) = second.run();
        slot.apply_decoded(t2, r2).unwrap();
        let (t1, r1) = first.run();
        assert_eq!(slot.apply_decoded(t1, r1).unwrap(), None);
        assert_eq!(slot.source().unwrap().name, "new.png");
    }

    #[test]
    fn rotation_wraps() {
        let mut slot = slot(SlotKind::IdCardFront);
        let expected = [90, 180, 270, 0];
        for want in expected {
            slot.rotate();
            assert_eq!(slot.rotation(), want);
        }
    }

    #[test]
    fn rotation_leaves_crop_alone() {
        let mut slot = loaded(SlotKind::IdCardFront, 50, 50);
        let crop = slot.crop();
        slot.rotate();
        assert_eq!(slot.crop(), crop);
    }

    #[test]
    fn wheel_steps_by_a_tenth() {
        let mut slot = slot(SlotKind::IdCardFront);
        slot.wheel(3.0);
        assert!((slot.scale() - 1.1).abs() < 1e-6);
        slot.wheel(-1.0);
        slot.wheel(-1.0);
        assert!((slot.scale() - 0.9).abs() < 1e-6);
        slot.wheel(0.0);
        assert!((slot.scale() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped_not_rejected() {
        let mut slot = slot(SlotKind::IdCardFront);
        slot.set_zoom(10.0);
        assert_eq!(slot.scale(), MAX_SCALE);
        slot.zoom_by(-100.0);
        assert_eq!(slot.scale(), MIN_SCALE);
        slot.set_zoom(f32::NAN);
        assert_eq!(slot.scale(), MIN_SCALE);
    }

    #[test]
    fn pan_is_exclusive_with_crop() {
        let mut slot = loaded(SlotKind::IdCardFront, 50, 50);
        assert!(slot.begin_pan(egui::pos2(0.0, 0.0)));
        slot.pan_to(egui::pos2(5.0, -3.0));
        assert_eq!(slot.pan(), egui::vec2(5.0, -3.0));
        assert!(!slot.begin_handle_drag(Handle::BottomRight, egui::pos2(0.0, 0.0)));
        slot.end_pan();

        assert!(slot.begin_crop());
        assert!(!slot.begin_pan(egui::pos2(0.0, 0.0)));
        assert!(slot.begin_handle_drag(Handle::TopLeft, egui::pos2(0.0, 0.0)));
        assert!(!slot.begin_pan(egui::pos2(0.0, 0.0)));
    }

    #[test]
    fn crop_requires_preview() {
        let mut slot = slot(SlotKind::IdCardFront);
        assert!(!slot.begin_crop());
        assert!(slot.snapshot().is_none());
    }

    #[test]
    fn drag_is_relative_to_last_point() {
        let mut slot = loaded(SlotKind::HouseholdRecord, 600, 600);
        let start = slot.crop();
        slot.begin_crop();
        slot.begin_handle_drag(Handle::BottomRight, egui::pos2(450.0, 350.0));
        slot.drag_to(egui::pos2(460.0, 355.0));
        slot.drag_to(egui::pos2(470.0, 365.0));
        slot.end_handle_drag();
        assert_eq!(slot.crop().width, start.width + 20.0);
        assert_eq!(slot.crop().height, start.height + 15.0);
        assert!(matches!(slot.mode(), Mode::CroppingIdle { .. }));
    }

    #[test]
    fn end_drag_outside_drag_is_harmless() {
        let mut slot = loaded(SlotKind::HouseholdRecord, 60, 60);
        slot.begin_crop();
        slot.end_handle_drag();
        assert!(matches!(slot.mode(), Mode::CroppingIdle { .. }));
    }

    #[test]
    fn cancel_restores_snapshot() {
        let mut slot = loaded(SlotKind::PassportPage, 400, 300);
        let preview = slot.preview().cloned().unwrap();
        let crop = slot.crop();
        slot.begin_crop();
        slot.begin_handle_drag(Handle::TopLeft, egui::pos2(50.0, 50.0));
        slot.drag_to(egui::pos2(90.0, 10.0));
        slot.drag_to(egui::pos2(20.0, 95.0));
        slot.cancel_crop();
        assert_eq!(slot.preview(), Some(&preview));
        assert_eq!(slot.crop(), crop);
        assert!(!slot.is_cropping());
        assert!(slot.snapshot().is_none());
    }

    #[test]
    fn confirm_without_file_is_noop() {
        let mut slot = slot(SlotKind::IdCardFront);
        assert!(slot.confirm_crop().is_none());
        assert_eq!(slot.mode(), &Mode::Idle);
    }

    #[test]
    fn confirm_outside_crop_is_noop() {
        let mut slot = loaded(SlotKind::IdCardFront, 40, 40);
        assert!(slot.confirm_crop().is_none());
        assert_eq!(slot.mode(), &Mode::Idle);
    }

    #[test]
    fn surface_failure_returns_to_cropping() {
        let mut slot = loaded(SlotKind::IdCardFront, 40, 40);
        slot.begin_crop();
        let job = slot.confirm_crop().unwrap();
        let ticket = job.ticket;
        let err = CaptureError::DrawingSurfaceUnavailable {
            width: 0,
            height: 0,
        };
        assert!(slot.apply_commit(ticket, Err(err)).is_err());
        assert!(matches!(slot.mode(), Mode::CroppingIdle { .. }));
        assert_eq!(slot.source().unwrap().name, "doc.png");
    }

    #[test]
    fn failed_decode_during_commit_returns_to_cropping() {
        let mut slot = loaded(SlotKind::IdCardFront, 400, 300);
        slot.begin_crop();
        let commit_job = slot.confirm_crop().unwrap();

        let job = slot
            .select(IncomingFile::from_bytes("bad.png", None, b"garbage".to_vec()))
            .unwrap();
        let (ticket, result) = job.run();
        assert!(matches!(
            slot.apply_decoded(ticket, result),
            Err(CaptureError::Decode { .. })
        ));
        assert!(!slot.is_loading());

        let (ticket, result) = commit_job.run();
        assert_eq!(slot.apply_commit(ticket, result).unwrap(), None);
        assert!(!slot.is_committing());
        assert!(matches!(slot.mode(), Mode::CroppingIdle { .. }));
        assert_eq!(slot.source().unwrap().name, "doc.png");

        slot.cancel_crop();
        assert!(!slot.is_cropping());
        assert!(slot.begin_crop());
    }

    #[test]
    fn failed_decode_keeps_crop_in_progress() {
        let mut slot = loaded(SlotKind::IdCardFront, 40, 40);
        slot.begin_crop();
        let job = slot
            .select(IncomingFile::from_bytes("bad.png", None, b"garbage".to_vec()))
            .unwrap();
        let (ticket, result) = job.run();
        assert!(slot.apply_decoded(ticket, result).is_err());
        assert!(matches!(slot.mode(), Mode::CroppingIdle { .. }));
    }

    #[test]
    fn zoom_step_follows_configured_step() {
        let limits = EditLimits {
            wheel_step: 0.25,
            ..EditLimits::default()
        };
        let mut slot = ImageSlot::new(SlotKind::IdCardFront.profile(), limits);
        slot.step_zoom(1.0);
        assert!((slot.scale() - 1.25).abs() < 1e-6);
        slot.step_zoom(-1.0);
        slot.step_zoom(-1.0);
        assert!((slot.scale() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn removal_during_commit_discards_result() {
        let mut slot = loaded(SlotKind::IdCardFront, 40, 40);
        slot.begin_crop();
        let job = slot.confirm_crop().unwrap();
        slot.remove();
        let (ticket, result) = job.run();
        assert_eq!(slot.apply_commit(ticket, result).unwrap(), None);
        assert!(slot.source().is_none());
    }

    #[test]
    fn end_to_end_capture() {
        let mut slot = slot(SlotKind::HouseholdRecord);
        let bytes = png_bytes(900, 800);
        let job = slot
            .select(IncomingFile::from_bytes("household.png", None, bytes))
            .unwrap();
        let (ticket, result) = job.run();
        assert_eq!(
            slot.apply_decoded(ticket, result).unwrap(),
            Some(FieldUpdate::Set("household.png".into()))
        );
        assert_eq!(slot.scale(), 1.0);
        assert_eq!(slot.rotation(), 0);

        slot.rotate();
        slot.rotate();
        assert_eq!(slot.rotation(), 180);

        slot.zoom_by(0.3);
        assert!((slot.scale() - 1.3).abs() < 1e-6);

        let before = slot.crop();
        assert!(slot.begin_crop());
        assert!(slot.is_cropping());
        slot.begin_handle_drag(Handle::BottomRight, egui::pos2(450.0, 350.0));
        slot.drag_to(egui::pos2(470.0, 365.0));
        slot.end_handle_drag();
        let after = slot.crop();
        assert_eq!(after.width, before.width + 20.0);
        assert_eq!(after.height, before.height + 15.0);

        let update = commit(&mut slot).unwrap();
        assert_eq!(update, Some(FieldUpdate::Set("household.png".into())));
        assert!(!slot.is_cropping());
        let source = slot.source().unwrap();
        assert_eq!(source.mime, "image/jpeg");
        assert_eq!(
            image::guess_format(&source.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let preview = slot.preview().unwrap();
        assert_eq!(
            (preview.width(), preview.height()),
            (after.width.round() as u32, after.height.round() as u32)
        );
    }

    proptest! {
        #[test]
        fn four_n_rotations_are_identity(n in 0usize..16, initial in 0usize..4) {
            let mut slot = slot(SlotKind::IdCardFront);
            for _ in 0..initial {
                slot.rotate();
            }
            let start = slot.rotation();
            for _ in 0..4 * n {
                slot.rotate();
            }
            prop_assert_eq!(slot.rotation(), start);
        }

        #[test]
        fn scale_stays_in_range(deltas in prop::collection::vec(-5.0f32..5.0, 0..64)) {
            let mut slot = slot(SlotKind::IdCardFront);
            for d in deltas {
                slot.zoom_by(d);
                prop_assert!(slot.scale() >= MIN_SCALE && slot.scale() <= MAX_SCALE);
            }
        }

        #[test]
        fn cancel_is_bit_exact(
            moves in prop::collection::vec((0usize..4, -80.0f32..80.0, -80.0f32..80.0), 0..16)
        ) {
            let mut slot = loaded(SlotKind::IdCardFront, 24, 16);
            let preview = slot.preview().cloned().unwrap();
            let crop = slot.crop();
            slot.begin_crop();
            for (h, dx, dy) in moves {
                slot.begin_handle_drag(Handle::ALL[h], egui::pos2(100.0, 100.0));
                slot.drag_to(egui::pos2(100.0 + dx, 100.0 + dy));
                slot.end_handle_drag();
            }
            slot.cancel_crop();
            let restored = slot.preview().unwrap();
            prop_assert_eq!(restored.image.as_raw(), preview.image.as_raw());
            prop_assert_eq!(slot.crop(), crop);
        }
    }
}
