use eframe::egui;

use crate::config::Settings;
use crate::edit::{FieldUpdate, ImageSlot};
use crate::error::CaptureError;
use crate::form::{FormFields, PendingAttachments};
use crate::intake::{IncomingFile, route_drop};
use crate::slot::SlotKind;
use crate::widget::{SlotAction, SlotWidget};
use crate::worker::{JobResult, Worker};

pub struct CaptureApp {
    slots: Vec<(ImageSlot, SlotWidget)>,
    selected: usize,
    form: FormFields,
    pending: PendingAttachments,
    worker: Worker,
    handle_tolerance: f32,
    /// Files hovering over the window; presentation only.
    drag_over: bool,
}

impl CaptureApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let limits = settings.limits();
        let slots = SlotKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    ImageSlot::new(settings.profile(kind), limits),
                    SlotWidget::default(),
                )
            })
            .collect();
        Self {
            slots,
            selected: 0,
            form: FormFields::new(),
            pending: PendingAttachments::new(),
            worker: Worker::new(),
            handle_tolerance: settings.handle_tolerance,
            drag_over: false,
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> Option<&mut ImageSlot> {
        self.slots
            .iter_mut()
            .map(|(slot, _)| slot)
            .find(|slot| slot.kind() == kind)
    }

    fn intake(&mut self, index: usize, file: IncomingFile) {
        let Some((slot, _)) = self.slots.get_mut(index) else {
            return;
        };
        match slot.select(file) {
            Ok(job) => self.worker.decode(job),
            Err(e) => notify(&e),
        }
    }

    fn open_with_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg"])
            .pick_file()
        {
            match IncomingFile::from_path(&path) {
                Ok(file) => self.intake(self.selected, file),
                Err(e) => notify(&e),
            }
        }
    }

    /// First accepted file goes to the selected slot, the rest fill the next
    /// empty slots in order.
    fn handle_dropped(&mut self, ctx: &egui::Context) {
        self.drag_over = ctx.input(|i| !i.raw.hovered_files.is_empty());

        let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped_files.is_empty() {
            return;
        }
        let free: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, (slot, _))| slot.source().is_none() && !slot.is_loading())
            .map(|(i, _)| i)
            .collect();
        let max_bytes = self.slots[self.selected].0.limits().max_file_bytes;
        let plan = route_drop(
            dropped_files.iter().filter_map(IncomingFile::from_dropped),
            max_bytes,
            self.selected,
            &free,
        );
        for e in &plan.rejected {
            notify(e);
        }
        for file in &plan.unplaced {
            tracing::warn!(file = %file.name, "no free slot for dropped file");
        }
        for (index, file) in plan.assigned {
            self.intake(index, file);
        }
    }

    fn handle_action(&mut self, action: SlotAction) {
        let index = self.selected;
        match action {
            SlotAction::Open => self.open_with_dialog(),
            SlotAction::Confirm => {
                if let Some(job) = self.slots[index].0.confirm_crop() {
                    self.worker.commit(job);
                }
            }
            SlotAction::Remove => {
                let slot = &mut self.slots[index].0;
                let kind = slot.kind();
                let update = slot.remove();
                self.form.apply(kind, update);
                self.pending.detach_slot(kind);
            }
        }
    }

    fn poll_jobs(&mut self, ctx: &egui::Context) {
        for done in self.worker.drain() {
            let kind = done.ticket().slot;
            let Some(slot) = self.slot_mut(kind) else {
                continue;
            };
            let applied = match done {
                JobResult::Decoded(ticket, result) => slot.apply_decoded(ticket, result),
                JobResult::Committed(ticket, result) => slot.apply_commit(ticket, result),
            };
            let attached = slot.source().cloned();
            match applied {
                Ok(Some(update)) => {
                    if let (FieldUpdate::Set(_), Some(file)) = (&update, attached) {
                        self.pending.attach(kind, file);
                    }
                    self.form.apply(kind, update);
                }
                Ok(None) => {}
                Err(e) => notify(&e),
            }
        }
        if self.worker.is_busy() {
            ctx.request_repaint();
        }
    }

    fn slot_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Documents");
        ui.separator();
        for (i, (slot, _)) in self.slots.iter().enumerate() {
            let kind = slot.kind();
            let value = self.form.value(kind);
            let marker = if kind.required() && value.is_empty() { " *" } else { "" };
            let label = format!("{}{}", kind, marker);
            if ui.selectable_label(self.selected == i, label).clicked() {
                self.selected = i;
            }
            if !value.is_empty() {
                ui.small(value);
            }
        }
        ui.separator();
        if self.form.is_complete() {
            ui.label("All required documents attached.");
        } else {
            let missing = self.form.missing_required();
            ui.label(format!("{} required document(s) missing", missing.len()));
        }
    }

    fn attachment_list(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(format!("Pending attachments ({})", self.pending.len()));
            if ui
                .add_enabled(!self.pending.is_empty(), egui::Button::new("Save attachments…"))
                .clicked()
            {
                if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                    match self.pending.save_to(&dir) {
                        Ok(written) => tracing::info!(count = written.len(), dir = %dir.display(), "attachments saved"),
                        Err(e) => notify(&e),
                    }
                }
            }
        });

        let mut remove = None;
        for (g, (category, files)) in self.pending.groups().iter().enumerate() {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("{}:", category));
                for (i, attachment) in files.iter().enumerate() {
                    ui.label(format!("{} ({})", attachment.file.name, attachment.size_label()));
                    if ui.small_button("✖").clicked() {
                        remove = Some((g, i));
                    }
                }
            });
        }
        if let Some((g, i)) = remove {
            self.pending.remove(g, i);
        }
    }
}

impl eframe::App for CaptureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_jobs(ctx);
        self.handle_dropped(ctx);

        egui::SidePanel::left("slots")
            .resizable(false)
            .min_width(200.0)
            .show(ctx, |ui| self.slot_list(ui));

        egui::TopBottomPanel::bottom("attachments").show(ctx, |ui| self.attachment_list(ui));

        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let tolerance = self.handle_tolerance;
            let drag_over = self.drag_over;
            let (slot, widget) = &mut self.slots[self.selected];
            ui.heading(slot.kind().to_string());
            action = widget.toolbar(ui, slot);
            ui.separator();
            widget.canvas(ui, slot, tolerance, drag_over);
        });

        if let Some(action) = action {
            self.handle_action(action);
        }
    }
}

/// Blocking message box, the only channel for user-facing errors.
fn notify(error: &CaptureError) {
    tracing::warn!(error = %error, "{}", error.title());
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title(error.title())
        .set_description(error.to_string())
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
