use std::sync::Arc;

use eframe::egui;
use image::RgbaImage;

use crate::edit::{ImageSlot, Mode};
use crate::geometry::{self, Handle};

const PADDING: f32 = 20.0;

/// Requests the canvas cannot satisfy on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotAction {
    Open,
    Confirm,
    Remove,
}

/// egui view of one [`ImageSlot`]; owns the preview texture.
#[derive(Default)]
pub struct SlotWidget {
    texture: Option<egui::TextureHandle>,
    texture_source: Option<Arc<RgbaImage>>,
}

impl SlotWidget {
    fn sync_texture(&mut self, ctx: &egui::Context, slot: &ImageSlot) {
        let Some(preview) = slot.preview() else {
            self.texture = None;
            self.texture_source = None;
            return;
        };
        let fresh = self
            .texture_source
            .as_ref()
            .is_some_and(|src| Arc::ptr_eq(src, &preview.image));
        if fresh {
            return;
        }
        let size = [preview.width() as _, preview.height() as _];
        let color_image =
            egui::ColorImage::from_rgba_unmultiplied(size, preview.image.as_flat_samples().as_slice());
        self.texture = Some(ctx.load_texture(
            slot.kind().field(),
            color_image,
            egui::TextureOptions::LINEAR,
        ));
        self.texture_source = Some(preview.image.clone());
    }

    pub fn toolbar(&mut self, ui: &mut egui::Ui, slot: &mut ImageSlot) -> Option<SlotAction> {
        let mut action = None;
        let has_image = slot.preview().is_some();
        let cropping = slot.is_cropping();
        let committing = slot.is_committing();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!committing, egui::Button::new("Open Image"))
                .clicked()
            {
                action = Some(SlotAction::Open);
            }

            ui.add_enabled_ui(has_image && !committing, |ui| {
                if ui.button("🔄").on_hover_text("Rotate 90°").clicked() {
                    slot.rotate();
                }
                if ui.button("−").clicked() {
                    slot.step_zoom(-1.0);
                }
                let mut scale = slot.scale();
                let limits = *slot.limits();
                if ui
                    .add(egui::Slider::new(&mut scale, limits.min_scale..=limits.max_scale).text("Zoom"))
                    .changed()
                {
                    slot.set_zoom(scale);
                }
                if ui.button("+").clicked() {
                    slot.step_zoom(1.0);
                }

                ui.separator();
                if !cropping {
                    if ui.button("Crop").clicked() {
                        slot.begin_crop();
                    }
                } else {
                    if ui.button("Confirm").clicked() {
                        action = Some(SlotAction::Confirm);
                    }
                    if ui.button("Cancel").clicked() {
                        slot.cancel_crop();
                    }
                }
            });

            ui.separator();
            if ui
                .add_enabled(has_image || slot.is_loading(), egui::Button::new("Remove"))
                .clicked()
            {
                action = Some(SlotAction::Remove);
            }

            if slot.is_loading() || committing {
                ui.spinner();
            }
        });
        action
    }

    pub fn canvas(&mut self, ui: &mut egui::Ui, slot: &mut ImageSlot, tolerance: f32, drag_over: bool) {
        self.sync_texture(ui.ctx(), slot);

        let available_size = ui.available_size();
        let target_rect = egui::Rect::from_min_size(ui.cursor().min, available_size);
        let response = ui.allocate_rect(target_rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(target_rect);

        if drag_over {
            painter.rect_stroke(
                target_rect.shrink(2.0),
                4.0,
                egui::Stroke::new(2.0, ui.visuals().selection.stroke.color),
            );
        }

        let Some(texture) = &self.texture else {
            painter.text(
                target_rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("Drop a JPEG or PNG here for {}", slot.kind()),
                egui::FontId::proportional(16.0),
                ui.visuals().weak_text_color(),
            );
            return;
        };

        let max_size = available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0);
        let image_size = texture.size_vec2();

        // Fit, then apply the user's zoom
        let fit = (max_size.x / image_size.x).min(max_size.y / image_size.y).max(0.01);
        let display_size = image_size * fit * slot.scale();
        let image_rect =
            egui::Rect::from_center_size(target_rect.center() + slot.pan(), display_size);
        let factor = display_size.x / image_size.x;

        let to_image = |pos: egui::Pos2| egui::pos2(
            (pos.x - image_rect.min.x) / factor,
            (pos.y - image_rect.min.y) / factor,
        );

        egui::Image::new(egui::load::SizedTexture::from_handle(texture))
            .rotate(
                (slot.rotation() as f32).to_radians(),
                egui::Vec2::splat(0.5),
            )
            .paint_at(ui, image_rect);

        // Handle Input
        let crop = slot.crop().to_egui();
        let screen_crop_rect = egui::Rect::from_min_max(
            image_rect.min + crop.min.to_vec2() * factor,
            image_rect.min + crop.max.to_vec2() * factor,
        );

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                if slot.is_cropping() {
                    if let Some(handle) = geometry::hit_test(pos, screen_crop_rect, tolerance) {
                        slot.begin_handle_drag(handle, to_image(pos));
                    }
                } else {
                    slot.begin_pan(pos);
                }
            }
        }

        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let resizing = matches!(slot.mode(), Mode::CroppingDragging { .. });
                if resizing {
                    slot.drag_to(to_image(pos));
                } else {
                    slot.pan_to(pos);
                }
            }
        }

        if response.drag_stopped() {
            slot.end_handle_drag();
            slot.end_pan();
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                slot.wheel(scroll);
            }
        }

        if !slot.is_cropping() {
            return;
        }

        // Re-read after this frame's drag
        let crop = slot.crop().to_egui();
        let screen_crop_rect = egui::Rect::from_min_max(
            image_rect.min + crop.min.to_vec2() * factor,
            image_rect.min + crop.max.to_vec2() * factor,
        );
        paint_crop_overlay(&painter, image_rect, screen_crop_rect);
    }
}

fn paint_crop_overlay(painter: &egui::Painter, image_rect: egui::Rect, screen_crop_rect: egui::Rect) {
    // Draw overlay (dimmed area outside crop)
    let overlay_color = egui::Color32::from_black_alpha(150);

    // Top
    painter.rect_filled(
        egui::Rect::from_min_max(
            image_rect.min,
            egui::pos2(image_rect.max.x, screen_crop_rect.min.y),
        ),
        0.0,
        overlay_color,
    );
    // Bottom
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, screen_crop_rect.max.y),
            image_rect.max,
        ),
        0.0,
        overlay_color,
    );
    // Left
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, screen_crop_rect.min.y),
            egui::pos2(screen_crop_rect.min.x, screen_crop_rect.max.y),
        ),
        0.0,
        overlay_color,
    );
    // Right
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(screen_crop_rect.max.x, screen_crop_rect.min.y),
            egui::pos2(image_rect.max.x, screen_crop_rect.max.y),
        ),
        0.0,
        overlay_color,
    );

    painter.rect_stroke(
        screen_crop_rect,
        0.0,
        egui::Stroke::new(1.0, egui::Color32::WHITE),
    );

    let handle_radius = 6.0;
    let handle_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    let handle_fill = egui::Color32::WHITE;
    for handle in Handle::ALL {
        painter.circle(
            handle.corner_of(screen_crop_rect),
            handle_radius,
            handle_fill,
            handle_stroke,
        );
    }
}
