//! Native window showing an image until a key is pressed.

use ::image::RgbImage;
use eframe::egui;

use crate::PipelineError;

struct ImageWindow {
    pending: Option<egui::ColorImage>,
    texture: Option<egui::TextureHandle>,
}

impl ImageWindow {
    fn new(img: &RgbImage) -> Self {
        let size = [img.width() as usize, img.height() as usize];
        Self {
            pending: Some(egui::ColorImage::from_rgb(size, img.as_raw())),
            texture: None,
        }
    }
}

impl eframe::App for ImageWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(image) = self.pending.take() {
            self.texture = Some(ctx.load_texture("boardcal-image", image, egui::TextureOptions::LINEAR));
        }

        let key_pressed = ctx.input(|i| {
            i.events
                .iter()
                .any(|e| matches!(e, egui::Event::Key { pressed: true, .. }))
        });
        if key_pressed {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(tex) = &self.texture {
                ui.image((tex.id(), tex.size_vec2()));
            }
        });
    }
}

/// Block until the window is closed by a key press (or by the window manager).
pub fn show_image(title: &str, img: &RgbImage) -> Result<(), PipelineError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title)
            .with_inner_size([img.width() as f32, img.height() as f32]),
        ..Default::default()
    };
    let app = ImageWindow::new(img);

    eframe::run_native(title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| PipelineError::Display(e.to_string()))
}
