use crate::settings::{ParamGroup, Settings, PARAMS};

pub const PANEL_TITLE: &str = "Settings";

/// Floating parameter panel in the top-right corner
///
/// Returns true when any value changed this frame.
pub fn settings_panel(ctx: &egui::Context, settings: &mut Settings, fps: f32) -> bool {
    let mut changed = false;

    egui::Window::new(PANEL_TITLE)
        .title_bar(true)
        .resizable(false)
        .collapsible(true)
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("{:.0} FPS", fps))
                    .size(14.0)
                    .color(egui::Color32::GRAY),
            );
            ui.separator();

            for group in ParamGroup::ALL {
                egui::CollapsingHeader::new(group.label())
                    .default_open(true)
                    .show(ui, |ui| {
                        changed |= group_sliders(ui, settings, group);
                    });
            }
        });

    changed
}

fn group_sliders(ui: &mut egui::Ui, settings: &mut Settings, group: ParamGroup) -> bool {
    let mut changed = false;

    for spec in PARAMS.iter().filter(|spec| spec.group == group) {
        let Some(slot) = settings.slot_mut(spec.name) else {
            continue;
        };
        let response = ui.add(
            egui::Slider::new(slot, spec.min..=spec.max)
                .step_by(spec.step as f64)
                .text(spec.name),
        );

        if response.changed() {
            let value = *slot;
            if let Ok(stored) = settings.set(spec.name, value) {
                log::debug!("{} = {}", spec.name, stored);
            }
            changed = true;
        }
    }

    changed
}
