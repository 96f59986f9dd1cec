use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use weight_tracker::data::export::SaveFormat;
use weight_tracker::data::external::ValueEncoding;

use crate::state::{AppState, ExternalMode};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Select base folder…").clicked() {
                pick_base_folder(state);
                ui.close_menu();
            }
            if ui.button("Save weights…").clicked() {
                save_weights_dialog(state);
                ui.close_menu();
            }
        });
        ui.menu_button("Help", |ui: &mut Ui| {
            if ui.button("Instructions").clicked() {
                state.show_instructions = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.days.is_empty() {
            ui.label(format!(
                "{} days found, {} selected",
                state.days.len(),
                state.day_selected.iter().filter(|&&s| s).count()
            ));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::DARK_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            base_folder_section(ui, state);
            ui.separator();
            days_section(ui, state);
            ui.separator();
            external_section(ui, state);
            ui.separator();
            save_section(ui, state);
        });
}

fn base_folder_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Base folder");
    ui.horizontal(|ui: &mut Ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.base_path)
                .hint_text("folder with YYYYMMDD days")
                .desired_width(ui.available_width() - 70.0),
        );
        if ui.button("Browse…").clicked() {
            pick_base_folder(state);
        }
    });
    if ui.button("Load days").clicked() {
        state.load_days();
    }
}

fn days_section(ui: &mut Ui, state: &mut AppState) {
    let n_selected = state.day_selected.iter().filter(|&&s| s).count();
    let header = format!("Days  ({n_selected}/{})", state.days.len());

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt("days")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if state.days.is_empty() {
                ui.label("No days loaded.");
                return;
            }
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.set_all_days(true);
                }
                if ui.small_button("None").clicked() {
                    state.set_all_days(false);
                }
            });
            ScrollArea::vertical()
                .id_salt("day_list")
                .max_height(220.0)
                .show(ui, |ui: &mut Ui| {
                    for (day, selected) in state.days.iter().zip(state.day_selected.iter_mut()) {
                        ui.checkbox(selected, day.name());
                    }
                });
        });
}

fn external_section(ui: &mut Ui, state: &mut AppState) {
    ui.checkbox(&mut state.options.use_external, RichText::new("External values").strong());

    if state.options.use_external {
        let opts = &mut state.options;
        ui.radio_value(
            &mut opts.external_mode,
            ExternalMode::SingleFile,
            "One file with all values",
        );
        ui.radio_value(
            &mut opts.external_mode,
            ExternalMode::PerDay,
            "One file per day folder",
        );

        match opts.external_mode {
            ExternalMode::SingleFile => {
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut opts.single_values_file)
                            .hint_text("values file")
                            .desired_width(ui.available_width() - 70.0),
                    );
                    if ui.button("Browse…").clicked() {
                        if let Some(path) = pick_values_file() {
                            opts.single_values_file = path.display().to_string();
                        }
                    }
                });
            }
            ExternalMode::PerDay => {
                ui.add(
                    egui::TextEdit::singleline(&mut opts.daily_filename)
                        .hint_text("example: daily_value.npy"),
                );
            }
        }

        ui.checkbox(&mut opts.show_regression, "Show regression line");
        ui.checkbox(&mut opts.mark_outliers, "Mark outliers");
        ui.add_enabled_ui(opts.mark_outliers, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("z-score threshold");
                ui.add(
                    egui::DragValue::new(&mut opts.z_threshold)
                        .range(0.5..=10.0)
                        .speed(0.1)
                        .fixed_decimals(1),
                );
            });
        });
    }

    ui.add_space(4.0);
    if ui.button("Plot").clicked() {
        if state.options.use_external {
            state.plot_with_external();
        } else {
            state.plot_weight_only();
        }
    }
}

fn save_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Save weights");
    ui.horizontal(|ui: &mut Ui| {
        let format = &mut state.options.save_format;
        egui::ComboBox::from_id_salt("save_format")
            .selected_text(format.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for f in SaveFormat::ALL {
                    ui.selectable_value(format, f, f.description());
                }
            });
        if ui.button("Save…").clicked() {
            save_weights_dialog(state);
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn pick_base_folder(state: &mut AppState) {
    if let Some(dir) = rfd::FileDialog::new()
        .set_title("Select base folder")
        .pick_folder()
    {
        state.base_path = dir.display().to_string();
        state.load_days();
    }
}

fn pick_values_file() -> Option<std::path::PathBuf> {
    let all: Vec<&str> = ValueEncoding::ALL.iter().map(|e| e.extension()).collect();
    let mut dialog = rfd::FileDialog::new()
        .set_title("Select external values file")
        .add_filter("Supported files", &all);
    for enc in ValueEncoding::ALL {
        dialog = dialog.add_filter(enc.to_string(), &[enc.extension()]);
    }
    dialog.pick_file()
}

pub fn save_weights_dialog(state: &mut AppState) {
    let format = state.options.save_format;
    let mut dialog = rfd::FileDialog::new()
        .set_title("Save weights")
        .set_file_name(state.default_save_name())
        .add_filter(format.description(), &[format.extension()]);
    if let Some(dir) = state.save_directory() {
        dialog = dialog.set_directory(dir);
    }
    if let Some(path) = dialog.save_file() {
        state.save_weights(&path);
    }
}
