use egui::{FontDefinitions, epaint::text::FontData};

pub const PHOSPHOR_REGULAR: &str = "phosphor_regular";

pub fn get_fonts() -> FontDefinitions {
    let mut fonts = FontDefinitions::default();

    fonts.font_data.insert(
        PHOSPHOR_REGULAR.into(),
        FontData::from_static(egui_phosphor::Variant::Regular.font_bytes()).into(),
    );
    if let Some(font_keys) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
        font_keys.insert(1, PHOSPHOR_REGULAR.into());
    }
    if let Some(font_keys) = fonts.families.get_mut(&egui::FontFamily::Monospace) {
        font_keys.insert(1, PHOSPHOR_REGULAR.into());
    }

    fonts
}
