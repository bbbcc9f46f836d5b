use eframe::{run_native, NativeOptions};
use egui_dotview::{
    SettingsBackend, SettingsLayout, SettingsNavigation, Viewer, ViewerApp, APP_NAME,
};

fn main() -> eframe::Result {
    env_logger::init();

    let backend = SettingsBackend::from_env();
    let navigation = SettingsNavigation::default();
    let viewer = Viewer::from_settings(&backend, SettingsLayout::default(), navigation.clone());

    run_native(
        APP_NAME,
        NativeOptions::default(),
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, viewer, navigation)))),
    )
}
