pub mod banner;
pub mod tui;

/// Prints the welcome banner and applies the theme for all subsequent inquire prompts.
/// Call once at startup, after tracing init.
pub fn init_ui(data_dir: &str) {
    banner::print_welcome(data_dir);
    tui::apply_theme();
}
