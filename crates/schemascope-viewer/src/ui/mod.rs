pub mod help;
pub mod hud;
pub mod panel;
pub mod shortcuts;
pub mod tooltips;

pub use help::help_overlay;
pub use hud::hud_overlay;
pub use panel::ui_panel;
pub use shortcuts::handle_shortcuts;
