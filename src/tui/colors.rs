//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Header and frame accent
pub const DEEP_GREEN: Color = Color::Rgb(44, 92, 79);
/// Add / edit accent
pub const PURPLE: Color = Color::Rgb(108, 99, 255);
/// Delete hint
pub const RED: Color = Color::Rgb(255, 92, 92);
/// Toggle hint for open tasks
pub const GREEN: Color = Color::Rgb(76, 175, 80);
/// Completed task text
pub const MUTED: Color = Color::Rgb(119, 119, 119);
