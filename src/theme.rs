//! Theme colors for the UI, picked up from the terminal theme when one
//! is available (Omarchy kitty.conf), otherwise a Catppuccin-flavored
//! fallback palette.

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Active borders, key hints
    pub user: Color,        // "You" in the transcript
    pub assistant: Color,   // "Assistant" in the transcript
    pub success: Color,     // Link markers, confirmations
    pub warning: Color,     // Status alerts
    pub danger: Color,      // Delete confirmation, errors
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Previews, timestamps, hints
    pub bg_selected: Color, // Selected row background
    pub inactive: Color,    // Inactive borders
    pub header: Color,      // Column headers
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(137, 220, 235),
            user: Color::Rgb(137, 180, 250),
            assistant: Color::Rgb(166, 218, 149),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            danger: Color::Rgb(243, 139, 168),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(180, 190, 254),
        }
    }
}

impl Theme {
    /// Load the terminal theme, falling back to the built-in palette
    pub fn load() -> Self {
        Self::load_kitty_theme().unwrap_or_default()
    }

    /// Read colors from the Omarchy theme's kitty.conf, mapping the
    /// standard 16-color slots onto chat roles
    fn load_kitty_theme() -> Option<Self> {
        let home = dirs::home_dir()?;
        let theme_path = home.join(".config/omarchy/current/theme/kitty.conf");

        let content = fs::read_to_string(&theme_path).ok()?;
        let colors = Self::parse_kitty_conf(&content);
        if colors.is_empty() {
            return None;
        }

        let fallback = Self::default();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|key| colors.get(*key))
                .copied()
                .unwrap_or(fallback)
        };

        Some(Self {
            accent: pick(&["color6", "color14"], fallback.accent),
            user: pick(&["color4", "color12"], fallback.user),
            assistant: pick(&["color2", "color10"], fallback.assistant),
            success: pick(&["color2", "color10"], fallback.success),
            warning: pick(&["color3", "color11"], fallback.warning),
            danger: pick(&["color1", "color9"], fallback.danger),
            text: pick(&["foreground"], fallback.text),
            text_dim: pick(&["color8"], fallback.text_dim),
            bg_selected: pick(&["selection_background", "color0"], fallback.bg_selected),
            inactive: pick(&["inactive_border_color", "color8"], fallback.inactive),
            header: pick(&["color5", "color13"], fallback.header),
        })
    }

    /// Parse kitty.conf lines of the form `key #hexcolor`
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.splitn(2, char::is_whitespace);
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            if let Some(color) = Self::parse_hex_color(value.trim()) {
                colors.insert(key.trim().to_string(), color);
            }
        }

        colors
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
