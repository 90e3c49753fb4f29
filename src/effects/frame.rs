//! Character-grid rendering of a particle system

use super::{EffectKind, ParticleSystem};
use crate::theme::{Palette, Theme};

/// One rasterised animation frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

fn glyph(kind: EffectKind) -> char {
    match kind {
        EffectKind::Rain | EffectKind::Thunder => '|',
        EffectKind::Snow => '*',
        EffectKind::Wind => '~',
        EffectKind::Clear => ' ',
    }
}

/// "#42A5F5" -> (0x42, 0xA5, 0xF5)
fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

impl Frame {
    /// Rasterise the particles currently inside the field. One cell per unit.
    #[must_use]
    pub fn capture(system: &ParticleSystem) -> Self {
        let width = system.width() as usize;
        let height = system.height() as usize;
        let mut cells = vec![' '; width * height];
        let mark = glyph(system.kind());

        for particle in system.particles() {
            if particle.x < 0.0 || particle.y < 0.0 {
                continue;
            }
            let (col, row) = (particle.x as usize, particle.y as usize);
            if col < width && row < height {
                cells[row * width + col] = mark;
            }
        }

        Self {
            width,
            height,
            cells,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn cell(&self, col: usize, row: usize) -> Option<char> {
        (col < self.width && row < self.height).then(|| self.cells[row * self.width + col])
    }

    /// Number of cells holding a particle
    #[must_use]
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| **c != ' ').count()
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text coloured with the effect colour for `theme` (24-bit ANSI), on
    /// the first stop of the effect's backdrop gradient when it has one.
    #[must_use]
    pub fn to_ansi(&self, kind: EffectKind, theme: Theme) -> String {
        let style = kind.style();
        let Some((r, g, b)) = hex_to_rgb(style.colour_for(theme)) else {
            return self.to_text();
        };
        let background = style
            .background_for(theme)
            .and_then(|(top, _)| hex_to_rgb(top))
            .map(|(br, bg, bb)| format!("\x1b[48;2;{br};{bg};{bb}m"))
            .unwrap_or_default();

        // reset per line so the background doesn't bleed past the field
        self.to_text()
            .lines()
            .map(|line| format!("\x1b[38;2;{r};{g};{b}m{background}{line}{}", Palette::RESET))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#42A5F5"), Some((0x42, 0xA5, 0xF5)));
        assert_eq!(hex_to_rgb("42A5F5"), None);
        assert_eq!(hex_to_rgb("#FFF"), None);
    }

    #[test]
    fn test_capture_dimensions() {
        let system = ParticleSystem::seeded(EffectKind::Snow, 30.0, 8.0, 11);
        let frame = Frame::capture(&system);
        let text = frame.to_text();

        assert_eq!(text.lines().count(), 8);
        assert!(text.lines().all(|line| line.chars().count() == 30));
        assert!(text.chars().all(|c| c == '*' || c == ' ' || c == '\n'));
    }

    #[test]
    fn test_particles_show_up_after_falling_in() {
        let mut system = ParticleSystem::seeded(EffectKind::Rain, 40.0, 20.0, 2);
        // freshly spawned particles sit above the field
        assert_eq!(Frame::capture(&system).filled(), 0);

        for _ in 0..40 {
            system.step();
        }
        let frame = Frame::capture(&system);
        assert!(frame.filled() > 0);
        assert!(frame.to_text().contains('|'));
    }

    #[test]
    fn test_clear_frame_is_blank() {
        let system = ParticleSystem::seeded(EffectKind::Clear, 10.0, 3.0, 0);
        let frame = Frame::capture(&system);
        assert_eq!(frame.filled(), 0);
        assert_eq!(frame.cell(9, 2), Some(' '));
        assert_eq!(frame.cell(10, 2), None);
    }

    #[test]
    fn test_ansi_uses_theme_colour() {
        let system = ParticleSystem::seeded(EffectKind::Rain, 5.0, 2.0, 0);
        let frame = Frame::capture(&system);
        assert!(frame.to_ansi(EffectKind::Rain, Theme::Dark).starts_with("\x1b[38;2;66;165;245m"));
        assert!(frame.to_ansi(EffectKind::Rain, Theme::Light).starts_with("\x1b[38;2;21;101;192m"));
    }

    #[test]
    fn test_ansi_paints_effect_backdrop() {
        let system = ParticleSystem::seeded(EffectKind::Rain, 5.0, 2.0, 0);
        let frame = Frame::capture(&system);

        // #1e293b behind rain in dark mode, one reset per row
        let dark = frame.to_ansi(EffectKind::Rain, Theme::Dark);
        assert!(dark.contains("\x1b[48;2;30;41;59m"));
        assert_eq!(dark.matches(Palette::RESET).count(), 2);

        let system = ParticleSystem::seeded(EffectKind::Wind, 5.0, 2.0, 0);
        let wind = Frame::capture(&system).to_ansi(EffectKind::Wind, Theme::Dark);
        assert!(!wind.contains("\x1b[48;2"));
    }
}
