use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BAR_WIDTH: usize = 10;
pub const DEFAULT_FILLED_GLYPH: &str = "🟩";
pub const DEFAULT_EMPTY_GLYPH: &str = "⬜";

/// Rule that converts a percentage into a whole number of filled glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillPolicy {
    /// `round(width * p / 100)`, ties to even.
    #[default]
    Nearest,
    /// `floor(p / (100 / width))`, saturating to the full width at exactly 100%.
    FloorByStep,
}

impl FillPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FillPolicy::Nearest => "nearest",
            FillPolicy::FloorByStep => "floor-by-step",
        }
    }

    /// Number of filled cells for an already clamped percentage.
    fn filled_width(self, percentage: f64, width: usize) -> usize {
        if width == 0 {
            return 0;
        }
        let raw = match self {
            FillPolicy::Nearest => (width as f64 * percentage / 100.0).round_ties_even(),
            FillPolicy::FloorByStep => {
                if percentage == 100.0 {
                    return width;
                }
                (percentage / (100.0 / width as f64)).floor()
            }
        };
        (raw.max(0.0) as usize).min(width)
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FillPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "nearest" => Ok(FillPolicy::Nearest),
            "floor-by-step" | "floor" => Ok(FillPolicy::FloorByStep),
            other => Err(format!(
                "unknown fill policy '{other}' (expected 'nearest' or 'floor-by-step')"
            )),
        }
    }
}

/// Shape of the rendered bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarConfig {
    #[serde(default = "BarConfig::default_width")]
    pub width: usize,
    #[serde(default = "BarConfig::default_filled")]
    pub filled: String,
    #[serde(default = "BarConfig::default_empty")]
    pub empty: String,
    #[serde(default)]
    pub policy: FillPolicy,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BAR_WIDTH,
            filled: Self::default_filled(),
            empty: Self::default_empty(),
            policy: FillPolicy::default(),
        }
    }
}

impl BarConfig {
    const fn default_width() -> usize {
        DEFAULT_BAR_WIDTH
    }

    fn default_filled() -> String {
        DEFAULT_FILLED_GLYPH.to_string()
    }

    fn default_empty() -> String {
        DEFAULT_EMPTY_GLYPH.to_string()
    }

    pub fn with_policy(mut self, policy: FillPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// A bar ready for display, e.g. `[🟩🟩🟩⬜⬜⬜⬜⬜⬜⬜] 27%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBar {
    pub text: String,
    pub filled_width: usize,
    pub empty_width: usize,
}

impl fmt::Display for RenderedBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render `percentage` as a bar. Total over every `f64`, NaN included.
///
/// The trailing label is always the nearest whole percent, so under
/// [`FillPolicy::FloorByStep`] it may read `100%` while the bar is one cell short.
pub fn render(percentage: f64, config: &BarConfig) -> RenderedBar {
    let percentage = clamp_percentage(percentage);
    let filled_width = config.policy.filled_width(percentage, config.width);
    let empty_width = config.width - filled_width;
    let label = percentage.round_ties_even() as u32;

    let mut text = String::with_capacity(
        2 + filled_width * config.filled.len() + empty_width * config.empty.len() + 6,
    );
    text.push('[');
    text.push_str(&config.filled.repeat(filled_width));
    text.push_str(&config.empty.repeat(empty_width));
    text.push_str("] ");
    text.push_str(&label.to_string());
    text.push('%');

    RenderedBar {
        text,
        filled_width,
        empty_width,
    }
}

fn clamp_percentage(percentage: f64) -> f64 {
    if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nearest(width: usize) -> BarConfig {
        BarConfig::default().with_width(width)
    }

    fn floor_by_step(width: usize) -> BarConfig {
        BarConfig::default()
            .with_width(width)
            .with_policy(FillPolicy::FloorByStep)
    }

    #[test]
    fn nearest_empty_bar() {
        assert_eq!(render(0.0, &nearest(10)).text, "[⬜⬜⬜⬜⬜⬜⬜⬜⬜⬜] 0%");
    }

    #[test]
    fn nearest_partial_bar() {
        let bar = render(27.0, &nearest(10));
        assert_eq!(bar.filled_width, 3);
        assert_eq!(bar.empty_width, 7);
        assert_eq!(bar.text, "[🟩🟩🟩⬜⬜⬜⬜⬜⬜⬜] 27%");
    }

    #[test]
    fn nearest_full_bar() {
        let bar = render(100.0, &nearest(10));
        assert_eq!(bar.filled_width, 10);
        assert_eq!(bar.text, "[🟩🟩🟩🟩🟩🟩🟩🟩🟩🟩] 100%");
    }

    #[test]
    fn nearest_rounds_ties_to_even() {
        assert_eq!(render(25.0, &nearest(10)).filled_width, 2);
        assert_eq!(render(35.0, &nearest(10)).filled_width, 4);
        assert!(render(50.5, &nearest(10)).text.ends_with(" 50%"));
        assert!(render(51.5, &nearest(10)).text.ends_with(" 52%"));
    }

    #[test]
    fn floor_by_step_saturates_at_hundred() {
        let bar = render(100.0, &floor_by_step(12));
        assert_eq!(bar.filled_width, 12);
        assert_eq!(bar.empty_width, 0);
    }

    #[test]
    fn floor_by_step_floors_below_first_step() {
        assert_eq!(render(8.3, &floor_by_step(12)).filled_width, 0);
        assert_eq!(render(8.34, &floor_by_step(12)).filled_width, 1);
    }

    #[test]
    fn floor_by_step_keeps_label_mismatch_near_full() {
        let bar = render(99.96, &floor_by_step(12));
        assert_eq!(bar.filled_width, 11);
        assert!(bar.text.ends_with("] 100%"));
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        for config in [nearest(10), floor_by_step(12)] {
            assert_eq!(render(-5.0, &config), render(0.0, &config));
            assert_eq!(render(150.0, &config), render(100.0, &config));
            assert_eq!(render(f64::NEG_INFINITY, &config), render(0.0, &config));
            assert_eq!(render(f64::INFINITY, &config), render(100.0, &config));
            assert_eq!(render(f64::NAN, &config), render(0.0, &config));
        }
    }

    #[test]
    fn fill_is_monotonic() {
        for config in [nearest(10), floor_by_step(12), nearest(7), floor_by_step(3)] {
            let mut previous = 0;
            for step in 0..=10_000 {
                let percentage = step as f64 / 100.0;
                let filled = render(percentage, &config).filled_width;
                assert!(filled >= previous, "{percentage} with {:?}", config.policy);
                assert!(filled <= config.width);
                previous = filled;
            }
        }
    }

    #[test]
    fn zero_width_renders_label_only() {
        let bar = render(42.0, &nearest(0));
        assert_eq!(bar.text, "[] 42%");
        assert_eq!(bar.filled_width, 0);
    }

    #[test]
    fn custom_glyphs() {
        let config = BarConfig {
            width: 4,
            filled: "#".to_string(),
            empty: ".".to_string(),
            policy: FillPolicy::Nearest,
        };
        assert_eq!(render(50.0, &config).text, "[##..] 50%");
    }

    #[test]
    fn policy_parses_from_cli_spelling() {
        assert_eq!("nearest".parse::<FillPolicy>(), Ok(FillPolicy::Nearest));
        assert_eq!(
            "FLOOR_BY_STEP".parse::<FillPolicy>(),
            Ok(FillPolicy::FloorByStep)
        );
        assert!("ceil".parse::<FillPolicy>().is_err());
    }
}
