use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::layout_engine::SplitMode;
use crate::layout_engine::container::{MAX_SPLIT_RATIO, MIN_SPLIT_RATIO};
use crate::layout_engine::workspaces::SpaceId;

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".partition") }
pub fn layouts_dir() -> PathBuf { data_dir().join("layouts") }
pub fn layout_file(name: &str) -> PathBuf { layouts_dir().join(format!("{name}.ron")) }
pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("partition")
        .join("config.toml")
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    settings: Settings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,
}

/// Tiling mode of a space.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpaceMode {
    /// Binary space partitioning
    #[default]
    Bsp,
    /// Every window shares the root container
    Monocle,
    /// Windows are not tiled
    Float,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default)]
    pub mode: SpaceMode,
    /// Fraction of a split given to the first (left/upper) child
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    /// Axis used when a window is inserted and no axis is requested
    #[serde(default)]
    pub split_mode: SplitMode,
    /// Width/height ratio at or above which the optimal axis is vertical
    #[serde(default = "default_optimal_ratio")]
    pub optimal_ratio: f64,
    /// Place new windows in the first child of a split instead of the second
    #[serde(default)]
    pub spawn_as_left_child: bool,
    #[serde(default)]
    pub gaps: GapSettings,
    /// Per-screen and per-desktop overrides
    #[serde(default)]
    pub spaces: Vec<SpaceRule>,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Padding between the tiled area and the screen edges
    #[serde(default)]
    pub outer: OuterGaps,
    /// Gaps between sibling containers
    #[serde(default)]
    pub inner: InnerGaps,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Gap between the left and right children of a vertical split
    #[serde(default)]
    pub vertical: f64,
    /// Gap between the upper and lower children of a horizontal split
    #[serde(default)]
    pub horizontal: f64,
}

/// Overrides for one screen, or for one desktop on a screen when `desktop` is
/// set. Unset fields fall back to the global layout settings.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SpaceRule {
    pub screen: u32,
    #[serde(default)]
    pub desktop: Option<u32>,
    #[serde(default)]
    pub mode: Option<SpaceMode>,
    #[serde(default)]
    pub split_ratio: Option<f64>,
    #[serde(default)]
    pub outer: Option<OuterGaps>,
    #[serde(default)]
    pub inner: Option<InnerGaps>,
    /// Display name of the space
    #[serde(default)]
    pub name: Option<String>,
    /// Named layout loaded from the layouts directory when the space activates
    #[serde(default)]
    pub layout: Option<String>,
}

/// Settings in effect for a single space.
#[derive(Debug, PartialEq, Clone)]
pub struct SpaceSettings {
    pub mode: SpaceMode,
    pub split_ratio: f64,
    pub split_mode: SplitMode,
    pub optimal_ratio: f64,
    pub spawn_as_left_child: bool,
    pub outer: OuterGaps,
    pub inner: InnerGaps,
    pub name: Option<String>,
    pub layout: Option<String>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mode: SpaceMode::default(),
            split_ratio: default_split_ratio(),
            split_mode: SplitMode::default(),
            optimal_ratio: default_optimal_ratio(),
            spawn_as_left_child: false,
            gaps: GapSettings::default(),
            spaces: Vec::new(),
        }
    }
}

impl Default for SpaceSettings {
    fn default() -> Self { LayoutSettings::default().effective_for_space(SpaceId::new(0, 0)) }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Some(issue) = check_split_ratio("split_ratio", self.split_ratio) {
            issues.push(issue);
        }

        if self.optimal_ratio.is_nan() || self.optimal_ratio <= 0.0 {
            issues.push(format!(
                "optimal_ratio must be positive, got {}",
                self.optimal_ratio
            ));
        }

        issues.extend(self.gaps.validate());

        let mut seen = crate::common::collections::HashSet::default();
        for (index, rule) in self.spaces.iter().enumerate() {
            if !seen.insert((rule.screen, rule.desktop)) {
                issues.push(match rule.desktop {
                    Some(desktop) => format!(
                        "spaces[{index}] duplicates the rule for screen {} desktop {desktop}",
                        rule.screen
                    ),
                    None => format!(
                        "spaces[{index}] duplicates the rule for screen {}",
                        rule.screen
                    ),
                });
            }
            if let Some(ratio) = rule.split_ratio
                && let Some(issue) = check_split_ratio("split_ratio", ratio)
            {
                issues.push(format!("spaces[{index}] {issue}"));
            }
            if let Some(outer) = &rule.outer {
                for issue in outer.validate() {
                    issues.push(format!("spaces[{index}] {issue}"));
                }
            }
            if let Some(inner) = &rule.inner {
                for issue in inner.validate() {
                    issues.push(format!("spaces[{index}] {issue}"));
                }
            }
            if rule.layout.as_deref().is_some_and(str::is_empty) {
                issues.push(format!("spaces[{index}] layout name must not be empty"));
            }
        }

        issues
    }

    /// Returns the rule for `space`: an exact (screen, desktop) match wins over
    /// a screen-wide rule.
    pub fn rule_for_space(&self, space: SpaceId) -> Option<&SpaceRule> {
        self.spaces
            .iter()
            .find(|r| r.screen == space.screen && r.desktop == Some(space.desktop))
            .or_else(|| self.spaces.iter().find(|r| r.screen == space.screen && r.desktop.is_none()))
    }

    pub fn effective_for_space(&self, space: SpaceId) -> SpaceSettings {
        let mut resolved = SpaceSettings {
            mode: self.mode,
            split_ratio: self.split_ratio,
            split_mode: self.split_mode,
            optimal_ratio: self.optimal_ratio,
            spawn_as_left_child: self.spawn_as_left_child,
            outer: self.gaps.outer,
            inner: self.gaps.inner,
            name: None,
            layout: None,
        };
        if let Some(rule) = self.rule_for_space(space) {
            if let Some(mode) = rule.mode {
                resolved.mode = mode;
            }
            if let Some(ratio) = rule.split_ratio {
                resolved.split_ratio = ratio;
            }
            if let Some(outer) = rule.outer {
                resolved.outer = outer;
            }
            if let Some(inner) = rule.inner {
                resolved.inner = inner;
            }
            resolved.name = rule.name.clone();
            resolved.layout = rule.layout.clone();
        }
        resolved
    }
}

fn check_split_ratio(field: &str, ratio: f64) -> Option<String> {
    if ratio > 0.0 && ratio < 1.0 {
        if !(MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&ratio) {
            return Some(format!(
                "{field} {ratio} will be clamped to [{MIN_SPLIT_RATIO}, {MAX_SPLIT_RATIO}]"
            ));
        }
        None
    } else {
        Some(format!("{field} must be between 0 and 1 (exclusive), got {ratio}"))
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.outer.validate());
        issues.extend(self.inner.validate());
        issues
    }
}

impl OuterGaps {
    /// Validates outer gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in [
            ("top", self.top),
            ("left", self.left),
            ("bottom", self.bottom),
            ("right", self.right),
        ] {
            if value < 0.0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }

        issues
    }
}

impl InnerGaps {
    /// Validates inner gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.vertical < 0.0 {
            issues.push(format!(
                "inner.vertical gap must be non-negative, got {}",
                self.vertical
            ));
        }

        if self.horizontal < 0.0 {
            issues.push(format!(
                "inner.horizontal gap must be non-negative, got {}",
                self.horizontal
            ));
        }

        issues
    }
}

fn default_split_ratio() -> f64 { 0.5 }

fn default_optimal_ratio() -> f64 { 1.0 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../partition.default.toml"))
            .expect("embedded default config must parse")
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.layout.validate() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<ConfigFile>(buf) {
            Ok(c) => Ok(Config { settings: c.settings }),
            Err(e) => bail!("{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Expected no issues, got: {:?}", issues);
        assert_eq!(config.settings.layout.split_ratio, 0.5);
        assert_eq!(config.settings.layout.mode, SpaceMode::Bsp);
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [settings.layout]
            mode = "monocle"
            split_ratio = 0.6
            split_mode = "horizontal"
            optimal_ratio = 1.618
            spawn_as_left_child = true

            [settings.layout.gaps.outer]
            top = 10
            bottom = 10
            left = 20
            right = 20

            [settings.layout.gaps.inner]
            vertical = 10
            horizontal = 8

            [[settings.layout.spaces]]
            screen = 1
            mode = "float"

            [[settings.layout.spaces]]
            screen = 1
            desktop = 2
            mode = "bsp"
            name = "code"
            layout = "editor"
            "#,
        )
        .unwrap();
        let layout = &config.settings.layout;
        assert_eq!(layout.mode, SpaceMode::Monocle);
        assert_eq!(layout.split_mode, SplitMode::Horizontal);
        assert!(layout.spawn_as_left_child);
        assert_eq!(layout.gaps.outer.left, 20.0);
        assert_eq!(layout.gaps.inner.horizontal, 8.0);
        assert_eq!(layout.spaces.len(), 2);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Config::parse("[settings.layout]\nsplit_raito = 0.5\n").unwrap_err();
        assert!(err.to_string().contains("split_raito"), "{err}");
    }

    #[test]
    fn test_split_ratio_validation() {
        let mut layout = LayoutSettings::default();
        layout.split_ratio = 1.0;
        assert_eq!(layout.validate().len(), 1);
        layout.split_ratio = 0.0;
        assert_eq!(layout.validate().len(), 1);
        layout.split_ratio = 0.99;
        assert!(layout.validate()[0].contains("clamped"));
        layout.split_ratio = 0.3;
        assert!(layout.validate().is_empty());
    }

    #[test]
    fn test_optimal_ratio_validation() {
        let mut layout = LayoutSettings::default();
        layout.optimal_ratio = 0.0;
        assert_eq!(layout.validate().len(), 1);
        layout.optimal_ratio = f64::NAN;
        assert_eq!(layout.validate().len(), 1);
    }

    #[test]
    fn test_outer_gaps_validation_negative_values() {
        let gaps = OuterGaps {
            top: -1.0,
            left: -2.0,
            bottom: -3.0,
            right: -4.0,
        };
        assert_eq!(4, gaps.validate().len());
    }

    #[test]
    fn test_inner_gaps_validation_negative_values() {
        let gaps = InnerGaps { vertical: -1.0, horizontal: -2.0 };
        assert_eq!(2, gaps.validate().len());
    }

    #[test]
    fn test_duplicate_space_rules() {
        let mut layout = LayoutSettings::default();
        layout.spaces = vec![
            SpaceRule { screen: 1, desktop: Some(2), ..Default::default() },
            SpaceRule { screen: 1, desktop: Some(2), ..Default::default() },
            SpaceRule { screen: 1, ..Default::default() },
        ];
        let issues = layout.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("spaces[1]"));
    }

    #[test]
    fn test_space_rule_issues_are_prefixed() {
        let mut layout = LayoutSettings::default();
        layout.spaces = vec![SpaceRule {
            screen: 3,
            split_ratio: Some(2.0),
            inner: Some(InnerGaps { vertical: -1.0, horizontal: 0.0 }),
            layout: Some(String::new()),
            ..Default::default()
        }];
        let issues = layout.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.starts_with("spaces[0]")));
    }

    #[test]
    fn test_effective_for_space_precedence() {
        let mut layout = LayoutSettings::default();
        layout.gaps.inner = InnerGaps { vertical: 4.0, horizontal: 4.0 };
        layout.spaces = vec![
            SpaceRule {
                screen: 1,
                mode: Some(SpaceMode::Monocle),
                inner: Some(InnerGaps { vertical: 8.0, horizontal: 8.0 }),
                name: Some("screen".into()),
                ..Default::default()
            },
            SpaceRule {
                screen: 1,
                desktop: Some(3),
                mode: Some(SpaceMode::Float),
                name: Some("desktop".into()),
                ..Default::default()
            },
        ];

        let exact = layout.effective_for_space(SpaceId::new(1, 3));
        assert_eq!(exact.mode, SpaceMode::Float);
        assert_eq!(exact.name.as_deref(), Some("desktop"));
        // The exact rule does not set gaps, so the global value applies.
        assert_eq!(exact.inner.vertical, 4.0);

        let screen = layout.effective_for_space(SpaceId::new(1, 1));
        assert_eq!(screen.mode, SpaceMode::Monocle);
        assert_eq!(screen.inner.vertical, 8.0);
        assert_eq!(screen.name.as_deref(), Some("screen"));

        let global = layout.effective_for_space(SpaceId::new(2, 1));
        assert_eq!(global.mode, SpaceMode::Bsp);
        assert_eq!(global.inner.vertical, 4.0);
        assert_eq!(global.name, None);
    }

    #[test]
    fn test_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.layout.split_ratio = 0.4;
        config.settings.layout.spaces.push(SpaceRule {
            screen: 2,
            desktop: Some(1),
            mode: Some(SpaceMode::Monocle),
            ..Default::default()
        });
        config.save(&path).unwrap();
        assert_eq!(Config::read(&path).unwrap(), config);
    }

    #[test]
    fn test_space_mode_display() {
        assert_eq!(SpaceMode::Bsp.to_string(), "bsp");
        assert_eq!(SpaceMode::Monocle.to_string(), "monocle");
        assert_eq!(SpaceMode::Float.to_string(), "float");
        assert_eq!("monocle".parse::<SpaceMode>(), Ok(SpaceMode::Monocle));
        assert!("tabbed".parse::<SpaceMode>().is_err());
    }
}
