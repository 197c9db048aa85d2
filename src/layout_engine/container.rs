//! Pure container computation.
//!
//! Every container in a tree is a function of the root container and the
//! (ratio, axis, side) triples on the path down to it. Nothing here looks at a
//! previously computed child container, so repeated recomputation never
//! accumulates rounding error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::graph::{Child, ContainerSide, SplitAxis};
use crate::common::config::{InnerGaps, OuterGaps, SpaceSettings};
use crate::sys::geometry::Rect;

pub const MIN_SPLIT_RATIO: f64 = 0.05;
pub const MAX_SPLIT_RATIO: f64 = 0.95;

/// The region assigned to a tree node or window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Container {
    pub rect: Rect,
    pub side: ContainerSide,
}

impl Container {
    pub fn new(rect: Rect, side: ContainerSide) -> Self { Container { rect, side } }
}

/// The per-space values container computation depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilingParams {
    pub padding: OuterGaps,
    pub gaps: InnerGaps,
    pub split_ratio: f64,
    pub optimal_ratio: f64,
}

impl Default for TilingParams {
    fn default() -> Self {
        TilingParams {
            padding: OuterGaps::default(),
            gaps: InnerGaps::default(),
            split_ratio: 0.5,
            optimal_ratio: 1.0,
        }
    }
}

impl From<&SpaceSettings> for TilingParams {
    fn from(settings: &SpaceSettings) -> Self {
        let optimal_ratio = if settings.optimal_ratio.is_finite() && settings.optimal_ratio > 0.0 {
            settings.optimal_ratio
        } else {
            warn!(ratio = settings.optimal_ratio, "invalid optimal ratio, using 1.0");
            1.0
        };
        TilingParams {
            padding: settings.outer,
            gaps: settings.inner,
            split_ratio: normalize_ratio(settings.split_ratio, 0.5),
            optimal_ratio,
        }
    }
}

/// Maps a requested ratio onto the valid range.
///
/// `0.0` (and NaN) mean "unset" and resolve to `default`; anything else is
/// clamped to `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`.
pub fn normalize_ratio(ratio: f64, default: f64) -> f64 {
    if ratio == 0.0 || ratio.is_nan() {
        return default;
    }
    let clamped = ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
    if clamped != ratio {
        warn!(ratio, clamped, "split ratio out of range");
    }
    clamped
}

/// Shrinks the usable screen rectangle by the configured padding. Padding
/// larger than the rectangle leaves an empty container inside it.
pub fn root_container(usable: Rect, padding: &OuterGaps) -> Container {
    Container::new(
        Rect::new(
            (usable.x + padding.left).min(usable.max_x()),
            (usable.y + padding.top).min(usable.max_y()),
            (usable.width - padding.left - padding.right).max(0.0),
            (usable.height - padding.top - padding.bottom).max(0.0),
        ),
        ContainerSide::None,
    )
}

/// Computes the container of one child of a split.
///
/// A gap wider than the split extent collapses the child to zero size; the
/// second child is then pinned to the far edge of the parent.
pub fn child_container(
    parent: Rect,
    ratio: f64,
    axis: SplitAxis,
    gaps: &InnerGaps,
    child: Child,
) -> Container {
    let side = ContainerSide::of_child(axis, child);
    let rect = match side {
        ContainerSide::Left => Rect::new(
            parent.x,
            parent.y,
            (parent.width * ratio - gaps.vertical / 2.0).max(0.0),
            parent.height,
        ),
        ContainerSide::Right => Rect::new(
            (parent.x + parent.width * ratio + gaps.vertical / 2.0).min(parent.max_x()),
            parent.y,
            (parent.width * (1.0 - ratio) - gaps.vertical / 2.0).max(0.0),
            parent.height,
        ),
        ContainerSide::Upper => Rect::new(
            parent.x,
            parent.y,
            parent.width,
            (parent.height * ratio - gaps.horizontal / 2.0).max(0.0),
        ),
        ContainerSide::Lower => Rect::new(
            parent.x,
            (parent.y + parent.height * ratio + gaps.horizontal / 2.0).min(parent.max_y()),
            parent.width,
            (parent.height * (1.0 - ratio) - gaps.horizontal / 2.0).max(0.0),
        ),
        ContainerSide::None => unreachable!("a split child always has a side"),
    };
    Container::new(rect, side)
}

/// Computes the containers of both children of a split.
pub fn compute_child_containers(
    parent: Rect,
    ratio: f64,
    axis: SplitAxis,
    gaps: &InnerGaps,
) -> (Container, Container) {
    (
        child_container(parent, ratio, axis, gaps, Child::First),
        child_container(parent, ratio, axis, gaps, Child::Second),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::geometry::IsWithin;

    fn gaps(vertical: f64, horizontal: f64) -> InnerGaps { InnerGaps { vertical, horizontal } }

    #[test]
    fn vertical_split_with_gap() {
        let parent = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let (left, right) =
            compute_child_containers(parent, 0.5, SplitAxis::Vertical, &gaps(10.0, 0.0));
        assert_eq!(left, Container::new(Rect::new(0.0, 0.0, 495.0, 800.0), ContainerSide::Left));
        assert_eq!(
            right,
            Container::new(Rect::new(505.0, 0.0, 495.0, 800.0), ContainerSide::Right)
        );
    }

    #[test]
    fn horizontal_split_uses_horizontal_gap() {
        let parent = Rect::new(100.0, 50.0, 600.0, 400.0);
        let (upper, lower) =
            compute_child_containers(parent, 0.25, SplitAxis::Horizontal, &gaps(99.0, 20.0));
        assert_eq!(upper.side, ContainerSide::Upper);
        assert_eq!(lower.side, ContainerSide::Lower);
        assert_eq!(upper.rect, Rect::new(100.0, 50.0, 600.0, 90.0));
        assert_eq!(lower.rect, Rect::new(100.0, 160.0, 600.0, 290.0));
    }

    #[test]
    fn root_from_usable_rect_and_padding() {
        let padding = OuterGaps {
            top: 10.0,
            bottom: 10.0,
            left: 20.0,
            right: 20.0,
        };
        let root = root_container(Rect::new(0.0, 0.0, 1000.0, 800.0), &padding);
        assert_eq!(root.rect, Rect::new(20.0, 10.0, 960.0, 780.0));
        assert_eq!(root.side, ContainerSide::None);
    }

    #[test]
    fn children_tile_parent_for_all_ratios() {
        let parent = Rect::new(13.0, 7.0, 1437.0, 893.0);
        let gaps = gaps(12.0, 6.0);
        for step in 1..100 {
            let ratio = step as f64 / 100.0;
            for axis in [SplitAxis::Vertical, SplitAxis::Horizontal] {
                let (a, b) = compute_child_containers(parent, ratio, axis, &gaps);
                assert_eq!(a.rect.intersection(&b.rect).area(), 0.0);
                match axis {
                    SplitAxis::Vertical => {
                        assert!(a.rect.min_x().is_within(1e-6, parent.min_x()));
                        assert!(b.rect.max_x().is_within(1e-6, parent.max_x()));
                        assert!((b.rect.min_x() - a.rect.max_x()).is_within(1e-6, gaps.vertical));
                        assert_eq!(a.rect.height, parent.height);
                        assert_eq!(b.rect.height, parent.height);
                    }
                    SplitAxis::Horizontal => {
                        assert!(a.rect.min_y().is_within(1e-6, parent.min_y()));
                        assert!(b.rect.max_y().is_within(1e-6, parent.max_y()));
                        assert!((b.rect.min_y() - a.rect.max_y()).is_within(1e-6, gaps.horizontal));
                        assert_eq!(a.rect.width, parent.width);
                        assert_eq!(b.rect.width, parent.width);
                    }
                }
            }
        }
    }

    #[test]
    fn oversized_gap_clamps_to_empty() {
        let parent = Rect::new(0.0, 0.0, 10.0, 10.0);
        let (left, right) =
            compute_child_containers(parent, 0.5, SplitAxis::Vertical, &gaps(40.0, 0.0));
        assert_eq!(left.rect, Rect::new(0.0, 0.0, 0.0, 10.0));
        assert_eq!(right.rect, Rect::new(10.0, 0.0, 0.0, 10.0));

        let (upper, lower) =
            compute_child_containers(parent, 0.3, SplitAxis::Horizontal, &gaps(0.0, 40.0));
        assert_eq!(upper.rect, Rect::new(0.0, 0.0, 10.0, 0.0));
        assert_eq!(lower.rect, Rect::new(0.0, 10.0, 10.0, 0.0));
        for child in [left, right, upper, lower] {
            assert_eq!(child.rect.intersection(&parent), child.rect);
        }
    }

    #[test]
    fn oversized_padding_stays_inside_usable_rect() {
        let padding = OuterGaps { top: 10.0, bottom: 10.0, left: 60.0, right: 10.0 };
        let usable = Rect::new(100.0, 200.0, 50.0, 50.0);
        let root = root_container(usable, &padding);
        assert_eq!(root.rect, Rect::new(150.0, 210.0, 0.0, 30.0));
        assert_eq!(root.rect.intersection(&usable), root.rect);
    }

    #[test]
    fn normalize_ratio_handles_sentinel_and_bounds() {
        assert_eq!(normalize_ratio(0.0, 0.6), 0.6);
        assert_eq!(normalize_ratio(f64::NAN, 0.6), 0.6);
        assert_eq!(normalize_ratio(0.3, 0.6), 0.3);
        assert_eq!(normalize_ratio(1.5, 0.6), MAX_SPLIT_RATIO);
        assert_eq!(normalize_ratio(-0.2, 0.6), MIN_SPLIT_RATIO);
        assert_eq!(normalize_ratio(1.0, 0.6), MAX_SPLIT_RATIO);
    }

    #[test]
    fn params_from_degenerate_settings() {
        let settings = SpaceSettings {
            split_ratio: 3.0,
            optimal_ratio: -1.0,
            ..Default::default()
        };
        let params = TilingParams::from(&settings);
        assert_eq!(params.split_ratio, MAX_SPLIT_RATIO);
        assert_eq!(params.optimal_ratio, 1.0);
    }
}
