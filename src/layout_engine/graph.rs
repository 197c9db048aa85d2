use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// The axis a split node divides its container along.
///
/// `Vertical` places the children side by side (left/right), `Horizontal`
/// stacks them (upper/lower).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitAxis {
    Vertical,
    Horizontal,
}

impl SplitAxis {
    pub fn flip(self) -> SplitAxis {
        match self {
            SplitAxis::Vertical => SplitAxis::Horizontal,
            SplitAxis::Horizontal => SplitAxis::Vertical,
        }
    }

    /// Picks vertical when the rectangle is at least `optimal_ratio` times as
    /// wide as it is tall. Ties resolve to vertical.
    pub fn optimal_for(rect: Rect, optimal_ratio: f64) -> SplitAxis {
        if rect.width >= rect.height * optimal_ratio {
            SplitAxis::Vertical
        } else {
            SplitAxis::Horizontal
        }
    }
}

/// A requested split axis. `Optimal` is never stored on a node.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[default]
    Optimal,
    Vertical,
    Horizontal,
}

impl SplitMode {
    /// Resolves the request. `Optimal` prefers `stored` and falls back to the
    /// aspect of `rect`.
    pub fn resolve(self, stored: Option<SplitAxis>, rect: Rect, optimal_ratio: f64) -> SplitAxis {
        match self {
            SplitMode::Vertical => SplitAxis::Vertical,
            SplitMode::Horizontal => SplitAxis::Horizontal,
            SplitMode::Optimal => {
                stored.unwrap_or_else(|| SplitAxis::optimal_for(rect, optimal_ratio))
            }
        }
    }
}

impl From<SplitAxis> for SplitMode {
    fn from(axis: SplitAxis) -> Self {
        match axis {
            SplitAxis::Vertical => SplitMode::Vertical,
            SplitAxis::Horizontal => SplitMode::Horizontal,
        }
    }
}

/// Which side of its parent's split produced a container.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerSide {
    #[default]
    None,
    Left,
    Right,
    Upper,
    Lower,
}

impl ContainerSide {
    pub fn of_child(axis: SplitAxis, child: Child) -> ContainerSide {
        match (axis, child) {
            (SplitAxis::Vertical, Child::First) => ContainerSide::Left,
            (SplitAxis::Vertical, Child::Second) => ContainerSide::Right,
            (SplitAxis::Horizontal, Child::First) => ContainerSide::Upper,
            (SplitAxis::Horizontal, Child::Second) => ContainerSide::Lower,
        }
    }

    pub fn is_first(self) -> bool { matches!(self, ContainerSide::Left | ContainerSide::Upper) }
}

/// Selects one of a split node's two children.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Child {
    First,
    #[default]
    Second,
}

impl Child {
    pub fn other(self) -> Child {
        match self {
            Child::First => Child::Second,
            Child::Second => Child::First,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod axis_operations {
        use super::*;

        #[test]
        fn flip() {
            assert_eq!(SplitAxis::Vertical.flip(), SplitAxis::Horizontal);
            assert_eq!(SplitAxis::Horizontal.flip(), SplitAxis::Vertical);
        }

        #[test]
        fn optimal_prefers_vertical_for_wide_and_square() {
            let wide = Rect::new(0.0, 0.0, 1600.0, 900.0);
            let square = Rect::new(0.0, 0.0, 800.0, 800.0);
            let tall = Rect::new(0.0, 0.0, 900.0, 1600.0);
            assert_eq!(SplitAxis::optimal_for(wide, 1.0), SplitAxis::Vertical);
            assert_eq!(SplitAxis::optimal_for(square, 1.0), SplitAxis::Vertical);
            assert_eq!(SplitAxis::optimal_for(tall, 1.0), SplitAxis::Horizontal);
        }

        #[test]
        fn optimal_ratio_raises_the_threshold() {
            let wide = Rect::new(0.0, 0.0, 1600.0, 1000.0);
            assert_eq!(SplitAxis::optimal_for(wide, 1.618), SplitAxis::Horizontal);
            assert_eq!(SplitAxis::optimal_for(wide, 1.5), SplitAxis::Vertical);
        }
    }

    mod mode_operations {
        use super::*;

        #[test]
        fn explicit_modes_ignore_stored_axis() {
            let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
            assert_eq!(
                SplitMode::Horizontal.resolve(Some(SplitAxis::Vertical), rect, 1.0),
                SplitAxis::Horizontal
            );
            assert_eq!(
                SplitMode::Vertical.resolve(None, rect, 1.0),
                SplitAxis::Vertical
            );
        }

        #[test]
        fn optimal_prefers_stored_axis() {
            let wide = Rect::new(0.0, 0.0, 1000.0, 100.0);
            assert_eq!(
                SplitMode::Optimal.resolve(Some(SplitAxis::Horizontal), wide, 1.0),
                SplitAxis::Horizontal
            );
            assert_eq!(SplitMode::Optimal.resolve(None, wide, 1.0), SplitAxis::Vertical);
        }
    }

    mod side_operations {
        use super::*;

        #[test]
        fn side_of_child() {
            use ContainerSide::*;
            assert_eq!(ContainerSide::of_child(SplitAxis::Vertical, Child::First), Left);
            assert_eq!(ContainerSide::of_child(SplitAxis::Vertical, Child::Second), Right);
            assert_eq!(ContainerSide::of_child(SplitAxis::Horizontal, Child::First), Upper);
            assert_eq!(ContainerSide::of_child(SplitAxis::Horizontal, Child::Second), Lower);
        }

        #[test]
        fn is_first() {
            assert!(ContainerSide::Left.is_first());
            assert!(ContainerSide::Upper.is_first());
            assert!(!ContainerSide::Right.is_first());
            assert!(!ContainerSide::Lower.is_first());
            assert!(!ContainerSide::None.is_first());
        }

        #[test]
        fn child_other() {
            assert_eq!(Child::First.other(), Child::Second);
            assert_eq!(Child::Second.other(), Child::First);
        }
    }
}
