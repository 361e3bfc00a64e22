//! The fragment model a paragraph is made of.
//!
//! A paragraph reaches the breaker as a flat `Vec<Fragment>`. Boxes are
//! opaque: glyph metrics, ligatures and kerning pairs have already been
//! resolved by the caller, so all the breaker ever sees of them is a width.

use crate::scaled::{Dimension, Scaled, UNITY};

/// One element of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// An opaque box: a glyph run, a rule, or a nested box. Never a
    /// breakpoint, never discarded.
    Box(BoxFragment),
    /// Stretchable and shrinkable space. A legal breakpoint when preceded
    /// by a non-discardable fragment outside a formula.
    Glue(GlueSpec),
    /// A fixed width adjustment. Explicit kerns behave like glue for
    /// discarding; implicit (font) kerns stick to their neighbors.
    Kern(KernFragment),
    /// Attractiveness of breaking here. Values of [`INF_PENALTY`] or more
    /// forbid a break, values of [`EJECT_PENALTY`] or less force one.
    ///
    /// [`INF_PENALTY`]: crate::INF_PENALTY
    /// [`EJECT_PENALTY`]: crate::EJECT_PENALTY
    Penalty(i32),
    /// A discretionary break, usually a hyphenation point.
    Disc(DiscFragment),
    /// A formula boundary. Glue between an `On` and an `Off` marker is not
    /// break-eligible.
    Math(MathFragment),
    /// Material that contributes no width and migrates out of the line it
    /// is found in: marks, insertions and vertical adjustments.
    Migrating(MigratingFragment),
}

impl Fragment {
    /// Whether a glue fragment directly following this one is a legal
    /// breakpoint.
    pub fn precedes_break(&self) -> bool {
        match self {
            Self::Box(_) | Self::Disc(_) | Self::Migrating(_) => true,
            Self::Kern(kern) => kern.kind == KernKind::Implicit,
            Self::Glue(_) | Self::Penalty(_) | Self::Math(_) => false,
        }
    }

    /// Whether this fragment vanishes when a line break occurs just before
    /// it.
    pub fn is_discardable(&self) -> bool {
        match self {
            Self::Glue(_) | Self::Penalty(_) | Self::Math(_) => true,
            Self::Kern(kern) => kern.kind == KernKind::Explicit,
            Self::Box(_) | Self::Disc(_) | Self::Migrating(_) => false,
        }
    }
}

/// An opaque box of known width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxFragment {
    pub width: Dimension,
}

impl BoxFragment {
    pub fn new(width: Dimension) -> Self {
        Self { width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernFragment {
    pub kind: KernKind,
    pub width: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernKind {
    /// Inserted by the font (ligature/kern program); not discardable.
    Implicit,
    /// Requested by the input; discardable, and a glue fragment after it
    /// is a legal breakpoint.
    Explicit,
}

/// The three-way alternative of a discretionary break.
///
/// When the break is taken, `pre_break` ends the line and `post_break`
/// starts the next one; when it is not, `no_break` stands in for both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscFragment {
    pub pre_break: Vec<DiscItem>,
    pub post_break: Vec<DiscItem>,
    pub no_break: Vec<DiscItem>,
}

impl DiscFragment {
    /// The width the discretionary adds to a line that breaks at it: the
    /// pre-break text plus the post-break text minus the replaced text.
    pub fn break_width_delta(&self) -> Dimension {
        let pre: Dimension = self.pre_break.iter().map(DiscItem::width).sum();
        let post: Dimension = self.post_break.iter().map(DiscItem::width).sum();
        let replaced: Dimension = self.no_break.iter().map(DiscItem::width).sum();
        pre + post - replaced
    }

    pub fn pre_break_width(&self) -> Dimension {
        self.pre_break.iter().map(DiscItem::width).sum()
    }

    pub fn no_break_width(&self) -> Dimension {
        self.no_break.iter().map(DiscItem::width).sum()
    }
}

/// Material allowed inside a discretionary: boxes and kerns only, so a
/// discretionary can never nest another breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscItem {
    Box(BoxFragment),
    Kern(KernFragment),
}

impl DiscItem {
    pub fn width(&self) -> Dimension {
        match self {
            Self::Box(b) => b.width,
            Self::Kern(k) => k.width,
        }
    }

    pub fn into_fragment(self) -> Fragment {
        match self {
            Self::Box(b) => Fragment::Box(b),
            Self::Kern(k) => Fragment::Kern(k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathFragment {
    pub kind: MathKind,
    /// Surrounding space carried by the marker.
    pub width: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    /// Entering a formula; suspends automatic breaking at glue.
    On,
    /// Leaving a formula; resumes automatic breaking.
    Off,
}

/// Zero-width material relocated to the enclosing output sequence next to
/// the line it occurred in. The payload is an opaque handle meaningful only
/// to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigratingFragment {
    pub kind: MigratingKind,
    pub payload: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigratingKind {
    Mark,
    Insertion,
    Adjustment,
}

/// A glue value: natural width plus stretchability and shrinkability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlueSpec {
    pub width: Dimension,
    pub stretch: Flex,
    pub shrink: Flex,
}

impl GlueSpec {
    pub const ZERO: Self = Self {
        width: 0,
        stretch: Flex::ZERO,
        shrink: Flex::ZERO,
    };

    /// First-order infinitely stretchable glue, the conventional paragraph
    /// fill.
    pub const FIL: Self = Self {
        width: 0,
        stretch: Flex {
            order: FlexOrder::Fil,
            value: UNITY,
        },
        shrink: Flex::ZERO,
    };

    /// Fixed glue with no flexibility at all.
    pub fn fixed(width: Dimension) -> Self {
        Self {
            width,
            stretch: Flex::ZERO,
            shrink: Flex::ZERO,
        }
    }

    pub fn new(width: Dimension, stretch: Scaled, shrink: Scaled) -> Self {
        Self {
            width,
            stretch: Flex::finite(stretch),
            shrink: Flex::finite(shrink),
        }
    }

    /// Returns a copy whose shrinkability has been forced finite, keeping
    /// the value.
    pub fn finite_shrink(&self) -> Self {
        Self {
            width: self.width,
            stretch: self.stretch,
            shrink: Flex::finite(self.shrink.value),
        }
    }
}

/// A flexible amount: a value together with its order of infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flex {
    pub order: FlexOrder,
    pub value: Scaled,
}

impl Flex {
    pub const ZERO: Self = Self {
        order: FlexOrder::Normal,
        value: 0,
    };

    pub const fn finite(value: Scaled) -> Self {
        Self {
            order: FlexOrder::Normal,
            value,
        }
    }

    pub const fn new(order: FlexOrder, value: Scaled) -> Self {
        Self { order, value }
    }

    pub fn is_infinite(&self) -> bool {
        self.order != FlexOrder::Normal && self.value != 0
    }
}

/// Orders of infinity for glue flexibility. Any nonzero amount of a higher
/// order completely dominates all lower orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexOrder {
    #[default]
    Normal,
    Fil,
    Fill,
    Filll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_predicates() {
        let word = Fragment::Box(BoxFragment::new(100));
        let space = Fragment::Glue(GlueSpec::fixed(10));
        let implicit = Fragment::Kern(KernFragment {
            kind: KernKind::Implicit,
            width: 2,
        });
        let explicit = Fragment::Kern(KernFragment {
            kind: KernKind::Explicit,
            width: 2,
        });

        assert!(word.precedes_break());
        assert!(implicit.precedes_break());
        assert!(!explicit.precedes_break());
        assert!(!space.precedes_break());

        assert!(space.is_discardable());
        assert!(explicit.is_discardable());
        assert!(!implicit.is_discardable());
        assert!(!word.is_discardable());
        assert!(Fragment::Penalty(0).is_discardable());
    }

    #[test]
    fn disc_break_width_delta() {
        let disc = DiscFragment {
            pre_break: vec![DiscItem::Box(BoxFragment::new(5))],
            post_break: vec![DiscItem::Box(BoxFragment::new(3))],
            no_break: vec![DiscItem::Box(BoxFragment::new(7))],
        };
        assert_eq!(disc.break_width_delta(), 5 + 3 - 7);
        assert_eq!(disc.pre_break_width(), 5);
        assert_eq!(disc.no_break_width(), 7);
    }

    #[test]
    fn infinite_shrink_detection() {
        let bad = GlueSpec {
            width: 0,
            stretch: Flex::ZERO,
            shrink: Flex::new(FlexOrder::Fil, UNITY),
        };
        assert!(bad.shrink.is_infinite());
        let fixed = bad.finite_shrink();
        assert!(!fixed.shrink.is_infinite());
        assert_eq!(fixed.shrink.value, UNITY);
    }
}
