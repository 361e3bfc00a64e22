//! The list of currently viable breakpoints.
//!
//! Active records are kept in a single sequence interleaved with delta
//! entries. Each delta holds the difference in width totals between the
//! lines that start at the surrounding active records, so that walking the
//! list keeps a running set of totals current with a handful of additions
//! instead of remeasuring from every breakpoint.

use crate::nodes::GlueSpec;
use crate::packaging::FlexTotals;
use crate::scaled::Dimension;

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Width totals of a stretch of material: natural width, stretchability by
/// order, and finite shrinkability.
///
/// Shrinkability needs no orders here. Infinite shrink in a paragraph is an
/// input error that gets corrected to finite before any totals are formed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WidthTotals {
    pub natural: Dimension,
    pub stretch: FlexTotals,
    pub shrink: Dimension,
}

impl WidthTotals {
    pub const fn new() -> Self {
        Self {
            natural: 0,
            stretch: FlexTotals::new(),
            shrink: 0,
        }
    }

    pub fn add_glue(&mut self, spec: &GlueSpec) {
        self.natural += spec.width;
        self.stretch.add_flex(spec.stretch);
        self.shrink += spec.shrink.value;
    }
}

impl Add for WidthTotals {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            natural: self.natural + rhs.natural,
            stretch: self.stretch + rhs.stretch,
            shrink: self.shrink + rhs.shrink,
        }
    }
}

impl AddAssign for WidthTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.natural += rhs.natural;
        self.stretch += rhs.stretch;
        self.shrink += rhs.shrink;
    }
}

impl Sub for WidthTotals {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            natural: self.natural - rhs.natural,
            stretch: self.stretch - rhs.stretch,
            shrink: self.shrink - rhs.shrink,
        }
    }
}

impl SubAssign for WidthTotals {
    fn sub_assign(&mut self, rhs: Self) {
        self.natural -= rhs.natural;
        self.stretch -= rhs.stretch;
        self.shrink -= rhs.shrink;
    }
}

impl Neg for WidthTotals {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            natural: -self.natural,
            stretch: -self.stretch,
            shrink: -self.shrink,
        }
    }
}

/// How loosely or tightly a line would be set, quantized into the four
/// classes that the adjacency demerits compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fitness {
    /// Stretched with badness 100 or more.
    VeryLoose,
    /// Stretched with badness 13 to 99.
    Loose,
    /// Badness 12 or less.
    Decent,
    /// Shrunk with badness 13 or more.
    Tight,
}

impl Fitness {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] =
        [Self::VeryLoose, Self::Loose, Self::Decent, Self::Tight];

    pub fn index(self) -> usize {
        match self {
            Self::VeryLoose => 0,
            Self::Loose => 1,
            Self::Decent => 2,
            Self::Tight => 3,
        }
    }

    pub fn is_adjacent_to(self, other: Self) -> bool {
        self.index().abs_diff(other.index()) <= 1
    }
}

/// What kind of break an active record represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakClass {
    Unhyphenated,
    /// A break at a discretionary.
    Hyphenated,
    /// The artificial record planted on the final pass when nothing is
    /// feasible.
    Final,
}

/// A breakpoint that lines may still legally start from.
#[derive(Clone, Copy, Debug)]
pub struct ActiveNode {
    pub fitness: Fitness,
    pub class: BreakClass,
    /// Index into the passive arena of the break this record stands at, or
    /// `None` for the start of the paragraph.
    pub break_node: Option<usize>,
    /// Number of the line ending at this break, counted from the top of the
    /// enclosing context.
    pub line_number: usize,
    /// Best total demerits of any breaking of the paragraph up to here.
    pub total_demerits: i32,
}

/// A recorded breakpoint, kept for path reconstruction after its active
/// record is gone.
#[derive(Clone, Copy, Debug)]
pub struct PassiveNode {
    /// Position of the break in the fragment sequence.
    pub break_pos: usize,
    pub serial: usize,
    /// The passive record of the break preceding this one on the chosen
    /// path, or `None` for the paragraph start.
    pub prev_break: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
pub enum ListEntry {
    Active(ActiveNode),
    Delta(WidthTotals),
}

/// The interleaved sequence of active and delta records.
///
/// The first entry, when any exists, is always active; the position one
/// past the end acts as the list terminator. Consecutive deltas never
/// survive an update, they are merged on the spot.
#[derive(Debug, Default)]
pub struct BreakList {
    pub entries: Vec<ListEntry>,
}

impl BreakList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the active record at `i`, restoring the delta invariants.
    ///
    /// `cur_active_width` must hold the totals current at `i`;
    /// `active_width` the totals current at the head of the list. Both are
    /// updated to stay accurate. Returns the index the walk continues at.
    pub fn remove_active(
        &mut self,
        i: usize,
        cur_active_width: &mut WidthTotals,
        active_width: &mut WidthTotals,
    ) -> usize {
        debug_assert!(matches!(self.entries[i], ListEntry::Active(_)));
        self.entries.remove(i);
        if i == 0 {
            // The head must stay active; fold a leading delta away.
            if let Some(ListEntry::Delta(d)) = self.entries.first().copied() {
                *active_width += d;
                *cur_active_width = *active_width;
                self.entries.remove(0);
            }
            return 0;
        }
        if let ListEntry::Delta(prev) = self.entries[i - 1] {
            if i == self.entries.len() {
                // Nothing follows; the trailing delta serves no one.
                *cur_active_width -= prev;
                self.entries.remove(i - 1);
                return i - 1;
            }
            if let ListEntry::Delta(next) = self.entries[i] {
                *cur_active_width += next;
                if let ListEntry::Delta(d) = &mut self.entries[i - 1] {
                    *d += next;
                }
                self.entries.remove(i);
            }
        }
        i
    }

    /// Re-derives the width totals current at entry `i` by summing the
    /// deltas from the head, given the totals at the head.
    #[cfg(test)]
    pub fn resummed_width(&self, i: usize, head_width: WidthTotals) -> WidthTotals {
        let mut width = head_width;
        for entry in &self.entries[..i] {
            if let ListEntry::Delta(d) = entry {
                width += *d;
            }
        }
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(natural: Dimension, stretch: Dimension, shrink: Dimension) -> WidthTotals {
        WidthTotals {
            natural,
            stretch: FlexTotals {
                normal: stretch,
                ..FlexTotals::new()
            },
            shrink,
        }
    }

    fn active(line_number: usize) -> ListEntry {
        ListEntry::Active(ActiveNode {
            fitness: Fitness::Decent,
            class: BreakClass::Unhyphenated,
            break_node: None,
            line_number,
            total_demerits: 0,
        })
    }

    fn assert_alternating(list: &BreakList) {
        let mut prev_was_delta = true;
        for entry in &list.entries {
            match entry {
                ListEntry::Active(_) => prev_was_delta = true,
                ListEntry::Delta(_) => {
                    assert!(prev_was_delta, "two consecutive deltas");
                    prev_was_delta = false;
                }
            }
        }
        if let Some(first) = list.entries.first() {
            assert!(matches!(first, ListEntry::Active(_)), "head must be active");
        }
    }

    #[test]
    fn width_totals_algebra() {
        let a = totals(100, 30, 10);
        let b = totals(40, 5, 2);
        assert_eq!(a + b, totals(140, 35, 12));
        assert_eq!(a - b, totals(60, 25, 8));
        assert_eq!(-b, totals(-40, -5, -2));
        let mut c = a;
        c += b;
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn fitness_adjacency() {
        assert!(Fitness::Loose.is_adjacent_to(Fitness::Decent));
        assert!(Fitness::Decent.is_adjacent_to(Fitness::Decent));
        assert!(!Fitness::VeryLoose.is_adjacent_to(Fitness::Decent));
        assert!(!Fitness::Tight.is_adjacent_to(Fitness::Loose));
    }

    #[test]
    fn removing_head_folds_following_delta() {
        let mut list = BreakList {
            entries: vec![active(1), ListEntry::Delta(totals(50, 10, 5)), active(2)],
        };
        let mut active_width = totals(200, 40, 20);
        let mut cur = active_width;
        let next = list.remove_active(0, &mut cur, &mut active_width);
        assert_eq!(next, 0);
        assert_eq!(active_width, totals(250, 50, 25));
        assert_eq!(cur, active_width);
        assert_eq!(list.entries.len(), 1);
        assert_alternating(&list);
    }

    #[test]
    fn removing_last_drops_trailing_delta() {
        let d = totals(50, 10, 5);
        let mut list = BreakList {
            entries: vec![active(1), ListEntry::Delta(d), active(2)],
        };
        let mut active_width = totals(200, 40, 20);
        let mut cur = active_width + d;
        let next = list.remove_active(2, &mut cur, &mut active_width);
        assert_eq!(next, 1);
        assert_eq!(cur, totals(200, 40, 20));
        assert_eq!(list.entries.len(), 1);
        assert_alternating(&list);
    }

    #[test]
    fn removing_between_deltas_merges_them() {
        let d1 = totals(50, 10, 5);
        let d2 = totals(30, 6, 3);
        let mut list = BreakList {
            entries: vec![
                active(1),
                ListEntry::Delta(d1),
                active(2),
                ListEntry::Delta(d2),
                active(3),
            ],
        };
        let head = totals(200, 40, 20);
        let mut active_width = head;
        let mut cur = head + d1;
        let next = list.remove_active(2, &mut cur, &mut active_width);
        assert_eq!(next, 2);
        assert_eq!(cur, head + d1 + d2);
        assert_eq!(list.entries.len(), 3);
        assert_alternating(&list);
        // The surviving delta must carry the walk to the same totals as
        // before the removal.
        assert_eq!(list.resummed_width(2, head), cur);
    }

    #[test]
    fn removal_between_actives_changes_nothing_else() {
        let mut list = BreakList {
            entries: vec![active(1), active(2), active(3)],
        };
        let head = totals(200, 40, 20);
        let mut active_width = head;
        let mut cur = head;
        let next = list.remove_active(1, &mut cur, &mut active_width);
        assert_eq!(next, 1);
        assert_eq!(cur, head);
        assert_eq!(list.entries.len(), 2);
        assert_alternating(&list);
    }
}
