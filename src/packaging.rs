//! Measuring fragment lists and setting their glue to a target width.

use crate::nodes::{Flex, FlexOrder, Fragment, GlueSpec};
use crate::scaled::{calculate_badness, Dimension, Scaled};

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Badness recorded for a line whose shrinkability is exceeded.
pub const OVERFULL_BAD: i32 = 1_000_000;

/// Stretchability collected separately per order of infinity, so that any
/// nonzero higher order can dominate without losing the lower-order
/// amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FlexTotals {
    pub normal: Scaled,
    pub fil: Scaled,
    pub fill: Scaled,
    pub filll: Scaled,
}

impl FlexTotals {
    pub const fn new() -> Self {
        Self {
            normal: 0,
            fil: 0,
            fill: 0,
            filll: 0,
        }
    }

    pub fn add_flex(&mut self, flex: Flex) {
        match flex.order {
            FlexOrder::Normal => self.normal += flex.value,
            FlexOrder::Fil => self.fil += flex.value,
            FlexOrder::Fill => self.fill += flex.value,
            FlexOrder::Filll => self.filll += flex.value,
        }
    }

    /// Reduces the totals to the dominating order.
    pub fn evaluate(&self) -> Flex {
        if self.filll != 0 {
            Flex::new(FlexOrder::Filll, self.filll)
        } else if self.fill != 0 {
            Flex::new(FlexOrder::Fill, self.fill)
        } else if self.fil != 0 {
            Flex::new(FlexOrder::Fil, self.fil)
        } else {
            Flex::new(FlexOrder::Normal, self.normal)
        }
    }
}

impl Add for FlexTotals {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            normal: self.normal + rhs.normal,
            fil: self.fil + rhs.fil,
            fill: self.fill + rhs.fill,
            filll: self.filll + rhs.filll,
        }
    }
}

impl AddAssign for FlexTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.normal += rhs.normal;
        self.fil += rhs.fil;
        self.fill += rhs.fill;
        self.filll += rhs.filll;
    }
}

impl Neg for FlexTotals {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            normal: -self.normal,
            fil: -self.fil,
            fill: -self.fill,
            filll: -self.filll,
        }
    }
}

impl Sub for FlexTotals {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            normal: self.normal - rhs.normal,
            fil: self.fil - rhs.fil,
            fill: self.fill - rhs.fill,
            filll: self.filll - rhs.filll,
        }
    }
}

impl SubAssign for FlexTotals {
    fn sub_assign(&mut self, rhs: Self) {
        self.normal -= rhs.normal;
        self.fil -= rhs.fil;
        self.fill -= rhs.fill;
        self.filll -= rhs.filll;
    }
}

/// Natural size and flexibility of a fragment list.
pub struct LineMeasure {
    pub natural: Dimension,
    pub stretch: Flex,
    pub shrink: Flex,
}

/// Sums the widths of a fragment list. Discretionaries contribute their
/// replacement text, since an unbroken discretionary keeps it.
pub fn measure_line(fragments: &[Fragment]) -> LineMeasure {
    let mut natural = 0;
    let mut stretch = FlexTotals::new();
    let mut shrink = FlexTotals::new();
    for fragment in fragments {
        match fragment {
            Fragment::Box(b) => natural += b.width,
            Fragment::Glue(spec) => {
                natural += spec.width;
                stretch.add_flex(spec.stretch);
                shrink.add_flex(spec.shrink);
            }
            Fragment::Kern(kern) => natural += kern.width,
            Fragment::Math(math) => natural += math.width,
            Fragment::Disc(disc) => natural += disc.no_break_width(),
            Fragment::Penalty(_) | Fragment::Migrating(_) => {}
        }
    }
    LineMeasure {
        natural,
        stretch: stretch.evaluate(),
        shrink: shrink.evaluate(),
    }
}

/// Removes migrating fragments from a line, preserving their order.
pub fn split_migrating_material(line: &mut Vec<Fragment>) -> Vec<Fragment> {
    let mut migrated = Vec::new();
    let mut i = 0;
    while i < line.len() {
        if matches!(line[i], Fragment::Migrating(_)) {
            migrated.push(line.remove(i));
        } else {
            i += 1;
        }
    }
    migrated
}

/// How the glue of a packed line is being set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlueSign {
    Normal,
    Stretching,
    Shrinking,
}

/// One justified output line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    /// The target width the line was packed to.
    pub width: Dimension,
    /// Left-edge offset from the paragraph shape.
    pub indent: Dimension,
    /// Fraction of the available flexibility each glue uses.
    pub glue_set: f64,
    pub glue_sign: GlueSign,
    pub glue_order: FlexOrder,
    /// Badness of setting this line; [`OVERFULL_BAD`] when the shrink was
    /// insufficient. Callers may surface a warning from this.
    pub badness: i32,
    pub contents: Vec<Fragment>,
}

/// Packs a fragment list to exactly `width`, distributing the excess or
/// deficit over the glue.
pub fn pack_line(contents: Vec<Fragment>, width: Dimension, indent: Dimension) -> LineBox {
    let measure = measure_line(&contents);
    let mut line = LineBox {
        width,
        indent,
        glue_set: 0.0,
        glue_sign: GlueSign::Normal,
        glue_order: FlexOrder::Normal,
        badness: 0,
        contents,
    };
    let excess = width - measure.natural;
    if excess > 0 {
        set_stretching(&mut line, measure.stretch, excess);
    } else if excess < 0 {
        set_shrinking(&mut line, measure.shrink, -excess);
    }
    line
}

fn set_stretching(line: &mut LineBox, stretch: Flex, excess: Dimension) {
    if stretch.value != 0 {
        line.glue_set = excess as f64 / stretch.value as f64;
        line.glue_order = stretch.order;
        line.glue_sign = GlueSign::Stretching;
    }
    // An empty line is never considered underfull.
    if !line.contents.is_empty() && stretch.order == FlexOrder::Normal {
        line.badness = calculate_badness(excess, stretch.value);
        if line.badness > 100 {
            log::warn!(
                "underfull line (badness {}): {} units of stretch missing",
                line.badness,
                excess
            );
        }
    }
}

fn set_shrinking(line: &mut LineBox, shrink: Flex, deficit: Dimension) {
    if shrink.order == FlexOrder::Normal && deficit > shrink.value {
        // Use all the shrink there is and let the line stick out.
        line.glue_set = 1.0;
        line.glue_sign = GlueSign::Shrinking;
        line.badness = OVERFULL_BAD;
        log::warn!("overfull line: {} units too wide", deficit - shrink.value);
        return;
    }
    if shrink.value != 0 {
        line.glue_set = deficit as f64 / shrink.value as f64;
        line.glue_order = shrink.order;
        line.glue_sign = GlueSign::Shrinking;
    }
    if shrink.order == FlexOrder::Normal {
        line.badness = calculate_badness(deficit, shrink.value);
        if line.badness > 100 {
            log::warn!("tight line (badness {})", line.badness);
        }
    }
}

/// The total width a glue fragment occupies inside a packed line.
pub fn set_glue_width(line: &LineBox, spec: &GlueSpec) -> Dimension {
    let (flex, sign) = match line.glue_sign {
        GlueSign::Normal => return spec.width,
        GlueSign::Stretching => (spec.stretch, 1),
        GlueSign::Shrinking => (spec.shrink, -1),
    };
    if flex.order != line.glue_order {
        return spec.width;
    }
    spec.width + sign * (line.glue_set * flex.value as f64) as Dimension
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::BoxFragment;

    fn word(width: Dimension) -> Fragment {
        Fragment::Box(BoxFragment::new(width))
    }

    #[test]
    fn flex_totals_dominating_order() {
        let mut totals = FlexTotals::new();
        totals.add_flex(Flex::finite(100));
        assert_eq!(totals.evaluate(), Flex::finite(100));
        totals.add_flex(Flex::new(FlexOrder::Fil, 3));
        assert_eq!(totals.evaluate(), Flex::new(FlexOrder::Fil, 3));
        totals.add_flex(Flex::new(FlexOrder::Filll, 1));
        assert_eq!(totals.evaluate(), Flex::new(FlexOrder::Filll, 1));
    }

    #[test]
    fn exact_fit_packs_with_no_glue_setting() {
        let line = pack_line(vec![word(60), Fragment::Glue(GlueSpec::fixed(40))], 100, 0);
        assert_eq!(line.glue_sign, GlueSign::Normal);
        assert_eq!(line.badness, 0);
    }

    #[test]
    fn stretching_to_target() {
        let line = pack_line(
            vec![word(60), Fragment::Glue(GlueSpec::new(20, 40, 0))],
            100,
            0,
        );
        assert_eq!(line.glue_sign, GlueSign::Stretching);
        assert_eq!(line.glue_set, 0.5);
        // Half the available stretch used: badness 12.
        assert_eq!(line.badness, 12);
        let spec = GlueSpec::new(20, 40, 0);
        assert_eq!(set_glue_width(&line, &spec), 40);
    }

    #[test]
    fn overfull_line_saturates_shrink() {
        let line = pack_line(
            vec![word(120), Fragment::Glue(GlueSpec::new(10, 0, 5))],
            100,
            0,
        );
        assert_eq!(line.glue_sign, GlueSign::Shrinking);
        assert_eq!(line.glue_set, 1.0);
        assert_eq!(line.badness, OVERFULL_BAD);
    }

    #[test]
    fn infinite_stretch_is_free() {
        let line = pack_line(vec![word(10), Fragment::Glue(GlueSpec::FIL)], 100, 0);
        assert_eq!(line.glue_order, FlexOrder::Fil);
        assert_eq!(line.badness, 0);
    }

    #[test]
    fn migrating_material_splits_off_in_order() {
        use crate::nodes::{MigratingFragment, MigratingKind};
        let mark = Fragment::Migrating(MigratingFragment {
            kind: MigratingKind::Mark,
            payload: 1,
        });
        let ins = Fragment::Migrating(MigratingFragment {
            kind: MigratingKind::Insertion,
            payload: 2,
        });
        let mut line = vec![word(10), mark.clone(), word(20), ins.clone()];
        let migrated = split_migrating_material(&mut line);
        assert_eq!(line, vec![word(10), word(20)]);
        assert_eq!(migrated, vec![mark, ins]);
    }
}
