//! Breaking a paragraph into lines of minimal total demerits.
//!
//! The paragraph arrives as a flat fragment sequence and leaves as a
//! sequence of packed lines with penalties between them. Candidate
//! breakings are explored with dynamic programming over an active list of
//! still-viable breakpoints; up to three passes are made, each with a more
//! permissive notion of a feasible line than the one before.

use crate::active_list::{
    ActiveNode, BreakClass, BreakList, Fitness, ListEntry, PassiveNode, WidthTotals,
};
use crate::hyphenation::{HyphenationError, Hyphenator};
use crate::nodes::{
    DiscItem, Fragment, GlueSpec, KernFragment, KernKind, MathFragment, MathKind,
    MigratingFragment,
};
use crate::packaging::{pack_line, split_migrating_material, LineBox};
use crate::params::BreakerParams;
use crate::scaled::{Dimension, INF_BAD};

use log::{debug, trace, warn};
use thiserror::Error;

/// Penalties of this magnitude or more forbid a break.
pub const INF_PENALTY: i32 = INF_BAD;
/// Penalties of this magnitude or less force a break.
pub const EJECT_PENALTY: i32 = -INF_PENALTY;

/// Demerits worse than any breaking the algorithm can actually produce.
const AWFUL_BAD: i32 = 0o7777777777;

#[derive(Debug, Error)]
pub enum BreakError {
    /// The hyphenator reported a failure; the paragraph is left unbroken.
    #[error("hyphenation failed: {0}")]
    Hyphenation(HyphenationError),
    /// An internal consistency check failed. Indicates a bug in the
    /// breaker, not in the input.
    #[error("line breaking confusion: {0}")]
    Confusion(&'static str),
}

/// The broken paragraph: lines, inter-line penalties and material that
/// migrated out of the lines, in output order.
#[derive(Debug)]
pub struct BrokenParagraph {
    pub items: Vec<VItem>,
    /// The line counter after this paragraph, for the caller to feed back
    /// in as `prev_graf` when more material joins the same context.
    pub prev_graf: usize,
}

#[derive(Debug)]
pub enum VItem {
    Line(LineBox),
    Penalty(i32),
    Migrating(MigratingFragment),
}

/// Breaks a paragraph into lines.
///
/// The fragment sequence is consumed; trailing glue is removed and the
/// paragraph fill glue from `params` is appended before breaking, as a
/// break at the very end must always be possible. Even an empty sequence
/// produces one line, holding nothing but the margin glues.
pub fn break_paragraph(
    mut fragments: Vec<Fragment>,
    params: &BreakerParams,
    hyphenator: &mut dyn Hyphenator,
) -> Result<BrokenParagraph, BreakError> {
    let mut breaker = LineBreaker::new(params);
    breaker.ensure_finite_shrink(&mut fragments);
    breaker.prepare_paragraph(&mut fragments);
    let best_bet = breaker.find_breakpoints(&mut fragments, hyphenator)?;
    breaker.post_line_break(fragments, &best_bet)
}

#[derive(Debug, Clone, Copy)]
enum BreakType {
    Unhyphenated,
    Hyphenated {
        /// Width change of the line when the break is taken: pre-break
        /// plus post-break text minus the replaced text.
        disc_break_width: Dimension,
        post_break_empty: bool,
    },
    Final,
}

impl BreakType {
    fn class(self) -> BreakClass {
        match self {
            Self::Unhyphenated => BreakClass::Unhyphenated,
            Self::Hyphenated { .. } => BreakClass::Hyphenated,
            Self::Final => BreakClass::Final,
        }
    }
}

struct LineBreaker<'a> {
    params: &'a BreakerParams,
    /// Edge glues with any infinite shrinkage already corrected.
    left_skip: GlueSpec,
    right_skip: GlueSpec,
    par_fill_skip: GlueSpec,

    cur_pos: usize,

    /// Line number beyond which all lines have the same width; lets the
    /// walk skip per-line-number bookkeeping once passed.
    easy_line: usize,
    last_special_line: usize,
    first_width: Dimension,
    first_indent: Dimension,
    second_width: Dimension,
    second_indent: Dimension,

    second_pass: bool,
    final_pass: bool,
    threshold: i32,
    /// Positions at or before this have already been offered to the
    /// hyphenator; a restarted scan must not offer them again.
    last_hyphenated: usize,

    minimum_demerits: i32,
    minimal_demerits: [i32; Fitness::COUNT],
    best_place: [Option<usize>; Fitness::COUNT],
    best_pl_line: [usize; Fitness::COUNT],

    list: BreakList,
    passive: Vec<PassiveNode>,

    /// Width totals from the break at the head of the list to `cur_pos`.
    active_width: WidthTotals,
    /// The width totals of a line holding nothing but the edge glues.
    background: WidthTotals,
    /// Totals a line starting at the breakpoint under consideration would
    /// open with; cached across the fitness classes of one `try_break`.
    break_width: WidthTotals,
}

impl<'a> LineBreaker<'a> {
    fn new(params: &'a BreakerParams) -> Self {
        Self {
            params,
            left_skip: params.left_skip,
            right_skip: params.right_skip,
            par_fill_skip: params.par_fill_skip,
            cur_pos: 0,
            easy_line: 0,
            last_special_line: 0,
            first_width: 0,
            first_indent: 0,
            second_width: 0,
            second_indent: 0,
            second_pass: false,
            final_pass: false,
            threshold: 0,
            last_hyphenated: 0,
            minimum_demerits: AWFUL_BAD,
            minimal_demerits: [AWFUL_BAD; Fitness::COUNT],
            best_place: [None; Fitness::COUNT],
            best_pl_line: [0; Fitness::COUNT],
            list: BreakList::new(),
            passive: Vec::new(),
            active_width: WidthTotals::new(),
            background: WidthTotals::new(),
            break_width: WidthTotals::new(),
        }
    }

    /// Infinite shrinkability would let a line of any length collapse to
    /// fit. It is corrected to a finite amount of the same value and the
    /// paragraph is processed normally.
    fn ensure_finite_shrink(&mut self, fragments: &mut [Fragment]) {
        let mut found_shrink_error = false;
        if self.left_skip.shrink.is_infinite() {
            found_shrink_error = true;
            self.left_skip = self.left_skip.finite_shrink();
        }
        if self.right_skip.shrink.is_infinite() {
            found_shrink_error = true;
            self.right_skip = self.right_skip.finite_shrink();
        }
        if self.par_fill_skip.shrink.is_infinite() {
            found_shrink_error = true;
            self.par_fill_skip = self.par_fill_skip.finite_shrink();
        }
        for fragment in fragments {
            if let Fragment::Glue(spec) = fragment {
                if spec.shrink.is_infinite() {
                    found_shrink_error = true;
                    *spec = spec.finite_shrink();
                }
            }
        }
        if found_shrink_error {
            warn!("infinite glue shrinkage found in a paragraph; made finite");
        }
    }

    fn prepare_paragraph(&mut self, fragments: &mut Vec<Fragment>) {
        // A trailing space is never a breakpoint.
        if let Some(Fragment::Glue(_)) = fragments.last() {
            fragments.pop();
        }

        // Append an infinite penalty followed by the paragraph fill glue
        // such that the latter is never a breakpoint.
        fragments.push(Fragment::Penalty(INF_PENALTY));
        fragments.push(Fragment::Glue(self.par_fill_skip));

        self.background = WidthTotals::new();
        self.background.add_glue(&self.left_skip);
        self.background.add_glue(&self.right_skip);
        self.minimum_demerits = AWFUL_BAD;
        self.minimal_demerits = [AWFUL_BAD; Fitness::COUNT];
        self.determine_line_classes();
    }

    /// Determine how many lines get special treatment and the
    /// corresponding widths and indentations.
    fn determine_line_classes(&mut self) {
        let par_shape = &self.params.par_shape;
        // Without an explicit paragraph shape the hanging indentation
        // settings decide.
        if par_shape.is_empty() {
            if self.params.hang_indent == 0 {
                self.last_special_line = 0;
                self.second_width = self.params.hsize;
                self.second_indent = 0;
            } else {
                self.prepare_hanging_indentation();
            }
        } else {
            // The last shape entry is the default format for all further
            // lines.
            self.last_special_line = par_shape.len() - 1;
            self.second_width = par_shape[self.last_special_line].1;
            self.second_indent = par_shape[self.last_special_line].0;
        }
        if self.params.looseness == 0 {
            self.easy_line = self.last_special_line;
        } else {
            self.easy_line = usize::MAX;
        }
    }

    /// If `hang_after` is non-negative, all lines after line `hang_after`
    /// are indented, otherwise the first `|hang_after|` lines are. The
    /// indentation is on the left for non-negative `hang_indent`,
    /// otherwise on the right.
    fn prepare_hanging_indentation(&mut self) {
        let hang_indent = self.params.hang_indent;
        let hang_after = self.params.hang_after;
        let hsize = self.params.hsize;
        self.last_special_line = hang_after.unsigned_abs() as usize;
        if hang_after < 0 {
            self.first_width = hsize - hang_indent.abs();
            self.first_indent = if hang_indent >= 0 { hang_indent } else { 0 };
            self.second_width = hsize;
            self.second_indent = 0;
        } else {
            self.first_width = hsize;
            self.first_indent = 0;
            self.second_width = hsize - hang_indent.abs();
            self.second_indent = if hang_indent >= 0 { hang_indent } else { 0 };
        }
    }

    /// Runs up to three passes over the paragraph and returns the active
    /// record of the winning breaking.
    fn find_breakpoints(
        &mut self,
        fragments: &mut Vec<Fragment>,
        hyphenator: &mut dyn Hyphenator,
    ) -> Result<ActiveNode, BreakError> {
        self.threshold = self.params.pretolerance;
        if self.threshold >= 0 {
            debug!("first pass, badness threshold {}", self.threshold);
            self.second_pass = false;
            self.final_pass = false;
        } else {
            self.threshold = self.params.tolerance;
            self.second_pass = true;
            self.final_pass = self.params.emergency_stretch <= 0;
            debug!("skipping first pass, badness threshold {}", self.threshold);
        }

        loop {
            if self.threshold > INF_BAD {
                self.threshold = INF_BAD;
            }

            self.start_pass();
            let mut auto_breaking = true;
            // The position of the last fragment that was stepped over;
            // ensures glue at the very start of the paragraph is not a
            // breakpoint.
            let mut prev_pos = 0;
            while self.cur_pos < fragments.len() && !self.list.is_empty() {
                self.scan_fragment(fragments, hyphenator, &mut auto_breaking, &mut prev_pos)?;
            }
            if self.cur_pos == fragments.len() {
                if let Some(best_bet) = self.try_final_break(fragments) {
                    return Ok(best_bet);
                }
            }

            if !self.second_pass {
                debug!("second pass, badness threshold {}", self.params.tolerance);
                self.threshold = self.params.tolerance;
                self.second_pass = true;
                self.final_pass = self.params.emergency_stretch <= 0;
            } else if !self.final_pass {
                debug!(
                    "emergency pass, extra stretch {}",
                    self.params.emergency_stretch
                );
                self.background.stretch.normal += self.params.emergency_stretch;
                self.final_pass = true;
            } else {
                // The final pass plants an artificial break rather than
                // run out of alternatives, so this cannot be reached.
                return Err(BreakError::Confusion("final pass found no breaking"));
            }
        }
    }

    /// Resets the per-pass state and plants the active record representing
    /// the beginning of the paragraph.
    fn start_pass(&mut self) {
        self.cur_pos = 0;
        self.list.entries.clear();
        self.passive.clear();
        self.list.entries.push(ListEntry::Active(ActiveNode {
            fitness: Fitness::Decent,
            class: BreakClass::Unhyphenated,
            break_node: None,
            line_number: self.params.prev_graf + 1,
            total_demerits: 0,
        }));
        self.active_width = self.background;
    }

    /// Steps over the fragment at `cur_pos`, trying a break where one is
    /// legal and keeping the running width totals current.
    fn scan_fragment(
        &mut self,
        fragments: &mut Vec<Fragment>,
        hyphenator: &mut dyn Hyphenator,
        auto_breaking: &mut bool,
        prev_pos: &mut usize,
    ) -> Result<(), BreakError> {
        let mut hyphenate_following_word = false;
        match &fragments[self.cur_pos] {
            Fragment::Box(b) => {
                self.active_width.natural += b.width;
            }
            Fragment::Glue(spec) => {
                if *auto_breaking && fragments[*prev_pos].precedes_break() {
                    self.try_break(fragments, 0, BreakType::Unhyphenated);
                }
                self.active_width.add_glue(spec);
                if self.second_pass && *auto_breaking {
                    hyphenate_following_word = true;
                }
            }
            Fragment::Kern(kern) => {
                if kern.kind == KernKind::Explicit {
                    self.kern_break(fragments, *auto_breaking);
                }
                self.active_width.natural += kern.width;
            }
            Fragment::Disc(disc) => {
                let break_type = BreakType::Hyphenated {
                    disc_break_width: disc.break_width_delta(),
                    post_break_empty: disc.post_break.is_empty(),
                };
                if disc.pre_break.is_empty() {
                    self.try_break(fragments, self.params.ex_hyphen_penalty, break_type);
                } else {
                    let pre_width = disc.pre_break_width();
                    self.active_width.natural += pre_width;
                    self.try_break(fragments, self.params.hyphen_penalty, break_type);
                    self.active_width.natural -= pre_width;
                }
                let no_break_width = disc.no_break_width();
                self.active_width.natural += no_break_width;
            }
            Fragment::Math(math) => {
                *auto_breaking = math.kind == MathKind::Off;
                self.kern_break(fragments, *auto_breaking);
                self.active_width.natural += math.width;
            }
            Fragment::Penalty(penalty) => {
                self.try_break(fragments, *penalty, BreakType::Unhyphenated);
            }
            Fragment::Migrating(_) => {}
        }
        *prev_pos = self.cur_pos;
        self.cur_pos += 1;

        if hyphenate_following_word && self.cur_pos > self.last_hyphenated {
            self.last_hyphenated = self.cur_pos;
            hyphenator
                .hyphenate_word(fragments, self.cur_pos, self.params)
                .map_err(BreakError::Hyphenation)?;
        }
        Ok(())
    }

    /// A kern or formula boundary is a breakpoint when glue follows
    /// directly.
    fn kern_break(&mut self, fragments: &[Fragment], auto_breaking: bool) {
        if auto_breaking {
            if let Some(Fragment::Glue(_)) = fragments.get(self.cur_pos + 1) {
                self.try_break(fragments, 0, BreakType::Unhyphenated);
            }
        }
    }

    /// Considers a break at `cur_pos` with penalty `pi` against every
    /// active record, recording feasible combinations and deactivating
    /// records whose line can no longer reach this far.
    fn try_break(&mut self, fragments: &[Fragment], mut pi: i32, break_type: BreakType) {
        if pi.abs() >= INF_PENALTY {
            if pi > 0 {
                return;
            }
            pi = EJECT_PENALTY;
        }

        let mut no_break_yet = true;
        let mut cur_active_width = self.active_width;
        let mut old_l = 0;
        let mut line_width = 0;
        let mut i = 0;
        loop {
            while let Some(&ListEntry::Delta(d)) = self.list.entries.get(i) {
                cur_active_width += d;
                i += 1;
            }
            let Some(&ListEntry::Active(active)) = self.list.entries.get(i) else {
                break;
            };

            let l = active.line_number;
            if l > old_l {
                if self.minimum_demerits < AWFUL_BAD && old_l != self.easy_line {
                    i = self.create_new_actives(
                        fragments,
                        i,
                        cur_active_width,
                        &mut no_break_yet,
                        break_type,
                    );
                }
                line_width = self.line_width_for(l, &mut old_l);
            }

            let shortfall = line_width - cur_active_width.natural;
            let (b, fit_class) = if shortfall > 0 {
                Self::badness_for_stretching(&cur_active_width, shortfall)
            } else {
                Self::badness_for_shrinking(&cur_active_width, shortfall)
            };

            // b exceeds INF_BAD only when the line cannot be shrunk to the
            // target width.
            if b > INF_BAD {
                if self.is_desperate(i) {
                    self.record_artificial_break(fragments, &active, fit_class, l, b, pi);
                }
                i = self
                    .list
                    .remove_active(i, &mut cur_active_width, &mut self.active_width);
            } else if pi == EJECT_PENALTY {
                if self.is_desperate(i) {
                    self.record_artificial_break(fragments, &active, fit_class, l, b, pi);
                } else if b <= self.threshold {
                    self.record_feasible_break(fragments, &active, break_type, fit_class, l, b, pi);
                }
                // A forced break leaves nothing to continue from.
                i = self
                    .list
                    .remove_active(i, &mut cur_active_width, &mut self.active_width);
            } else {
                if b <= self.threshold {
                    self.record_feasible_break(fragments, &active, break_type, fit_class, l, b, pi);
                }
                i += 1;
            }
        }
        if self.minimum_demerits < AWFUL_BAD {
            let end = self.list.entries.len();
            self.create_new_actives(fragments, end, cur_active_width, &mut no_break_yet, break_type);
        }
    }

    /// On the final pass the very last surviving record may not be
    /// deactivated without a replacement, or the paragraph would have no
    /// breaking at all.
    fn is_desperate(&self, i: usize) -> bool {
        self.final_pass
            && self.minimum_demerits == AWFUL_BAD
            && i == 0
            && self.list.entries.len() == 1
    }

    /// Turns the demerit minima collected per fitness class into new
    /// active records, inserted before entry `i`. Returns the index the
    /// entry previously at `i` has moved to.
    fn create_new_actives(
        &mut self,
        fragments: &[Fragment],
        mut i: usize,
        cur_active_width: WidthTotals,
        no_break_yet: &mut bool,
        break_type: BreakType,
    ) -> usize {
        if *no_break_yet {
            self.break_width = self.compute_break_width(fragments, break_type);
            *no_break_yet = false;
        }

        // Bring the delta bookkeeping in line with the insertion point.
        if i == 0 {
            self.active_width = self.break_width;
        } else if let ListEntry::Delta(d) = &mut self.list.entries[i - 1] {
            *d += self.break_width - cur_active_width;
        } else {
            self.list
                .entries
                .insert(i, ListEntry::Delta(self.break_width - cur_active_width));
            i += 1;
        }

        let adj_demerits = self.params.adj_demerits;
        let demerits_bound = if adj_demerits.abs() >= AWFUL_BAD - self.minimum_demerits {
            AWFUL_BAD - 1
        } else {
            self.minimum_demerits + adj_demerits.abs()
        };

        for fitness in Fitness::ALL {
            let fit_class = fitness.index();
            if self.minimal_demerits[fit_class] <= demerits_bound {
                let passive = PassiveNode {
                    break_pos: self.cur_pos,
                    serial: self.passive.len() + 1,
                    prev_break: self.best_place[fit_class],
                };
                self.passive.push(passive);

                let active = ActiveNode {
                    break_node: Some(self.passive.len() - 1),
                    line_number: self.best_pl_line[fit_class] + 1,
                    fitness,
                    class: break_type.class(),
                    total_demerits: self.minimal_demerits[fit_class],
                };
                trace!(
                    "@@{}: line {}.{}{} t={} -> @@{}",
                    passive.serial,
                    active.line_number - 1,
                    fit_class,
                    match break_type {
                        BreakType::Hyphenated { .. } | BreakType::Final => "-",
                        BreakType::Unhyphenated => "",
                    },
                    active.total_demerits,
                    self.serial_of(passive.prev_break),
                );
                self.list.entries.insert(i, ListEntry::Active(active));
                i += 1;
            }
            self.minimal_demerits[fit_class] = AWFUL_BAD;
        }
        self.minimum_demerits = AWFUL_BAD;

        if i < self.list.entries.len() {
            self.list
                .entries
                .insert(i, ListEntry::Delta(cur_active_width - self.break_width));
            i += 1;
        }
        i
    }

    /// Width totals a line starting at the current breakpoint opens with:
    /// the edge glues, any discretionary texts, minus whatever material
    /// the break discards.
    fn compute_break_width(&mut self, fragments: &[Fragment], break_type: BreakType) -> WidthTotals {
        let mut break_width = self.background;
        match break_type {
            BreakType::Hyphenated {
                disc_break_width,
                post_break_empty,
            } => {
                break_width.natural += disc_break_width;
                if post_break_empty {
                    break_width -= self.discardable_width_after(fragments, self.cur_pos + 1);
                }
            }
            BreakType::Unhyphenated => {
                break_width -= self.discardable_width_after(fragments, self.cur_pos);
            }
            BreakType::Final => {}
        }
        break_width
    }

    /// Totals of the discardable run from `pos` to the first fragment that
    /// survives a break.
    fn discardable_width_after(&self, fragments: &[Fragment], mut pos: usize) -> WidthTotals {
        let mut discardable_width = WidthTotals::new();
        while pos < fragments.len() {
            match &fragments[pos] {
                Fragment::Glue(spec) => discardable_width.add_glue(spec),
                Fragment::Penalty(_) => {}
                Fragment::Math(math) => discardable_width.natural += math.width,
                Fragment::Kern(kern) => {
                    if kern.kind != KernKind::Explicit {
                        break;
                    }
                    discardable_width.natural += kern.width;
                }
                _ => break,
            }
            pos += 1;
        }
        discardable_width
    }

    fn line_width_for(&self, l: usize, old_l: &mut usize) -> Dimension {
        if l > self.easy_line {
            *old_l = usize::MAX - 1;
            self.second_width
        } else {
            *old_l = l;
            if l > self.last_special_line {
                self.second_width
            } else if self.params.par_shape.is_empty() {
                self.first_width
            } else {
                self.params.par_shape[l - 1].1
            }
        }
    }

    fn badness_for_stretching(cur_active_width: &WidthTotals, shortfall: Dimension) -> (i32, Fitness) {
        let stretch = cur_active_width.stretch.evaluate();
        if stretch.order == crate::nodes::FlexOrder::Normal {
            // Guard the badness computation against overflow.
            if shortfall > 7_230_584 && stretch.value < 1_663_497 {
                return (INF_BAD, Fitness::VeryLoose);
            }
            let b = crate::scaled::calculate_badness(shortfall, stretch.value);
            let fit_class = if b > 99 {
                Fitness::VeryLoose
            } else if b > 12 {
                Fitness::Loose
            } else {
                Fitness::Decent
            };
            (b, fit_class)
        } else {
            (0, Fitness::Decent)
        }
    }

    fn badness_for_shrinking(cur_active_width: &WidthTotals, shortfall: Dimension) -> (i32, Fitness) {
        let b = if -shortfall > cur_active_width.shrink {
            INF_BAD + 1
        } else {
            crate::scaled::calculate_badness(-shortfall, cur_active_width.shrink)
        };
        let fit_class = if b > 12 { Fitness::Tight } else { Fitness::Decent };
        (b, fit_class)
    }

    fn record_feasible_break(
        &mut self,
        fragments: &[Fragment],
        active: &ActiveNode,
        break_type: BreakType,
        fit_class: Fitness,
        l: usize,
        b: i32,
        pi: i32,
    ) {
        let mut demerits = self.compute_demerits(b, pi, active, break_type, fit_class);
        trace!(
            "@{} via @@{} b={} p={} d={}",
            self.break_site(fragments),
            self.serial_of(active.break_node),
            b,
            pi,
            demerits,
        );
        demerits += active.total_demerits;
        self.update_minima(demerits, active, fit_class, l);
    }

    /// The forced break of a desperate final pass gets zero demerits; its
    /// badness is beyond measuring anyway.
    fn record_artificial_break(
        &mut self,
        fragments: &[Fragment],
        active: &ActiveNode,
        fit_class: Fitness,
        l: usize,
        b: i32,
        pi: i32,
    ) {
        trace!(
            "@{} via @@{} b={} p={} d=*",
            self.break_site(fragments),
            self.serial_of(active.break_node),
            if b > INF_BAD { "*".to_string() } else { b.to_string() },
            pi,
        );
        self.update_minima(active.total_demerits, active, fit_class, l);
    }

    fn update_minima(&mut self, demerits: i32, active: &ActiveNode, fit_class: Fitness, l: usize) {
        let fit_class = fit_class.index();
        if demerits <= self.minimal_demerits[fit_class] {
            self.minimal_demerits[fit_class] = demerits;
            self.best_place[fit_class] = active.break_node;
            self.best_pl_line[fit_class] = l;
            if demerits < self.minimum_demerits {
                self.minimum_demerits = demerits;
            }
        }
    }

    fn compute_demerits(
        &self,
        b: i32,
        pi: i32,
        active: &ActiveNode,
        break_type: BreakType,
        fit_class: Fitness,
    ) -> i32 {
        let mut demerits = self.params.line_penalty + b;
        if demerits.abs() >= 10_000 {
            demerits = 100_000_000;
        } else {
            demerits *= demerits;
        }
        if pi != 0 {
            if pi > 0 {
                demerits += pi * pi;
            } else if pi > EJECT_PENALTY {
                demerits -= pi * pi;
            }
        }
        if active.class == BreakClass::Hyphenated {
            match break_type {
                BreakType::Hyphenated { .. } => demerits += self.params.double_hyphen_demerits,
                BreakType::Final => demerits += self.params.final_hyphen_demerits,
                BreakType::Unhyphenated => {}
            }
        }
        if !fit_class.is_adjacent_to(active.fitness) {
            demerits += self.params.adj_demerits;
        }
        demerits
    }

    fn serial_of(&self, break_node: Option<usize>) -> usize {
        match break_node {
            None => 0,
            Some(i) => self.passive[i].serial,
        }
    }

    fn break_site(&self, fragments: &[Fragment]) -> &'static str {
        match fragments.get(self.cur_pos) {
            None => "paragraph end",
            Some(Fragment::Glue(_)) => "glue",
            Some(Fragment::Penalty(_)) => "penalty",
            Some(Fragment::Disc(_)) => "discretionary",
            Some(Fragment::Kern(_)) => "kern",
            Some(Fragment::Math(_)) => "math",
            Some(_) => "fragment",
        }
    }

    /// Forces a break at the end of the paragraph and picks the winning
    /// record, honoring the looseness request. `None` means the pass
    /// failed and a more permissive one must follow.
    fn try_final_break(&mut self, fragments: &[Fragment]) -> Option<ActiveNode> {
        self.try_break(fragments, EJECT_PENALTY, BreakType::Final);
        let best_bet = self.fewest_demerits()?;
        if self.params.looseness == 0 {
            return Some(best_bet);
        }
        let best_loose_bet = self.best_for_looseness(&best_bet);
        let line_diff = best_loose_bet.line_number as i32 - best_bet.line_number as i32;
        if line_diff == self.params.looseness || self.final_pass {
            Some(best_loose_bet)
        } else {
            None
        }
    }

    fn fewest_demerits(&self) -> Option<ActiveNode> {
        let mut best_bet: Option<ActiveNode> = None;
        for entry in &self.list.entries {
            if let ListEntry::Active(active) = entry {
                match best_bet {
                    Some(best) if active.total_demerits >= best.total_demerits => {}
                    _ => best_bet = Some(*active),
                }
            }
        }
        best_bet
    }

    /// Among the surviving records, picks the one whose line count comes
    /// closest to the requested looseness, demerits breaking ties.
    fn best_for_looseness(&self, best_bet: &ActiveNode) -> ActiveNode {
        let looseness = self.params.looseness;
        let mut best_loose_bet = *best_bet;
        let mut actual_looseness = 0;
        let mut fewest_demerits = best_bet.total_demerits;
        for entry in &self.list.entries {
            let ListEntry::Active(active) = entry else {
                continue;
            };
            let line_diff = active.line_number as i32 - best_bet.line_number as i32;
            if (line_diff < actual_looseness && looseness <= line_diff)
                || (line_diff > actual_looseness && looseness >= line_diff)
            {
                fewest_demerits = active.total_demerits;
                best_loose_bet = *active;
                actual_looseness = line_diff;
            } else if line_diff == actual_looseness && active.total_demerits < fewest_demerits {
                fewest_demerits = active.total_demerits;
                best_loose_bet = *active;
            }
        }
        best_loose_bet
    }

    /// Cuts the fragment sequence at the chosen breakpoints and packs each
    /// piece into a line.
    fn post_line_break(
        &self,
        fragments: Vec<Fragment>,
        best_bet: &ActiveNode,
    ) -> Result<BrokenParagraph, BreakError> {
        let mut break_points = self.determine_break_points(best_bet);
        let mut items = Vec::new();
        let mut cur_line_number = self.params.prev_graf + 1;

        let left_skip_nonzero = self.left_skip != GlueSpec::ZERO;
        let mut line: Vec<Fragment> = Vec::new();
        if left_skip_nonzero {
            line.push(Fragment::Glue(self.left_skip));
        }

        let mut remaining = fragments.into_iter().enumerate();
        while let Some((pos, fragment)) = remaining.next() {
            if break_points.last() != Some(&pos) {
                line.push(fragment);
                continue;
            }
            break_points.pop();

            let mut disc_break = false;
            let mut post_material = Vec::new();
            let mut prune_next_line = false;
            match fragment {
                Fragment::Disc(disc) => {
                    disc_break = true;
                    for item in disc.pre_break {
                        line.push(item.into_fragment());
                    }
                    if disc.post_break.is_empty() {
                        prune_next_line = true;
                    } else {
                        post_material = disc
                            .post_break
                            .into_iter()
                            .map(DiscItem::into_fragment)
                            .collect();
                    }
                }
                // The break site itself stays on the line with its width
                // zeroed, so the line records where it was broken.
                Fragment::Math(math) => {
                    line.push(Fragment::Math(MathFragment { width: 0, ..math }));
                    prune_next_line = true;
                }
                Fragment::Kern(kern) => {
                    line.push(Fragment::Kern(KernFragment { width: 0, ..kern }));
                    prune_next_line = true;
                }
                Fragment::Glue(_) => {
                    prune_next_line = true;
                }
                other => {
                    prune_next_line = other.is_discardable();
                    line.push(other);
                }
            }

            self.finish_line(&mut items, std::mem::take(&mut line), cur_line_number);
            let penalty = self.inter_line_penalty(cur_line_number, disc_break, best_bet);
            if penalty != 0 {
                items.push(VItem::Penalty(penalty));
            }
            cur_line_number += 1;

            if left_skip_nonzero {
                line.push(Fragment::Glue(self.left_skip));
            }
            if !post_material.is_empty() {
                line.extend(post_material);
            } else if prune_next_line && break_points.last() != Some(&(pos + 1)) {
                if let Some(kept) = prune_discarded_fragments(&mut remaining, &break_points) {
                    line.push(kept);
                }
            }
        }

        self.finish_line(&mut items, line, cur_line_number);
        cur_line_number += 1;

        if cur_line_number != best_bet.line_number {
            return Err(BreakError::Confusion("materialized line count disagrees"));
        }
        Ok(BrokenParagraph {
            items,
            prev_graf: best_bet.line_number - 1,
        })
    }

    /// Appends the right edge glue, packs the line to its target width and
    /// emits it along with whatever material migrates out of it.
    fn finish_line(&self, items: &mut Vec<VItem>, mut line: Vec<Fragment>, line_number: usize) {
        line.push(Fragment::Glue(self.right_skip));
        let migrated = split_migrating_material(&mut line);
        let (width, indent) = self.line_dimensions(line_number);
        items.push(VItem::Line(pack_line(line, width, indent)));
        for fragment in migrated {
            if let Fragment::Migrating(migrating) = fragment {
                items.push(VItem::Migrating(migrating));
            }
        }
    }

    fn line_dimensions(&self, line_number: usize) -> (Dimension, Dimension) {
        if line_number > self.last_special_line {
            (self.second_width, self.second_indent)
        } else if self.params.par_shape.is_empty() {
            (self.first_width, self.first_indent)
        } else {
            let (indent, width) = self.params.par_shape[line_number - 1];
            (width, indent)
        }
    }

    fn inter_line_penalty(&self, cur_line_number: usize, disc_break: bool, best_bet: &ActiveNode) -> i32 {
        let mut penalty = self.params.inter_line_penalty;
        if cur_line_number == self.params.prev_graf + 1 {
            penalty += self.params.club_penalty;
        }
        if cur_line_number + 2 == best_bet.line_number {
            penalty += self.params.final_widow_penalty;
        }
        if disc_break {
            penalty += self.params.broken_penalty;
        }
        penalty
    }

    /// Returns the chosen break positions in reverse order, so the next
    /// upcoming break is always `last()`.
    fn determine_break_points(&self, best_bet: &ActiveNode) -> Vec<usize> {
        let mut break_points = Vec::new();
        let mut q = best_bet.break_node;
        while let Some(i) = q {
            break_points.push(self.passive[i].break_pos);
            q = self.passive[i].prev_break;
        }
        break_points
    }
}

/// Consumes discardable fragments at the start of a new line, stopping
/// early when the walk runs into the next chosen breakpoint. Returns the
/// first fragment that survives, if the pruning found one.
fn prune_discarded_fragments(
    remaining: &mut impl Iterator<Item = (usize, Fragment)>,
    break_points: &[usize],
) -> Option<Fragment> {
    for (pos, fragment) in remaining.by_ref() {
        if !fragment.is_discardable() {
            return Some(fragment);
        }
        if break_points.last() == Some(&(pos + 1)) {
            return None;
        }
    }
    None
}
