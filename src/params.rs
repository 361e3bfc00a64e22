//! The flat parameter set one paragraph break consumes.

use crate::nodes::GlueSpec;
use crate::scaled::Dimension;

/// Tolerances, penalties and layout parameters for breaking one paragraph.
///
/// The defaults reproduce the values plain TeX sets up, with an `hsize` of
/// 6.5 inches. All fields are consumed once per [`break_paragraph`] call;
/// the breaker never mutates them.
///
/// [`break_paragraph`]: crate::break_paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerParams {
    /// Badness threshold for the first pass. A negative value skips the
    /// first pass entirely and starts with hyphenation enabled.
    pub pretolerance: i32,
    /// Badness threshold for the second (hyphenating) pass.
    pub tolerance: i32,
    /// Extra stretch added to every line on the emergency pass. Zero means
    /// the second pass is already the final one.
    pub emergency_stretch: Dimension,
    /// Base cost added to the badness of every line before squaring.
    pub line_penalty: i32,
    /// Penalty for breaking at a discretionary with nonempty pre-break
    /// text.
    pub hyphen_penalty: i32,
    /// Penalty for breaking at a discretionary with empty pre-break text,
    /// e.g. after an explicit hyphen.
    pub ex_hyphen_penalty: i32,
    /// Extra penalty emitted after the first line of a paragraph.
    pub club_penalty: i32,
    /// Conventional penalty before the last line of a paragraph. The
    /// breaker itself never reads this field; it is the value callers
    /// copy (or replace with a display-math variant) into
    /// `final_widow_penalty` when setting up a break.
    pub widow_penalty: i32,
    /// Penalty emitted before the last line of this paragraph. This is
    /// the field the breaker applies.
    pub final_widow_penalty: i32,
    /// Demerits for a hyphenated break on each of two consecutive lines.
    pub double_hyphen_demerits: i32,
    /// Demerits for ending the second-to-last line with a hyphen.
    pub final_hyphen_demerits: i32,
    /// Demerits when consecutive lines fall in non-adjacent fitness
    /// classes.
    pub adj_demerits: i32,
    /// Extra penalty emitted after a line that ended at a discretionary.
    pub broken_penalty: i32,
    /// Penalty emitted between every pair of lines.
    pub inter_line_penalty: i32,
    /// Glue at the left edge of every line.
    pub left_skip: GlueSpec,
    /// Glue at the right edge of every line.
    pub right_skip: GlueSpec,
    /// Glue appended to the paragraph so the last line need not be
    /// justified tight.
    pub par_fill_skip: GlueSpec,
    /// Requested line-count delta: +1 asks for one line more than the
    /// demerits-optimal solution, -1 for one less. Zero disables the
    /// search.
    pub looseness: i32,
    /// Width of lines not covered by `par_shape` or hanging indentation.
    pub hsize: Dimension,
    /// Hanging indentation amount; negative values indent on the right.
    pub hang_indent: Dimension,
    /// If non-negative, indentation applies from line `hang_after + 1` on;
    /// if negative, to the first `|hang_after|` lines.
    pub hang_after: i32,
    /// Explicit per-line `(indent, width)` pairs; the last entry repeats
    /// for all further lines. Overrides hanging indentation when nonempty.
    pub par_shape: Vec<(Dimension, Dimension)>,
    /// Line counter value the paragraph starts at; the first line produced
    /// is line `prev_graf + 1`.
    pub prev_graf: usize,
}

impl Default for BreakerParams {
    fn default() -> Self {
        Self {
            pretolerance: 100,
            tolerance: 200,
            emergency_stretch: 0,
            line_penalty: 10,
            hyphen_penalty: 50,
            ex_hyphen_penalty: 50,
            club_penalty: 150,
            widow_penalty: 150,
            final_widow_penalty: 150,
            double_hyphen_demerits: 10000,
            final_hyphen_demerits: 5000,
            adj_demerits: 10000,
            broken_penalty: 100,
            inter_line_penalty: 0,
            left_skip: GlueSpec::ZERO,
            right_skip: GlueSpec::ZERO,
            par_fill_skip: GlueSpec::FIL,
            looseness: 0,
            // 6.5in in scaled points.
            hsize: 30_785_863,
            hang_indent: 0,
            hang_after: 1,
            par_shape: Vec::new(),
            prev_graf: 0,
        }
    }
}
