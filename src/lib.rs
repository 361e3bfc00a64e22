//! # Knuth-Plass paragraph line breaking
//!
//! Breaks a paragraph, given as a flat sequence of measured [`Fragment`]s,
//! into justified lines with globally minimal total demerits. The breaker
//! considers every legal breakpoint at once, trading line badness,
//! penalties and hyphenation against each other, instead of filling one
//! line at a time.
//!
//! All arithmetic is integer arithmetic in scaled units, so results are
//! identical across platforms.
//!
//! ```
//! use parbreak::{break_paragraph, BreakerParams, BoxFragment, Fragment, GlueSpec, NoHyphenation};
//!
//! let params = BreakerParams {
//!     hsize: 1000,
//!     ..BreakerParams::default()
//! };
//! let fragments = vec![
//!     Fragment::Box(BoxFragment::new(300)),
//!     Fragment::Glue(GlueSpec::new(10, 5, 3)),
//!     Fragment::Box(BoxFragment::new(250)),
//! ];
//! let broken = break_paragraph(fragments, &params, &mut NoHyphenation)?;
//! assert_eq!(broken.prev_graf, 1);
//! # Ok::<(), parbreak::BreakError>(())
//! ```

mod active_list;
mod hyphenation;
mod line_breaking;
mod nodes;
mod packaging;
mod params;
mod scaled;

pub use hyphenation::{HyphenationError, Hyphenator, NoHyphenation};
pub use line_breaking::{
    break_paragraph, BreakError, BrokenParagraph, VItem, EJECT_PENALTY, INF_PENALTY,
};
pub use nodes::{
    BoxFragment, DiscFragment, DiscItem, Flex, FlexOrder, Fragment, GlueSpec, KernFragment,
    KernKind, MathFragment, MathKind, MigratingFragment, MigratingKind,
};
pub use packaging::{set_glue_width, GlueSign, LineBox, OVERFULL_BAD};
pub use params::BreakerParams;
pub use scaled::{calculate_badness, Dimension, Scaled, INF_BAD, MAX_DIMEN, UNITY};
