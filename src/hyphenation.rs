//! The seam through which word division is requested.
//!
//! The breaker owns no patterns and no dictionaries. When the hyphenating
//! pass reaches a word boundary it hands the fragment sequence to a
//! [`Hyphenator`], which may splice discretionary fragments into the
//! upcoming word.

use crate::nodes::Fragment;
use crate::params::BreakerParams;

/// Whatever the hyphenator wants to report; carried through unchanged.
pub type HyphenationError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies discretionary break opportunities for the word starting at a
/// given position.
///
/// Called during the hyphenating pass, once per inter-word space, with
/// `start` indexing the first fragment after the space. Implementations may
/// insert [`Fragment::Disc`] entries at or after `start` and must leave
/// everything before `start` untouched, since those fragments have already
/// been scanned.
pub trait Hyphenator {
    fn hyphenate_word(
        &mut self,
        fragments: &mut Vec<Fragment>,
        start: usize,
        params: &BreakerParams,
    ) -> Result<(), HyphenationError>;
}

/// A hyphenator that never offers a break, for callers that pre-insert
/// their discretionaries or want none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHyphenation;

impl Hyphenator for NoHyphenation {
    fn hyphenate_word(
        &mut self,
        _fragments: &mut Vec<Fragment>,
        _start: usize,
        _params: &BreakerParams,
    ) -> Result<(), HyphenationError> {
        Ok(())
    }
}
