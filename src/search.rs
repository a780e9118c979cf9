//! The resolver-style search-list name iterator (§4.10).
//!
//! Neither this crate's teacher nor any of its sibling example repos model
//! a search list; a hostname resolver's `ndots` rule has no counterpart in
//! a packet-editing tool. This is new code, but it leans on `Name`'s
//! existing label/text machinery rather than introducing a parallel one.

use crate::error::Result;
use crate::name::{self, Name};

/// Produces the ordered sequence of absolute names a resolver should try
/// for a given (possibly unqualified) base name.
///
/// If `base` is already absolute (ends in an unescaped `.`), it is the only
/// name yielded. Otherwise, if `base` has at least `ndots` labels, the bare
/// base is tried first, then `base.suffix` for each suffix in order. If it
/// has fewer than `ndots` labels, the suffixed forms are tried first and
/// the bare base is tried last. A suffix that would push the combined name
/// over 255 bytes is skipped rather than returned as an error.
pub struct SearchIterator<'a> {
    base: Name,
    suffixes: &'a [Name],
    state: State,
}

#[derive(Copy, Clone)]
enum State {
    BaseOnly,
    PreBase(usize),
    Suffixes(usize),
    PostBase(usize),
    Done,
}

impl<'a> SearchIterator<'a> {
    pub fn new(base: &str, suffixes: &'a [Name], ndots: usize) -> Result<SearchIterator<'a>> {
        let rooted = name::text_is_rooted(base)?;
        let base = Name::from_text(base)?;
        let state = if rooted {
            State::BaseOnly
        } else if base.labels().count() >= ndots {
            State::PreBase(0)
        } else {
            State::PostBase(0)
        };
        Ok(SearchIterator { base, suffixes, state })
    }

    fn joined(&self, suffix_idx: usize) -> Option<Name> {
        Name::from_labels(self.base.labels().chain(self.suffixes[suffix_idx].labels())).ok()
    }
}

impl<'a> Iterator for SearchIterator<'a> {
    type Item = Name;

    fn next(&mut self) -> Option<Name> {
        loop {
            match self.state {
                State::BaseOnly => {
                    self.state = State::Done;
                    return Some(self.base.clone());
                }
                State::PreBase(idx) => {
                    self.state = State::Suffixes(idx);
                    return Some(self.base.clone());
                }
                State::Suffixes(idx) => {
                    if idx >= self.suffixes.len() {
                        self.state = State::Done;
                        return None;
                    }
                    self.state = State::Suffixes(idx + 1);
                    if let Some(name) = self.joined(idx) {
                        return Some(name);
                    }
                }
                State::PostBase(idx) => {
                    if idx >= self.suffixes.len() {
                        self.state = State::BaseOnly;
                        continue;
                    }
                    self.state = State::PostBase(idx + 1);
                    if let Some(name) = self.joined(idx) {
                        return Some(name);
                    }
                }
                State::Done => return None,
            }
        }
    }
}
