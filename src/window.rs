//! Sliding-window fragments.
//!
//! Every token gets a fragment of `2r+1` cleaned tokens centred on it. Near
//! the document edges the window wraps around to the opposite end, so each
//! fragment has the same length and every token is covered by exactly
//! `2r+1` fragment slots.

use crate::tokenize::Token;

/// Window text around one token and the positions its score updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Target first, then predecessors nearest-first, then successors
    /// nearest-first. Short documents repeat positions.
    pub positions: Vec<usize>,
}

/// Positions covered by the window of radius `radius` around `pos` in a
/// document of `len` tokens.
pub fn window_positions(pos: usize, len: usize, radius: usize) -> Vec<usize> {
    debug_assert!(pos < len);
    let mut positions = Vec::with_capacity(2 * radius + 1);
    positions.push(pos);
    positions.extend((1..=radius).map(|i| predecessor(pos, i, len)));
    positions.extend((1..=radius).map(|i| (pos + i) % len));
    positions
}

fn predecessor(pos: usize, offset: usize, len: usize) -> usize {
    (pos as isize - offset as isize).rem_euclid(len as isize) as usize
}

/// Build the fragment for the token at `pos`.
pub fn build_fragment(tokens: &[Token], pos: usize, radius: usize) -> Fragment {
    let positions = window_positions(pos, tokens.len(), radius);
    let (target, rest) = positions.split_at(1);
    let (before, after) = rest.split_at(radius);

    let text = before
        .iter()
        .rev()
        .chain(target)
        .chain(after)
        .map(|&i| tokens[i].cleaned.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Fragment { text, positions }
}
