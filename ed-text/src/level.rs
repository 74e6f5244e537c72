//! Fold-level encoding.
//!
//! A line's stored level word packs the line's own level in the low 12 bits
//! (offset by [`FOLD_BASE`] so that unfolding mistakes cannot underflow),
//! two orthogonal flag bits, and the level of the following line in the high
//! 16 bits. The host collapses a region by comparing a header line's level
//! against the levels that follow.

/// Base value for fold levels; a line can never fold below it.
pub const FOLD_BASE: i32 = 0x400;

/// Mask extracting the level number from a level word.
pub const FOLD_NUMBER_MASK: i32 = 0x0FFF;

/// The line contains no visible characters.
pub const FOLD_WHITE_FLAG: i32 = 0x1000;

/// The line opens a fold (its next line is deeper).
pub const FOLD_HEADER_FLAG: i32 = 0x2000;
