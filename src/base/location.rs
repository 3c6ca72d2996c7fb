//! Source locations for parse tree nodes.
//!
//! A [`SegmentLocation`] spans two [`PointLocation`]s and is closed on both
//! ends: `end.offset` is the offset of the last character in the segment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single point in a source file.
///
/// Offsets are always known; line and column are optional because some
/// token streams only track byte offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointLocation {
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub offset: usize,
}

impl PointLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            offset,
        }
    }

    /// A point that only knows its offset
    pub fn at_offset(offset: usize) -> Self {
        Self {
            line: None,
            column: None,
            offset,
        }
    }

    /// Move the point by the given deltas.
    ///
    /// The offset never goes below zero. If the point tracks lines and the
    /// shift pushes it before the first line, it snaps to the file start.
    pub fn shift(&mut self, line_delta: isize, column_delta: isize, offset_delta: isize) {
        let mut offset = self.offset as isize + offset_delta;

        if let Some(line) = self.line {
            let mut line = line as isize + line_delta;
            let mut column = self.column.unwrap_or(0) as isize + column_delta;

            if line <= 0 || offset < 0 {
                line = 1;
                column = 0;
                offset = 0;
            }

            self.line = Some(line as usize);
            self.column = Some(column.max(0) as usize);
        }

        self.offset = offset.max(0) as usize;
    }
}

impl fmt::Display for PointLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "({},{})", line, column),
            _ => write!(f, "@{}", self.offset),
        }
    }
}

/// A closed interval of source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentLocation {
    pub start: PointLocation,
    pub end: PointLocation,
}

impl SegmentLocation {
    pub fn new(start: PointLocation, end: PointLocation) -> Self {
        debug_assert!(start.offset <= end.offset);
        Self { start, end }
    }

    /// Segment covering `[start, end]` offsets without line information
    pub fn from_offsets(start: usize, end: usize) -> Self {
        Self::new(PointLocation::at_offset(start), PointLocation::at_offset(end))
    }

    /// Number of characters covered, both ends included
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset + 1
    }

    /// A closed segment always covers at least one character
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Closed-interval containment
    pub fn includes(&self, other: &SegmentLocation) -> bool {
        self.start.offset <= other.start.offset && self.end.offset >= other.end.offset
    }

    /// Proper partial intersection: the segments share at least one
    /// character but neither contains the other.
    pub fn overlaps(&self, other: &SegmentLocation) -> bool {
        self.start.offset <= other.end.offset
            && other.start.offset <= self.end.offset
            && !self.includes(other)
            && !other.includes(self)
    }

    /// Union of two segments, keeping the earlier start and the later end.
    pub fn smart_merge(&self, other: &SegmentLocation) -> SegmentLocation {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };

        SegmentLocation { start, end }
    }

    /// Merge an optional accumulator with another segment
    pub fn merge_into(acc: Option<SegmentLocation>, other: &SegmentLocation) -> SegmentLocation {
        match acc {
            Some(acc) => acc.smart_merge(other),
            None => *other,
        }
    }

    pub fn shift(&mut self, line_delta: isize, column_delta: isize, offset_delta: isize) {
        self.start.shift(line_delta, column_delta, offset_delta);
        self.end.shift(line_delta, column_delta, offset_delta);
    }

    /// Slice of `text` covered by this segment, if it lies within the text
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let end = self.end.offset + 1;
        if end > text.len() {
            return None;
        }
        text.get(self.start.offset..end)
    }
}

impl PartialEq for SegmentLocation {
    fn eq(&self, other: &Self) -> bool {
        self.start.offset == other.start.offset && self.end.offset == other.end.offset
    }
}

impl Eq for SegmentLocation {}

impl fmt::Display for SegmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start.offset, self.end.offset)
    }
}
