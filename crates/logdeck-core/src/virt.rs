//! Row height oracle and virtual window math
//!
//! Only rows intersecting the scroll viewport are rendered; their absolute
//! positions come from a cached prefix-sum table of row heights. Toggling a
//! row's metadata panel invalidates the table from that row's index in the
//! same call, so every subsequent offset is recomputed before the next
//! layout pass and rows never overlap or gap.

use std::collections::HashSet;
use std::ops::Range;

/// Named height constants for the oracle
///
/// Heights are in abstract layout units (terminal rows for the TUI). All
/// three are overridable; nothing else in the layer hard-codes a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightConfig {
    /// Height of a collapsed row (timestamp, badges, message)
    pub collapsed: u16,
    /// Fixed chrome added by an open metadata panel, before its lines
    pub panel_chrome: u16,
    /// Height of one metadata line
    pub line_height: u16,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            collapsed: 1,
            panel_chrome: 2,
            line_height: 1,
        }
    }
}

impl HeightConfig {
    /// Rendered height of one row
    ///
    /// Rows with an empty metadata bag are never expandable and always
    /// report the collapsed height, even if toggled.
    ///
    /// # Examples
    ///
    /// ```
    /// use logdeck_core::virt::HeightConfig;
    ///
    /// let config = HeightConfig { collapsed: 80, panel_chrome: 16, line_height: 24 };
    /// assert_eq!(config.row_height(false, 3), 80);
    /// assert_eq!(config.row_height(true, 3), 80 + 16 + 3 * 24);
    /// assert_eq!(config.row_height(true, 0), 80);
    /// ```
    pub fn row_height(&self, expanded: bool, metadata_lines: usize) -> u16 {
        if !expanded || metadata_lines == 0 {
            return self.collapsed;
        }
        self.collapsed
            + self.panel_chrome
            + (metadata_lines as u16).saturating_mul(self.line_height)
    }
}

/// Set of row indices currently showing their metadata panel
///
/// Purely a rendering concern, owned by the view-model so that height
/// invalidation has a single authoritative source of truth.
#[derive(Debug, Default)]
pub struct ExpandedSet {
    indices: HashSet<usize>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a row; returns whether it is now expanded
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.indices.remove(&index) {
            false
        } else {
            self.indices.insert(index);
            true
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Cached prefix-sum offset table over row heights
///
/// `offsets[i]` is the absolute top of row `i`; `offsets[rows]` is the total
/// content height. Only the suffix past the invalidation point is ever
/// recomputed.
#[derive(Debug)]
pub struct RowLayout {
    config: HeightConfig,
    heights: Vec<u16>,
    offsets: Vec<u32>,
    /// Rows whose cached height and offset are still valid
    valid_rows: usize,
}

impl RowLayout {
    pub fn new(config: HeightConfig) -> Self {
        Self {
            config,
            heights: Vec::new(),
            offsets: vec![0],
            valid_rows: 0,
        }
    }

    pub fn config(&self) -> HeightConfig {
        self.config
    }

    /// Number of rows currently laid out
    pub fn rows(&self) -> usize {
        self.heights.len()
    }

    /// Invalidate cached offsets from `index` onward
    ///
    /// Must be called atomically with the expand-state change it reflects:
    /// every row past the toggled one has a downstream offset.
    pub fn invalidate_from(&mut self, index: usize) {
        self.valid_rows = self.valid_rows.min(index);
    }

    /// Drop the whole table (filter reset)
    pub fn clear(&mut self) {
        self.heights.clear();
        self.offsets.truncate(1);
        self.valid_rows = 0;
    }

    /// Bring the table up to date for `rows` rows
    ///
    /// `metadata_lines(i)` reports the metadata panel line count of row `i`;
    /// `expanded` is the authoritative expand state. Recomputes only the
    /// invalid suffix.
    pub fn sync(
        &mut self,
        rows: usize,
        expanded: &ExpandedSet,
        metadata_lines: impl Fn(usize) -> usize,
    ) {
        if rows < self.heights.len() {
            // Shrink: everything past the new length is gone
            self.heights.truncate(rows);
            self.valid_rows = self.valid_rows.min(rows);
        }
        self.heights.resize(rows, 0);
        self.offsets.resize(rows + 1, 0);

        for i in self.valid_rows..rows {
            let height = self
                .config
                .row_height(expanded.contains(i), metadata_lines(i));
            self.heights[i] = height;
            self.offsets[i + 1] = self.offsets[i] + u32::from(height);
        }
        self.valid_rows = rows;
    }

    /// Total content height, as of the last sync
    pub fn total_height(&self) -> u32 {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Absolute top of row `index`
    pub fn offset_of(&self, index: usize) -> u32 {
        self.offsets.get(index).copied().unwrap_or(0)
    }

    /// Cached height of row `index`
    pub fn height_of(&self, index: usize) -> u16 {
        self.heights.get(index).copied().unwrap_or(0)
    }

    /// Rows intersecting `[scroll, scroll + viewport)`, widened by overscan
    pub fn visible_range(&self, scroll: u32, viewport: u16, overscan: usize) -> Range<usize> {
        let rows = self.heights.len();
        if rows == 0 || viewport == 0 {
            return 0..0;
        }
        // Last row whose top is at or above the scroll position
        let first = self.offsets[..=rows]
            .partition_point(|&top| top <= scroll)
            .saturating_sub(1)
            .min(rows - 1);
        let bottom = scroll.saturating_add(u32::from(viewport));
        let mut last = first;
        while last < rows && self.offsets[last] < bottom {
            last += 1;
        }
        let start = first.saturating_sub(overscan);
        let end = (last + overscan).min(rows);
        start..end
    }
}

/// Viewport scroll position with bottom-follow behavior
#[derive(Debug)]
pub struct ScrollState {
    offset: u32,
    follow: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        // Following the newest entry until the user scrolls away
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn following(&self) -> bool {
        self.follow
    }

    fn max_offset(total: u32, viewport: u16) -> u32 {
        total.saturating_sub(u32::from(viewport))
    }

    /// Whether the viewport sits within `threshold` units of the bottom
    pub fn near_bottom(&self, total: u32, viewport: u16, threshold: u32) -> bool {
        self.offset + threshold >= Self::max_offset(total, viewport)
    }

    /// Manual scroll; scrolling away from the bottom drops follow mode
    pub fn scroll_by(&mut self, delta: i32, total: u32, viewport: u16) {
        let max = Self::max_offset(total, viewport);
        let next = self
            .offset
            .saturating_add_signed(delta)
            .min(max);
        self.offset = next;
        self.follow = next >= max;
    }

    /// Programmatic scroll to the top; disables follow mode
    pub fn to_top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    /// Stick to the newest entry and keep following
    pub fn to_bottom(&mut self, total: u32, viewport: u16) {
        self.offset = Self::max_offset(total, viewport);
        self.follow = true;
    }

    /// Re-enable follow mode; the next layout pass sticks to the bottom
    pub fn resume_follow(&mut self) {
        self.follow = true;
    }

    /// Stop following without moving the viewport
    pub fn pause_follow(&mut self) {
        self.follow = false;
    }

    /// Scroll the minimum amount needed to bring `[top, bottom)` into view
    pub fn reveal(&mut self, top: u32, bottom: u32, total: u32, viewport: u16) {
        let view_bottom = self.offset.saturating_add(u32::from(viewport));
        if top < self.offset {
            self.offset = top;
        } else if bottom > view_bottom {
            self.offset = bottom.saturating_sub(u32::from(viewport));
        }
        self.offset = self.offset.min(Self::max_offset(total, viewport));
        self.follow = self.offset >= Self::max_offset(total, viewport);
    }

    /// Re-clamp after a layout change without changing intent
    pub fn clamp(&mut self, total: u32, viewport: u16) {
        self.offset = self.offset.min(Self::max_offset(total, viewport));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_with(rows: usize, expanded: &ExpandedSet, lines: &[usize]) -> RowLayout {
        let mut layout = RowLayout::new(HeightConfig::default());
        layout.sync(rows, expanded, |i| lines[i]);
        layout
    }

    #[test]
    fn test_expand_increases_by_at_least_panel_chrome() {
        let config = HeightConfig::default();
        for lines in 1..8 {
            let collapsed = config.row_height(false, lines);
            let expanded = config.row_height(true, lines);
            assert!(expanded >= collapsed + config.panel_chrome);
        }
    }

    #[test]
    fn test_collapse_restores_exact_height() {
        let lines = vec![0, 4, 2];
        let mut expanded = ExpandedSet::new();
        let mut layout = layout_with(3, &expanded, &lines);
        let original = layout.height_of(1);

        expanded.toggle(1);
        layout.invalidate_from(1);
        layout.sync(3, &expanded, |i| lines[i]);
        assert!(layout.height_of(1) > original);

        expanded.toggle(1);
        layout.invalidate_from(1);
        layout.sync(3, &expanded, |i| lines[i]);
        assert_eq!(layout.height_of(1), original);
    }

    #[test]
    fn test_empty_bag_row_ignores_toggle() {
        let lines = vec![0];
        let mut expanded = ExpandedSet::new();
        expanded.toggle(0);
        let layout = layout_with(1, &expanded, &lines);
        assert_eq!(layout.height_of(0), HeightConfig::default().collapsed);
    }

    #[test]
    fn test_invalidation_shifts_downstream_offsets() {
        let lines = vec![0, 3, 0, 0];
        let mut expanded = ExpandedSet::new();
        let mut layout = layout_with(4, &expanded, &lines);
        let before = layout.offset_of(3);

        expanded.toggle(1);
        layout.invalidate_from(1);
        layout.sync(4, &expanded, |i| lines[i]);

        let config = layout.config();
        let grown = u32::from(config.panel_chrome + 3 * config.line_height);
        assert_eq!(layout.offset_of(3), before + grown);
        assert_eq!(layout.offset_of(0), 0);
        // Offsets stay strictly cumulative: no overlap, no gaps
        for i in 0..4 {
            assert_eq!(
                layout.offset_of(i + 1),
                layout.offset_of(i) + u32::from(layout.height_of(i))
            );
        }
    }

    #[test]
    fn test_incremental_sync_matches_full_rebuild() {
        let lines = vec![2, 0, 5, 1, 0, 3];
        let mut expanded = ExpandedSet::new();
        expanded.toggle(0);
        expanded.toggle(2);

        let mut incremental = layout_with(6, &expanded, &lines);
        expanded.toggle(3);
        incremental.invalidate_from(3);
        incremental.sync(6, &expanded, |i| lines[i]);

        let full = layout_with(6, &expanded, &lines);
        for i in 0..=6 {
            assert_eq!(incremental.offset_of(i), full.offset_of(i));
        }
    }

    #[test]
    fn test_visible_range_with_variable_heights() {
        // Heights: 1, 1+2+3=6, 1, 1 -> offsets 0,1,7,8, total 9
        let lines = vec![0, 3, 0, 0];
        let mut expanded = ExpandedSet::new();
        expanded.toggle(1);
        let layout = layout_with(4, &expanded, &lines);
        assert_eq!(layout.total_height(), 9);

        // Viewport of 4 units starting at 2: inside row 1 only
        assert_eq!(layout.visible_range(2, 4, 0), 1..2);
        // Starting at 6: tail of row 1, then rows 2 and 3
        assert_eq!(layout.visible_range(6, 3, 0), 1..4);
        // Overscan widens both ends, clamped to bounds
        assert_eq!(layout.visible_range(2, 4, 1), 0..3);
    }

    #[test]
    fn test_visible_range_empty() {
        let layout = RowLayout::new(HeightConfig::default());
        assert_eq!(layout.visible_range(0, 10, 2), 0..0);
    }

    #[test]
    fn test_shrink_then_sync() {
        let lines = vec![0, 0, 0, 0, 0];
        let expanded = ExpandedSet::new();
        let mut layout = layout_with(5, &expanded, &lines);
        assert_eq!(layout.total_height(), 5);

        layout.sync(2, &expanded, |i| lines[i]);
        assert_eq!(layout.rows(), 2);
        assert_eq!(layout.total_height(), 2);
    }

    #[test]
    fn test_scroll_follow_behavior() {
        let mut scroll = ScrollState::new();
        assert!(scroll.following());

        // Scrolling up drops follow mode
        scroll.to_bottom(100, 10);
        scroll.scroll_by(-5, 100, 10);
        assert!(!scroll.following());
        assert_eq!(scroll.offset(), 85);

        // Scrolling back to the bottom re-enables it
        scroll.scroll_by(100, 100, 10);
        assert!(scroll.following());
        assert_eq!(scroll.offset(), 90);
    }

    #[test]
    fn test_near_bottom_threshold() {
        let mut scroll = ScrollState::new();
        scroll.to_bottom(100, 10);
        scroll.scroll_by(-2, 100, 10);
        assert!(scroll.near_bottom(100, 10, 2));
        assert!(!scroll.near_bottom(100, 10, 1));
    }

    #[test]
    fn test_scroll_to_top() {
        let mut scroll = ScrollState::new();
        scroll.to_bottom(50, 10);
        scroll.to_top();
        assert_eq!(scroll.offset(), 0);
        assert!(!scroll.following());
    }
}
