//! Masonry gallery layout
//!
//! Greedy column packing: each item is appended to the column with the
//! smallest accumulated height, ties going to the lowest column index.
//! Item heights follow the source aspect ratio; items without usable
//! dimensions are laid out as squares.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Responsive breakpoints as (minimum container width, columns), widest first
const BREAKPOINTS: [(u32, usize); 4] = [(1536, 5), (1280, 4), (1024, 3), (640, 2)];
pub const MAX_COLUMNS: usize = 12;

/// Something to place: an image id and its pixel dimensions, if known
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LayoutItem {
    pub id: Uuid,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Placement {
    pub id: Uuid,
    pub column: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LayoutResult {
    /// In input order
    pub placements: Vec<Placement>,
    /// Height of each column's content, excluding the trailing gap
    pub column_heights: Vec<f64>,
    pub total_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasonryLayout {
    columns: usize,
    column_width: f64,
    gap: f64,
}

/// Column count for a container of the given width in pixels.
pub fn columns_for_width(container_width: u32) -> usize {
    BREAKPOINTS
        .iter()
        .find(|(min, _)| container_width >= *min)
        .map_or(1, |(_, cols)| *cols)
}

impl MasonryLayout {
    pub fn new(columns: usize, column_width: f64, gap: f64) -> Result<Self, AppError> {
        if columns == 0 || columns > MAX_COLUMNS {
            return Err(AppError::InvalidInput(format!(
                "columns must be between 1 and {}",
                MAX_COLUMNS
            )));
        }
        if !column_width.is_finite() || column_width <= 0.0 {
            return Err(AppError::InvalidInput(
                "column_width must be positive".to_string(),
            ));
        }
        if !gap.is_finite() || gap < 0.0 {
            return Err(AppError::InvalidInput(
                "gap cannot be negative".to_string(),
            ));
        }
        Ok(MasonryLayout {
            columns,
            column_width,
            gap,
        })
    }

    /// Layout filling `container_width` with the responsive column count.
    pub fn fit(container_width: u32, gap: f64) -> Result<Self, AppError> {
        let columns = columns_for_width(container_width);
        let gutters = gap * (columns as f64 - 1.0);
        let column_width = (f64::from(container_width) - gutters) / columns as f64;
        Self::new(columns, column_width, gap)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn column_width(&self) -> f64 {
        self.column_width
    }

    /// Rendered height of an item at the column width.
    pub fn item_height(&self, item: &LayoutItem) -> f64 {
        match (item.width, item.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => self.column_width * f64::from(h) / f64::from(w),
            _ => self.column_width,
        }
    }

    pub fn compute(&self, items: &[LayoutItem]) -> LayoutResult {
        // Next free y offset per column, including the gap after the last item
        let mut offsets = vec![0.0_f64; self.columns];
        let mut placements = Vec::with_capacity(items.len());

        for item in items {
            let column = shortest_column(&offsets);
            let height = self.item_height(item);
            let y = offsets[column];
            placements.push(Placement {
                id: item.id,
                column,
                x: column as f64 * (self.column_width + self.gap),
                y,
                width: self.column_width,
                height,
            });
            offsets[column] = y + height + self.gap;
        }

        let column_heights: Vec<f64> = offsets
            .iter()
            .map(|&o| if o > 0.0 { o - self.gap } else { 0.0 })
            .collect();
        let total_height = column_heights.iter().copied().fold(0.0, f64::max);

        LayoutResult {
            placements,
            column_heights,
            total_height,
        }
    }
}

/// Index of the minimum value; the first one wins ties.
fn shortest_column(offsets: &[f64]) -> usize {
    let mut best = 0;
    for (i, &h) in offsets.iter().enumerate().skip(1) {
        if h < offsets[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(width: u32, height: u32) -> LayoutItem {
        LayoutItem {
            id: Uuid::new_v4(),
            width: Some(width),
            height: Some(height),
        }
    }

    fn mixed_items() -> Vec<LayoutItem> {
        let dims = [
            (1024, 1024),
            (768, 1344),
            (1344, 768),
            (512, 1024),
            (1024, 512),
            (896, 1152),
            (1152, 896),
            (640, 1536),
            (1536, 640),
            (1024, 1024),
            (832, 1216),
            (1216, 832),
        ];
        dims.iter().map(|&(w, h)| item(w, h)).collect()
    }

    #[test]
    fn items_in_a_column_never_overlap() {
        let layout = MasonryLayout::new(3, 300.0, 12.0).unwrap();
        let result = layout.compute(&mixed_items());

        for col in 0..3 {
            let mut spans: Vec<(f64, f64)> = result
                .placements
                .iter()
                .filter(|p| p.column == col)
                .map(|p| (p.y, p.y + p.height))
                .collect();
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));
            for pair in spans.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlap in column {col}: {pair:?}");
            }
        }
    }

    #[test]
    fn each_item_goes_to_the_shortest_column() {
        let layout = MasonryLayout::new(4, 250.0, 8.0).unwrap();
        let items = mixed_items();
        let result = layout.compute(&items);

        let mut offsets = [0.0_f64; 4];
        for (item, placement) in items.iter().zip(&result.placements) {
            let min = offsets.iter().copied().fold(f64::INFINITY, f64::min);
            let expected = offsets.iter().position(|&o| o == min).unwrap();
            assert_eq!(placement.column, expected);
            assert_eq!(placement.y, offsets[expected]);
            offsets[expected] += layout.item_height(item) + 8.0;
        }
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let layout = MasonryLayout::new(3, 100.0, 0.0).unwrap();
        let items: Vec<_> = (0..3).map(|_| item(100, 100)).collect();
        let cols: Vec<usize> = layout.compute(&items).placements.iter().map(|p| p.column).collect();
        assert_eq!(cols, vec![0, 1, 2]);
    }

    #[test]
    fn missing_dimensions_fall_back_to_square() {
        let layout = MasonryLayout::new(2, 200.0, 10.0).unwrap();
        let unknown = LayoutItem {
            id: Uuid::new_v4(),
            width: None,
            height: Some(300),
        };
        let zero = item(0, 500);
        assert_eq!(layout.item_height(&unknown), 200.0);
        assert_eq!(layout.item_height(&zero), 200.0);
        assert_eq!(layout.item_height(&item(400, 600)), 300.0);
    }

    #[test]
    fn heights_and_offsets() {
        let layout = MasonryLayout::new(2, 100.0, 10.0).unwrap();
        let items = vec![item(100, 200), item(100, 100), item(100, 50)];
        let result = layout.compute(&items);

        assert_eq!(result.placements[1].x, 110.0);
        assert_eq!(result.placements[2].column, 1);
        assert_eq!(result.placements[2].y, 110.0);
        assert_eq!(result.column_heights, vec![200.0, 160.0]);
        assert_eq!(result.total_height, 200.0);
    }

    #[test]
    fn empty_input() {
        let result = MasonryLayout::new(3, 100.0, 10.0).unwrap().compute(&[]);
        assert!(result.placements.is_empty());
        assert_eq!(result.column_heights, vec![0.0; 3]);
        assert_eq!(result.total_height, 0.0);
    }

    #[test]
    fn responsive_breakpoints() {
        assert_eq!(columns_for_width(320), 1);
        assert_eq!(columns_for_width(640), 2);
        assert_eq!(columns_for_width(1023), 2);
        assert_eq!(columns_for_width(1024), 3);
        assert_eq!(columns_for_width(1280), 4);
        assert_eq!(columns_for_width(1920), 5);

        let fit = MasonryLayout::fit(1040, 16.0).unwrap();
        assert_eq!(fit.columns(), 3);
        assert!((fit.column_width() * 3.0 + 32.0 - 1040.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert!(MasonryLayout::new(0, 100.0, 0.0).is_err());
        assert!(MasonryLayout::new(2, 0.0, 0.0).is_err());
        assert!(MasonryLayout::new(2, 100.0, -1.0).is_err());
        assert!(MasonryLayout::fit(10, 16.0).is_ok());
    }
}
