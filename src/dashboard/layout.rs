use crate::dashboard::widgets::WidgetId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_COLUMNS: u8 = 2;

fn default_columns() -> u8 {
    DEFAULT_COLUMNS
}

fn default_span() -> u8 {
    1
}

/// Position of one widget on the grid. Rows grow downwards without bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub widget: WidgetId,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_span")]
    pub w: u8,
    #[serde(default = "default_span")]
    pub h: u8,
}

/// Grid definition for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placements: Vec<Placement>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::with_columns(DEFAULT_COLUMNS)
    }
}

impl LayoutConfig {
    pub fn with_columns(columns: u8) -> Self {
        Self {
            columns: columns.max(1),
            placements: Vec::new(),
        }
    }

    /// First unoccupied single cell in row-major order.
    pub fn next_free_cell(&self) -> (i32, i32) {
        let cols = self.columns.max(1) as i32;
        let occupied: HashSet<(i32, i32)> = self
            .placements
            .iter()
            .flat_map(|p| {
                let (x, y, w, h) = (p.x, p.y, p.w.max(1) as i32, p.h.max(1) as i32);
                (y..y.saturating_add(h))
                    .flat_map(move |r| (x..x.saturating_add(w)).map(move |c| (c, r)))
            })
            .collect();
        let mut idx = 0;
        loop {
            let cell = (idx % cols, idx / cols);
            if !occupied.contains(&cell) {
                return cell;
            }
            idx += 1;
        }
    }

    pub fn place(&mut self, widget: WidgetId) {
        let (x, y) = self.next_free_cell();
        self.placements.push(Placement {
            widget,
            x,
            y,
            w: 1,
            h: 1,
        });
    }

    pub fn remove(&mut self, widget: WidgetId) {
        self.placements.retain(|p| p.widget != widget);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlacement {
    pub widget: WidgetId,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Validate placements against the grid width and the known widgets.
///
/// Unknown widgets, negative or out-of-grid positions and overlaps are
/// dropped with a warning; widths are clamped to the remaining columns.
pub fn normalize_placements(
    layout: &LayoutConfig,
    widgets: &[WidgetId],
) -> (Vec<NormalizedPlacement>, Vec<String>) {
    let cols = layout.columns.max(1) as usize;
    let mut occupied: HashSet<(usize, usize)> = HashSet::new();
    let mut seen: HashSet<WidgetId> = HashSet::new();
    let mut normalized = Vec::new();
    let mut warnings = Vec::new();

    for placement in &layout.placements {
        if !widgets.contains(&placement.widget) {
            warnings.push(format!(
                "dropping placement for unknown widget '{}'",
                placement.widget
            ));
            continue;
        }
        if !seen.insert(placement.widget) {
            warnings.push(format!(
                "duplicate placement for widget '{}' ignored",
                placement.widget
            ));
            continue;
        }
        if let Some(np) = normalize_placement(placement, cols, &mut occupied) {
            normalized.push(np);
        } else {
            warnings.push(format!(
                "placement for widget '{}' is outside the grid or overlaps and was ignored",
                placement.widget
            ));
        }
    }

    (normalized, warnings)
}

fn normalize_placement(
    placement: &Placement,
    cols: usize,
    occupied: &mut HashSet<(usize, usize)>,
) -> Option<NormalizedPlacement> {
    if placement.x < 0 || placement.y < 0 {
        return None;
    }
    // The far edge must stay addressable as a grid coordinate.
    placement.x.checked_add(placement.w.max(1) as i32)?;
    placement.y.checked_add(placement.h.max(1) as i32)?;
    let x = placement.x as usize;
    let y = placement.y as usize;
    if x >= cols {
        return None;
    }
    let w = (placement.w.max(1) as usize).min(cols - x);
    let h = placement.h.max(1) as usize;

    for r in y..y + h {
        for c in x..x + w {
            if occupied.contains(&(c, r)) {
                return None;
            }
        }
    }
    for r in y..y + h {
        for c in x..x + w {
            occupied.insert((c, r));
        }
    }

    Some(NormalizedPlacement {
        widget: placement.widget,
        x,
        y,
        w,
        h,
    })
}
