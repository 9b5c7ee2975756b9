// Reading-order sequencing: rows top-to-bottom, regions left-to-right

use tracing::debug;

use crate::core::types::Detection;

/// Floor for the row tolerance, in pixels
pub const MIN_LANE_WIDTH: f32 = 6.0;
/// Row tolerance as a share of the vertical spread of centers
pub const LANE_HEIGHT_RATIO: f32 = 0.02;

/// Row tolerance scaled to the vertical spread of detection centers, so the
/// same grouping works across image resolutions.
pub fn lane_width(detections: &[Detection]) -> f32 {
    let span = if detections.len() < 2 {
        0.0
    } else {
        let (min_y, max_y) = detections
            .iter()
            .map(|d| d.center.y)
            .fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
        max_y - min_y
    };
    MIN_LANE_WIDTH.max(LANE_HEIGHT_RATIO * span)
}

/// Group detections into reading rows.
///
/// Returns an index arena: each row lists indices into `detections`. Rows are
/// in creation order (top-to-bottom), members sorted by `center.x`. A row's
/// first-inserted member is its reference for membership; the reference never
/// moves as the row grows.
pub fn group_rows(detections: &[Detection]) -> Vec<Vec<usize>> {
    if detections.is_empty() {
        return Vec::new();
    }

    let lane = lane_width(detections);

    let mut by_y: Vec<usize> = (0..detections.len()).collect();
    by_y.sort_by(|&a, &b| detections[a].center.y.total_cmp(&detections[b].center.y));

    let mut rows: Vec<Vec<usize>> = Vec::new();
    for idx in by_y {
        let y = detections[idx].center.y;
        let row = rows
            .iter_mut()
            .find(|row| (detections[row[0]].center.y - y).abs() <= lane);
        match row {
            Some(row) => row.push(idx),
            None => rows.push(vec![idx]),
        }
    }

    for row in &mut rows {
        row.sort_by(|&a, &b| detections[a].center.x.total_cmp(&detections[b].center.x));
    }

    debug!(
        "Grouped {} detections into {} rows (lane width {:.1}px)",
        detections.len(),
        rows.len(),
        lane
    );

    rows
}

/// Reorder detections into reading order. The output is a permutation of the
/// input: nothing is dropped or duplicated.
pub fn sequence(detections: Vec<Detection>) -> Vec<Detection> {
    let rows = group_rows(&detections);
    flatten_rows(detections, &rows)
}

/// Move detections out in the order given by a row arena from `group_rows`
pub fn flatten_rows(detections: Vec<Detection>, rows: &[Vec<usize>]) -> Vec<Detection> {
    let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
    rows.iter()
        .flatten()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// Number detections 1..=n in slice order
pub fn assign_bubble_ids(detections: &mut [Detection]) {
    for (i, det) in detections.iter_mut().enumerate() {
        det.bubble_id = Some(i as u32 + 1);
    }
}
