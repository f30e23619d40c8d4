use crate::record::Record;

/// One point of a history trend: `x` is the play index, oldest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub x: f64,
    pub y: f64,
}

impl TrendPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for TrendPoint {
    fn from(v: (f64, f64)) -> Self {
        TrendPoint { x: v.0, y: v.1 }
    }
}

impl From<TrendPoint> for (f64, f64) {
    fn from(p: TrendPoint) -> Self {
        (p.x, p.y)
    }
}

/// Headline values of `records` (most recent first, as sinks return them)
/// as a chronological series. Records without a headline are skipped.
pub fn trend(records: &[Record]) -> Vec<TrendPoint> {
    records
        .iter()
        .rev()
        .filter_map(|r| r.headline())
        .enumerate()
        .map(|(i, y)| TrendPoint::new((i + 1) as f64, y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{grid, memory};

    #[test]
    fn trend_is_oldest_first() {
        let newest_first = vec![memory(6), memory(4), memory(3)];
        let points: Vec<(f64, f64)> = trend(&newest_first).into_iter().map(Into::into).collect();
        assert_eq!(points, vec![(1.0, 3.0), (2.0, 4.0), (3.0, 6.0)]);
    }

    #[test]
    fn timed_out_grids_are_left_out() {
        let records = vec![grid(9.0, true), grid(15.0, false), grid(11.0, true)];
        let ys: Vec<f64> = trend(&records).iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![11.0, 9.0]);
    }
}
