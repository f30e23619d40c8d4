use crate::time_series::TrendPoint;

/// X (plays) and Y (headline) upper bounds for the history chart
pub fn compute_chart_params(points: &[TrendPoint]) -> (f64, f64) {
    let highest = points.iter().map(|p| p.y).fold(0.0, f64::max);
    let plays = points.last().map(|p| p.x).unwrap_or(1.0).max(1.0);

    // leave a little headroom above the best value
    let top = if highest <= 0.0 {
        1.0
    } else {
        highest.ceil() + (highest / 10.0).ceil()
    };
    (plays, top)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        assert_eq!(compute_chart_params(&[]), (1.0, 1.0));
    }

    #[test]
    fn test_compute_chart_params_headroom() {
        let points = [TrendPoint::new(1.0, 10.0), TrendPoint::new(2.0, 20.0)];
        assert_eq!(compute_chart_params(&points), (2.0, 22.0));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
