//! Detection normalization
//!
//! Converts raw detector records into the canonical `Detection` schema.

use tracing::debug;

use super::{Detection, RawDetection};

/// Number of corner points in a text quadrilateral
const QUAD_POINTS: usize = 4;

/// Flatten each raw record's quadrilateral into an 8-value `bbox`.
///
/// Point order is preserved, coordinates and confidence pass through
/// unchanged. Records with fewer than four points are dropped; extra points
/// beyond the fourth are ignored.
pub fn normalize(raw: &[RawDetection]) -> Vec<Detection> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, record)| {
            if record.points.len() < QUAD_POINTS {
                debug!(
                    "Dropping detection #{} ({:?}): {} points",
                    index,
                    record.text,
                    record.points.len()
                );
                return None;
            }

            Some(Detection {
                text: record.text.clone(),
                confidence: record.confidence,
                bbox: record.points[..QUAD_POINTS]
                    .iter()
                    .flat_map(|[x, y]| [*x, *y])
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale() -> RawDetection {
        RawDetection::new(
            vec![[10.0, 20.0], [50.0, 20.0], [50.0, 40.0], [10.0, 40.0]],
            "SALE",
            0.87,
        )
    }

    #[test]
    fn test_normalize_flattens_in_point_order() {
        let out = normalize(&[sale()]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "SALE");
        assert_eq!(out[0].confidence, 0.87);
        assert_eq!(
            out[0].bbox,
            vec![10.0, 20.0, 50.0, 20.0, 50.0, 40.0, 10.0, 40.0]
        );
    }

    #[test]
    fn test_normalize_does_not_reorder_points() {
        // Counter-clockwise, starting bottom-right
        let raw = RawDetection::new(
            vec![[50.5, 40.25], [50.5, 20.0], [10.0, 20.0], [10.0, 40.25]],
            "x",
            0.5,
        );
        let out = normalize(&[raw]);
        assert_eq!(
            out[0].bbox,
            vec![50.5, 40.25, 50.5, 20.0, 10.0, 20.0, 10.0, 40.25]
        );
    }

    #[test]
    fn test_normalize_drops_short_records() {
        let short = RawDetection::new(vec![[1.0, 1.0], [2.0, 2.0]], "partial", 0.99);
        let empty = RawDetection::new(vec![], "", 0.1);

        let out = normalize(&[short, sale(), empty]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "SALE");
    }

    #[test]
    fn test_normalize_keeps_out_of_range_confidence() {
        let mut high = sale();
        high.confidence = 1.7;
        let mut negative = sale();
        negative.confidence = -0.2;

        let out = normalize(&[high, negative]);
        assert_eq!(out[0].confidence, 1.7);
        assert_eq!(out[1].confidence, -0.2);
    }

    #[test]
    fn test_normalize_preserves_input_order() {
        let mut first = sale();
        first.text = "first".into();
        first.confidence = 0.1;
        let mut second = sale();
        second.text = "second".into();
        second.confidence = 0.9;

        let out = normalize(&[first, second]);
        let texts: Vec<_> = out.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec![
            sale(),
            RawDetection::new(vec![[0.0, 0.0]], "bad", 0.4),
        ];
        assert_eq!(normalize(&raw), normalize(&raw));
    }

    #[test]
    fn test_every_bbox_has_eight_values() {
        let raw = vec![
            sale(),
            RawDetection::new(
                vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]],
                "five",
                0.3,
            ),
        ];
        assert!(normalize(&raw).iter().all(|d| d.bbox.len() == 8));
    }
}
