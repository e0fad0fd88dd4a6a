use crate::models::{BoundingBox, FrameDims, ReferenceClass, ReferenceObject};

const MIN_REFERENCE_COVERAGE: f64 = 0.05;
const MAX_REFERENCE_COVERAGE: f64 = 0.15;
const SQUARE_ASPECT_MAX: f64 = 1.2;
const CARD_ASPECT: (f64, f64) = (1.4, 1.8);

/// Classify the smallest candidate box as a calibration object.
///
/// Only boxes covering 5-15% of the frame qualify. Square-ish boxes under 8%
/// are coins, wide boxes under 12% are cards, other elongated boxes over
/// 10% are paper.
pub fn detect_reference_object(
    candidates: &[BoundingBox],
    frame: FrameDims,
) -> Option<ReferenceObject> {
    let smallest = candidates
        .iter()
        .filter(|b| b.width > 0.0 && b.height > 0.0)
        .min_by(|a, b| a.area().total_cmp(&b.area()))?;

    let coverage = smallest.coverage(frame);
    if !(MIN_REFERENCE_COVERAGE..=MAX_REFERENCE_COVERAGE).contains(&coverage) {
        return None;
    }

    let aspect = smallest.width.max(smallest.height) / smallest.width.min(smallest.height);
    let class = if aspect <= SQUARE_ASPECT_MAX && coverage < 0.08 {
        ReferenceClass::Coin
    } else if (CARD_ASPECT.0..=CARD_ASPECT.1).contains(&aspect) && coverage < 0.12 {
        ReferenceClass::CreditCard
    } else if aspect > SQUARE_ASPECT_MAX && coverage > 0.10 {
        ReferenceClass::Paper
    } else {
        return None;
    };

    Some(ReferenceObject::new(class, *smallest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameDims = FrameDims::new(1000, 1000);

    #[test]
    fn square_small_box_is_a_coin() {
        let coin = BoundingBox::new(100.0, 100.0, 250.0, 250.0); // 6.25%
        let item = BoundingBox::new(300.0, 300.0, 600.0, 600.0);
        let found = detect_reference_object(&[item, coin], FRAME).expect("coin");
        assert_eq!(found.class, ReferenceClass::Coin);
        assert_eq!(found.bbox, coin);
        assert!(found.detected_size.is_none());
    }

    #[test]
    fn wide_box_is_a_card() {
        let card = BoundingBox::new(0.0, 0.0, 400.0, 250.0); // 10%, aspect 1.6
        let found = detect_reference_object(&[card], FRAME).expect("card");
        assert_eq!(found.class, ReferenceClass::CreditCard);
    }

    #[test]
    fn large_elongated_box_is_paper() {
        let paper = BoundingBox::new(0.0, 0.0, 450.0, 300.0); // 13.5%, aspect 1.5
        let found = detect_reference_object(&[paper], FRAME).expect("paper");
        assert_eq!(found.class, ReferenceClass::Paper);
    }

    #[test]
    fn coverage_outside_window_is_rejected() {
        let tiny = BoundingBox::new(0.0, 0.0, 100.0, 100.0); // 1%
        let big = BoundingBox::new(0.0, 0.0, 500.0, 500.0); // 25%
        assert!(detect_reference_object(&[tiny], FRAME).is_none());
        assert!(detect_reference_object(&[big], FRAME).is_none());
        assert!(detect_reference_object(&[], FRAME).is_none());
    }

    #[test]
    fn square_box_over_eight_percent_is_rejected() {
        let square = BoundingBox::new(0.0, 0.0, 300.0, 300.0); // 9%
        assert!(detect_reference_object(&[square], FRAME).is_none());
    }
}
