//! Collapse selection boxes into line-granular rectangles
//!
//! Text selections arrive as one box per glyph run. Drawing those directly
//! would leak word lengths through a redaction, so runs on the same visual
//! line are merged into one bounding box.

use crate::coords::PdfRect;
use std::cmp::Ordering;

/// Two rects share a line when their vertical offset is at most half the
/// smaller height.
pub fn same_line(a: &PdfRect, b: &PdfRect) -> bool {
    (a.y - b.y).abs() <= 0.5 * a.height.min(b.height)
}

fn line_order(a: &PdfRect, b: &PdfRect) -> Ordering {
    a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x))
}

/// Merge rects into at most as many line-wide rects.
///
/// The output covers every input rect. Degenerate (non-finite) rects are
/// passed through unmerged.
pub fn merge_rects(rects: &[PdfRect]) -> Vec<PdfRect> {
    let (mut sorted, degenerate): (Vec<PdfRect>, Vec<PdfRect>) =
        rects.iter().copied().partition(|r| {
            r.x.is_finite() && r.y.is_finite() && r.width.is_finite() && r.height.is_finite()
        });
    sorted.sort_by(line_order);

    let mut merged = Vec::with_capacity(sorted.len() + degenerate.len());
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return degenerate;
    };

    let mut run = first;
    let mut last = first;
    for rect in iter {
        if same_line(&last, &rect) {
            run = run.union(&rect);
        } else {
            merged.push(run);
            run = rect;
        }
        last = rect;
    }
    merged.push(run);
    merged.extend(degenerate);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_empty() {
        assert!(merge_rects(&[]).is_empty());
    }

    #[test]
    fn test_merge_words_on_one_line() {
        let rects = vec![
            PdfRect::new(100.0, 700.0, 30.0, 12.0),
            PdfRect::new(135.0, 700.5, 20.0, 12.0),
            PdfRect::new(160.0, 699.5, 45.0, 12.0),
        ];
        let merged = merge_rects(&rects);
        assert_eq!(merged.len(), 1);
        let line = merged[0];
        assert!((line.x - 100.0).abs() < 1e-9);
        assert!((line.right() - 205.0).abs() < 1e-9);
        assert!((line.y - 699.5).abs() < 1e-9);
        assert!((line.top() - 712.5).abs() < 1e-9);
    }

    #[test]
    fn test_merge_keeps_lines_separate() {
        let rects = vec![
            PdfRect::new(100.0, 700.0, 30.0, 12.0),
            PdfRect::new(100.0, 686.0, 80.0, 12.0),
            PdfRect::new(140.0, 700.0, 30.0, 12.0),
        ];
        let merged = merge_rects(&rects);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], PdfRect::new(100.0, 686.0, 80.0, 12.0));
        assert_eq!(merged[1], PdfRect::new(100.0, 700.0, 70.0, 12.0));
    }

    #[test]
    fn test_same_line_uses_smaller_height() {
        let tall = PdfRect::new(0.0, 0.0, 10.0, 40.0);
        let short = PdfRect::new(0.0, 6.0, 10.0, 10.0);
        assert!(!same_line(&tall, &short));
        assert!(same_line(&tall, &PdfRect::new(0.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_non_finite_rects_pass_through() {
        let rects = vec![
            PdfRect::new(f64::NAN, 0.0, 1.0, 1.0),
            PdfRect::new(0.0, 0.0, 1.0, 1.0),
        ];
        let merged = merge_rects(&rects);
        assert_eq!(merged.len(), 2);
    }
}
