//! Position resolution for overlay elements.

use mixcut_models::{Anchor, Position};

/// Resolve a position to concrete top-left coordinates.
///
/// `(frame_w, frame_h)` is the output frame, `(elem_w, elem_h)` the rendered
/// element, and margins are measured from the nearest frame edges. Absolute
/// positions pass through unchanged; relative positions resolve per anchor:
/// centered axes use `(frame - elem) / 2`, far edges use
/// `frame - elem - margin`.
pub fn resolve_position(
    position: &Position,
    frame_w: i32,
    frame_h: i32,
    elem_w: i32,
    elem_h: i32,
) -> (i32, i32) {
    match *position {
        Position::Absolute { x, y } => (x, y),
        Position::Relative {
            anchor,
            margin_x: mx,
            margin_y: my,
        } => {
            let x = match anchor {
                Anchor::TopLeft | Anchor::CenterLeft | Anchor::BottomLeft => mx,
                Anchor::TopCenter | Anchor::Center | Anchor::BottomCenter => {
                    (frame_w - elem_w) / 2
                }
                Anchor::TopRight | Anchor::CenterRight | Anchor::BottomRight => {
                    frame_w - elem_w - mx
                }
            };
            let y = match anchor {
                Anchor::TopLeft | Anchor::TopCenter | Anchor::TopRight => my,
                Anchor::CenterLeft | Anchor::Center | Anchor::CenterRight => {
                    (frame_h - elem_h) / 2
                }
                Anchor::BottomLeft | Anchor::BottomCenter | Anchor::BottomRight => {
                    frame_h - elem_h - my
                }
            };
            (x, y)
        }
    }
}

/// Estimate the rendered size of a text run in pixels.
///
/// Proportional fonts average roughly 0.6em glyph advance; line height is
/// 1.2em. Good enough for anchor math when exact metrics are unavailable.
pub fn estimate_text_size(text: &str, font_size: u32) -> (i32, i32) {
    let longest_line = text
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count().max(1);
    let width = (longest_line as f64 * font_size as f64 * 0.6).ceil() as i32;
    let height = (line_count as f64 * font_size as f64 * 1.2).ceil() as i32;
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: i32 = 1920;
    const H: i32 = 1080;
    const TW: i32 = 100;
    const TH: i32 = 30;
    const MX: i32 = 12;
    const MY: i32 = 7;

    fn at(anchor: Anchor) -> (i32, i32) {
        resolve_position(&Position::anchored(anchor, MX, MY), W, H, TW, TH)
    }

    #[test]
    fn test_absolute_passthrough() {
        let pos = Position::absolute(-40, 999);
        assert_eq!(resolve_position(&pos, W, H, TW, TH), (-40, 999));
    }

    #[test]
    fn test_all_nine_anchors() {
        assert_eq!(at(Anchor::TopLeft), (MX, MY));
        assert_eq!(at(Anchor::TopCenter), ((W - TW) / 2, MY));
        assert_eq!(at(Anchor::TopRight), (W - TW - MX, MY));
        assert_eq!(at(Anchor::CenterLeft), (MX, (H - TH) / 2));
        assert_eq!(at(Anchor::Center), ((W - TW) / 2, (H - TH) / 2));
        assert_eq!(at(Anchor::CenterRight), (W - TW - MX, (H - TH) / 2));
        assert_eq!(at(Anchor::BottomLeft), (MX, H - TH - MY));
        assert_eq!(at(Anchor::BottomCenter), ((W - TW) / 2, H - TH - MY));
        assert_eq!(at(Anchor::BottomRight), (W - TW - MX, H - TH - MY));
    }

    #[test]
    fn test_center_on_full_hd() {
        // 1920x1080 frame, 100x30 element, zero margins.
        let pos = Position::anchored(Anchor::Center, 0, 0);
        assert_eq!(resolve_position(&pos, 1920, 1080, 100, 30), (910, 525));
    }

    #[test]
    fn test_estimate_text_size() {
        let (w, h) = estimate_text_size("hello", 50);
        assert_eq!(w, 150); // 5 chars * 50 * 0.6
        assert_eq!(h, 60); // 1 line * 50 * 1.2

        let (w2, h2) = estimate_text_size("hi\nthere", 50);
        assert_eq!(w2, 150); // longest line "there"
        assert_eq!(h2, 120); // 2 lines
    }
}
