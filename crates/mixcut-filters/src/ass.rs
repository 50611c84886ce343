//! ASS subtitle document generation.
//!
//! Cue lists compile to a complete `.ass` document the engine burns in with
//! its subtitles filter. Colors use the renderer-native encoding from
//! [`crate::color`].

use mixcut_models::{SubtitleCue, SubtitleStyle};

use crate::color::encode_ass_color;

/// Render a timestamp as `H:MM:SS.CC` (centisecond precision).
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// Sanitize cue text for an ASS Dialogue line.
///
/// Newlines become the renderer's `\N` line break; braces would open an
/// override block, so they are dropped in favor of parentheses.
fn sanitize_cue_text(text: &str) -> String {
    text.replace('\n', "\\N").replace('{', "(").replace('}', ")")
}

/// Build a complete ASS document for the cue list.
///
/// `(play_w, play_h)` anchors the script resolution to the output frame so
/// pixel-valued style fields keep their meaning.
pub fn build_ass_document(
    cues: &[SubtitleCue],
    style: &SubtitleStyle,
    play_w: u32,
    play_h: u32,
) -> String {
    let primary = encode_ass_color(&style.color, style.alpha);
    let outline = encode_ass_color(&style.outline_color, 1.0);
    let bold = if style.weight.is_bold() { -1 } else { 0 };

    let mut doc = String::new();
    doc.push_str("[Script Info]\n");
    doc.push_str("ScriptType: v4.00+\n");
    doc.push_str(&format!("PlayResX: {}\n", play_w));
    doc.push_str(&format!("PlayResY: {}\n", play_h));
    doc.push_str("ScaledBorderAndShadow: yes\n\n");

    doc.push_str("[V4+ Styles]\n");
    doc.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    doc.push_str(&format!(
        "Style: Default,{font},{size},{primary},{primary},{outline},{outline},{bold},0,0,0,\
         100,100,0,0,1,{outline_w},0,2,10,10,{margin_v},1\n\n",
        font = style.font_family,
        size = style.font_size,
        primary = primary,
        outline = outline,
        bold = bold,
        outline_w = style.outline_width,
        margin_v = style.margin_bottom,
    ));

    doc.push_str("[Events]\n");
    doc.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for cue in cues {
        doc.push_str(&format!(
            "Dialogue: 0,{start},{end},Default,,0,0,0,,{text}\n",
            start = format_ass_time(cue.start),
            end = format_ass_time(cue.end),
            text = sanitize_cue_text(&cue.text),
        ));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, end: f64, text: &str) -> SubtitleCue {
        SubtitleCue {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_time_format() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(61.5), "0:01:01.50");
        assert_eq!(format_ass_time(3661.25), "1:01:01.25");
    }

    #[test]
    fn test_document_structure() {
        let cues = vec![cue(0.0, 2.0, "first"), cue(2.0, 4.5, "second")];
        let doc = build_ass_document(&cues, &SubtitleStyle::default(), 1920, 1080);

        assert!(doc.contains("PlayResX: 1920"));
        assert!(doc.contains("PlayResY: 1080"));
        assert!(doc.contains("Style: Default,Arial,48,"));
        assert!(doc.contains("Dialogue: 0,0:00:00.00,0:00:02.00,Default,,0,0,0,,first"));
        assert!(doc.contains("Dialogue: 0,0:00:02.00,0:00:04.50,Default,,0,0,0,,second"));
    }

    #[test]
    fn test_colors_use_renderer_encoding() {
        let mut style = SubtitleStyle::default();
        style.color = "112233".into();
        style.alpha = 1.0;
        let doc = build_ass_document(&[cue(0.0, 1.0, "x")], &style, 1280, 720);
        assert!(doc.contains("&H00332211&"));
    }

    #[test]
    fn test_cue_text_sanitized() {
        let doc = build_ass_document(
            &[cue(0.0, 1.0, "two\nlines {tag}")],
            &SubtitleStyle::default(),
            1280,
            720,
        );
        assert!(doc.contains("two\\Nlines (tag)"));
    }

    #[test]
    fn test_bold_flag() {
        let mut style = SubtitleStyle::default();
        style.weight = mixcut_models::FontWeight::Bold;
        let doc = build_ass_document(&[cue(0.0, 1.0, "x")], &style, 1280, 720);
        assert!(doc.contains(",48,") && doc.contains(",-1,0,0,0,"));
    }
}
