//! Operation compilation.
//!
//! Each operation config compiles to one stage; a combined config
//! concatenates its sub-operations' stages in request order, each stage
//! implicitly consuming the visual output of the previous one.

use mixcut_models::{
    AudioOverlayConfig, AudioOverlayMode, JoinConfig, OperationConfig, SubtitlesConfig,
    TextOverlayConfig, VideoOverlayConfig, VideoOverlayShape,
};

use crate::animation::{compile_animation, AnimatedParam, AnimationExpr, AnimationTarget};
use crate::ass::build_ass_document;
use crate::color::drawtext_color;
use crate::escape::escape_filter_text;
use crate::position::{estimate_text_size, resolve_position};
use crate::stage::{FilterStage, StageKind};

/// Output frame geometry, probed from the base input.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
}

impl FrameSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Compile a validated configuration into an ordered stage list.
///
/// `input_count` is the number of input references on the task; overlay
/// operations consume extra inputs (beyond the running base) in request
/// order starting at index 1.
pub fn compile(config: &OperationConfig, frame: FrameSpec, input_count: usize) -> Vec<FilterStage> {
    match config {
        OperationConfig::Combined(combined) => {
            let mut stages = Vec::with_capacity(combined.operations.len());
            // Extra inputs are assigned to overlay sub-operations in request order.
            let mut next_extra = 1;
            for op in &combined.operations {
                stages.push(compile_single(op, frame, input_count, &mut next_extra));
            }
            stages
        }
        other => {
            let mut next_extra = 1;
            vec![compile_single(other, frame, input_count, &mut next_extra)]
        }
    }
}

fn compile_single(
    config: &OperationConfig,
    frame: FrameSpec,
    input_count: usize,
    next_extra: &mut usize,
) -> FilterStage {
    match config {
        OperationConfig::Join(c) => compile_join(c, input_count),
        OperationConfig::AudioOverlay(c) => {
            let idx = take_extra(next_extra);
            compile_audio_overlay(c, idx)
        }
        OperationConfig::VideoOverlay(c) => {
            let idx = take_extra(next_extra);
            compile_video_overlay(c, idx)
        }
        OperationConfig::TextOverlay(c) => compile_text_overlay(c, frame),
        OperationConfig::Subtitles(c) => compile_subtitles(c, frame),
        // Nesting is rejected at validation time.
        OperationConfig::Combined(_) => unreachable!("combined configs cannot nest"),
    }
}

fn take_extra(next_extra: &mut usize) -> usize {
    let idx = *next_extra;
    *next_extra += 1;
    idx
}

/// Join all task inputs in order.
///
/// The filter carries the crossfade fragment when a transition is requested;
/// the executor completes per-pair offsets from probed clip durations, since
/// those are only known once the inputs are resolved locally.
fn compile_join(config: &JoinConfig, input_count: usize) -> FilterStage {
    let filter = match config.transition {
        Some(t) if t > 0.0 => format!("xfade=transition=fade:duration={}", t),
        _ => String::new(),
    };
    FilterStage {
        kind: StageKind::Concat,
        filter,
        complex: false,
        extra_inputs: (0..input_count).collect(),
        sidecar: None,
        animation: None,
    }
}

fn compile_audio_overlay(config: &AudioOverlayConfig, extra_idx: usize) -> FilterStage {
    let delay_ms = (config.offset * 1000.0).round() as i64;
    let mut overlay_chain = String::from("[1:a]");
    if delay_ms > 0 {
        overlay_chain.push_str(&format!("adelay={ms}|{ms},", ms = delay_ms));
    }
    overlay_chain.push_str(&format!("volume={}", config.overlay_volume));

    let graph = match config.mode {
        AudioOverlayMode::Replace => format!("{overlay_chain}[aout]"),
        AudioOverlayMode::Mix => format!(
            "[0:a]volume={orig}[a0];{overlay_chain}[a1];\
             [a0][a1]amix=inputs=2:duration=first:dropout_transition=0[aout]",
            orig = config.original_volume,
        ),
    };

    FilterStage::complex(StageKind::AudioMix, graph).with_extra_inputs(vec![extra_idx])
}

fn compile_text_overlay(config: &TextOverlayConfig, frame: FrameSpec) -> FilterStage {
    let (tw, th) = estimate_text_size(&config.text, config.style.font_size);
    let (x, y) = resolve_position(
        &config.position,
        frame.width as i32,
        frame.height as i32,
        tw,
        th,
    );

    let animation = config.animation.as_ref().map(|spec| {
        compile_animation(
            spec,
            &AnimationTarget {
                x,
                y,
                frame_w: frame.width as i32,
                frame_h: frame.height as i32,
                elem_w: tw,
                elem_h: th,
                alpha: config.style.alpha,
                font_size: config.style.font_size,
            },
        )
    });

    let mut opts = vec![format!("text='{}'", escape_filter_text(&config.text))];

    let font = if config.style.weight.is_bold() {
        format!("{}:style=Bold", config.style.font_family)
    } else {
        config.style.font_family.clone()
    };
    opts.push(format!("font='{}'", font));

    match animated(&animation, AnimatedParam::FontSize) {
        Some(anim) => opts.push(format!("fontsize='{}'", anim.expr)),
        None => opts.push(format!("fontsize={}", config.style.font_size)),
    }

    match animated(&animation, AnimatedParam::Alpha) {
        Some(anim) => {
            opts.push(format!("fontcolor=0x{}", config.style.color));
            opts.push(format!("alpha='{}'", anim.expr));
        }
        None => opts.push(format!(
            "fontcolor={}",
            drawtext_color(&config.style.color, config.style.alpha)
        )),
    }

    if let Some(border) = &config.border {
        opts.push(format!("borderw={}", border.width));
        opts.push(format!("bordercolor=0x{}", border.color));
    }
    if let Some(shadow) = &config.shadow {
        opts.push(format!("shadowx={}", shadow.offset_x));
        opts.push(format!("shadowy={}", shadow.offset_y));
        opts.push(format!(
            "shadowcolor={}",
            drawtext_color(&shadow.color, shadow.alpha)
        ));
    }
    if let Some(bg) = &config.background {
        opts.push("box=1".to_string());
        opts.push(format!("boxcolor={}", drawtext_color(&bg.color, bg.alpha)));
        opts.push(format!("boxborderw={}", bg.padding));
    }

    if let Some(rotation) = config.rotation {
        // Rotated text renders on a transparent canvas, rotates with a
        // transparent fill, then composites at the resolved position.
        let pad = 10;
        let cw = tw + pad * 2;
        let ch = th + pad * 2;
        opts.push(format!("x={}", pad));
        opts.push(format!("y={}", pad));
        let drawtext = format!("drawtext={}", opts.join(":"));

        let (ox, oy) = overlay_coords(
            x,
            y,
            animated(&animation, AnimatedParam::X),
            animated(&animation, AnimatedParam::Y),
        );
        let graph = format!(
            "color=c=black@0.0:s={cw}x{ch},format=rgba,{drawtext}[txt];\
             [txt]rotate={rot}*PI/180:c=none:ow=rotw(iw):oh=roth(ih)[rot];\
             [0:v][rot]overlay=x={ox}:y={oy}:shortest=1[vout]",
            cw = cw,
            ch = ch,
            drawtext = drawtext,
            rot = rotation,
            ox = ox,
            oy = oy,
        );
        let mut stage = FilterStage::complex(StageKind::DrawText, graph);
        stage.animation = animation;
        return stage;
    }

    match animated(&animation, AnimatedParam::X) {
        Some(anim) => opts.push(format!("x='{}'", anim.expr)),
        None => opts.push(format!("x={}", x)),
    }
    match animated(&animation, AnimatedParam::Y) {
        Some(anim) => opts.push(format!("y='{}'", anim.expr)),
        None => opts.push(format!("y={}", y)),
    }

    let mut stage = FilterStage::simple(StageKind::DrawText, format!("drawtext={}", opts.join(":")));
    stage.animation = animation;
    stage
}

/// The compiled expression driving `param`, when one exists.
fn animated(animation: &Option<AnimationExpr>, param: AnimatedParam) -> Option<&AnimationExpr> {
    animation.as_ref().filter(|a| a.param == param)
}

/// Format overlay x/y operands, quoting time expressions.
fn overlay_coords(
    x: i32,
    y: i32,
    anim_x: Option<&AnimationExpr>,
    anim_y: Option<&AnimationExpr>,
) -> (String, String) {
    let ox = match anim_x {
        Some(a) => format!("'{}'", a.expr),
        None => x.to_string(),
    };
    let oy = match anim_y {
        Some(a) => format!("'{}'", a.expr),
        None => y.to_string(),
    };
    (ox, oy)
}

fn compile_video_overlay(config: &VideoOverlayConfig, extra_idx: usize) -> FilterStage {
    let (x, y) = (config.x, config.y);
    let (w, h) = (config.width, config.height);

    let mut chains: Vec<String> = Vec::new();

    let mut overlay_chain = format!("[1:v]scale={}:{}", w, h);
    if config.shape == VideoOverlayShape::Circle {
        overlay_chain.push_str(
            ",format=yuva420p,geq=lum='lum(X,Y)':cb='cb(X,Y)':cr='cr(X,Y)':\
             a='if(lte(hypot(X-W/2,Y-H/2),min(W,H)/2),alpha(X,Y),0)'",
        );
    }
    chains.push(format!("{}[ov]", overlay_chain));

    // The base label advances as shadow and border layers wrap it.
    let mut base = "0:v".to_string();

    if let Some(shadow) = &config.shadow {
        let mut shadow_chain = format!(
            "color=c={}:s={}x{}",
            drawtext_color(&shadow.color, shadow.alpha),
            w,
            h
        );
        if shadow.blur > 0 {
            shadow_chain.push_str(&format!(",gblur=sigma={}", shadow.blur));
        }
        chains.push(format!("{}[sh]", shadow_chain));
        chains.push(format!(
            "[{base}][sh]overlay={sx}:{sy}:shortest=1[shadowed]",
            base = base,
            sx = x + shadow.offset_x,
            sy = y + shadow.offset_y,
        ));
        base = "shadowed".to_string();
    }

    match &config.border {
        Some(border) => {
            let bw = border.width as i32;
            chains.push(format!(
                "[{base}][ov]overlay={x}:{y}:shortest=1[composed]",
                base = base,
                x = x,
                y = y,
            ));
            chains.push(format!(
                "[composed]drawbox=x={bx}:y={by}:w={bw_total}:h={bh_total}:color=0x{color}:t={t}[vout]",
                bx = x - bw,
                by = y - bw,
                bw_total = w as i32 + 2 * bw,
                bh_total = h as i32 + 2 * bw,
                color = border.color,
                t = border.width,
            ));
        }
        None => {
            chains.push(format!(
                "[{base}][ov]overlay={x}:{y}:shortest=1[vout]",
                base = base,
                x = x,
                y = y,
            ));
        }
    }

    FilterStage::complex(StageKind::Overlay, chains.join(";")).with_extra_inputs(vec![extra_idx])
}

fn compile_subtitles(config: &SubtitlesConfig, frame: FrameSpec) -> FilterStage {
    let document = build_ass_document(&config.cues, &config.style, frame.width, frame.height);
    FilterStage::simple(StageKind::SubtitleBurn, "").with_sidecar("subtitles.ass", document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcut_models::{
        Anchor, AnimationKind, AnimationSpec, Border, CombinedConfig, Position, Shadow,
        SubtitleCue, SubtitleStyle,
    };

    fn frame() -> FrameSpec {
        FrameSpec::new(1920, 1080)
    }

    fn text_config(text: &str) -> TextOverlayConfig {
        TextOverlayConfig::new(text)
    }

    #[test]
    fn test_text_overlay_simple() {
        let mut config = text_config("Hello");
        config.position = Position::anchored(Anchor::Center, 0, 0);
        let stages = compile(&OperationConfig::TextOverlay(config), frame(), 1);

        assert_eq!(stages.len(), 1);
        let stage = &stages[0];
        assert_eq!(stage.kind, StageKind::DrawText);
        assert!(!stage.complex);
        assert!(stage.filter.starts_with("drawtext=text='Hello'"));
        // 5 chars at size 48: estimated 144x58, centered on 1920x1080.
        assert!(stage.filter.contains("x=888"));
        assert!(stage.filter.contains("y=511"));
    }

    #[test]
    fn test_text_overlay_escapes_text() {
        let stages = compile(
            &OperationConfig::TextOverlay(text_config("O'Brien: 50% [test]")),
            frame(),
            1,
        );
        assert!(stages[0]
            .filter
            .contains("text='O\\'Brien\\: 50\\% \\[test\\]'"));
    }

    #[test]
    fn test_text_overlay_styling() {
        let mut config = text_config("styled");
        config.border = Some(Border {
            color: "112233".into(),
            width: 3,
        });
        config.shadow = Some(Shadow {
            color: "000000".into(),
            offset_x: 4,
            offset_y: 5,
            blur: 0,
            alpha: 0.5,
        });
        let stage = &compile(&OperationConfig::TextOverlay(config), frame(), 1)[0];
        assert!(stage.filter.contains("borderw=3"));
        assert!(stage.filter.contains("bordercolor=0x112233"));
        assert!(stage.filter.contains("shadowx=4:shadowy=5"));
        assert!(stage.filter.contains("shadowcolor=0x000000@0.50"));
    }

    #[test]
    fn test_text_overlay_fade_animates_alpha() {
        let mut config = text_config("fading");
        config.animation = Some(AnimationSpec::new(AnimationKind::FadeIn, 2.0));
        let stage = &compile(&OperationConfig::TextOverlay(config), frame(), 1)[0];

        let anim = stage.animation.as_ref().unwrap();
        assert_eq!(anim.param, AnimatedParam::Alpha);
        assert!(stage.filter.contains(&format!("alpha='{}'", anim.expr)));
        // Static color form is replaced by the expression form.
        assert!(stage.filter.contains("fontcolor=0xffffff"));
        assert!(!stage.filter.contains('@'));
    }

    #[test]
    fn test_text_overlay_slide_animates_position() {
        let mut config = text_config("sliding");
        config.animation = Some(AnimationSpec::new(AnimationKind::SlideLeft, 1.0));
        let stage = &compile(&OperationConfig::TextOverlay(config), frame(), 1)[0];
        let anim = stage.animation.as_ref().unwrap();
        assert_eq!(anim.param, AnimatedParam::X);
        assert!(stage.filter.contains(&format!("x='{}'", anim.expr)));
    }

    #[test]
    fn test_text_overlay_rotation_builds_graph() {
        let mut config = text_config("tilted");
        config.rotation = Some(15.0);
        let stage = &compile(&OperationConfig::TextOverlay(config), frame(), 1)[0];
        assert!(stage.complex);
        assert!(stage.filter.contains("rotate=15*PI/180"));
        assert!(stage.filter.contains("[vout]"));
    }

    #[test]
    fn test_audio_overlay_mix() {
        let config = AudioOverlayConfig {
            mode: AudioOverlayMode::Mix,
            overlay_volume: 0.5,
            original_volume: 0.8,
            offset: 1.5,
        };
        let stage = &compile(&OperationConfig::AudioOverlay(config), frame(), 2)[0];
        assert_eq!(stage.kind, StageKind::AudioMix);
        assert!(stage.complex);
        assert_eq!(stage.extra_inputs, vec![1]);
        assert!(stage.filter.contains("adelay=1500|1500"));
        assert!(stage.filter.contains("volume=0.5"));
        assert!(stage.filter.contains("volume=0.8"));
        assert!(stage.filter.contains("amix=inputs=2:duration=first"));
        assert!(stage.filter.ends_with("[aout]"));
    }

    #[test]
    fn test_audio_overlay_replace_skips_mix() {
        let config = AudioOverlayConfig {
            mode: AudioOverlayMode::Replace,
            overlay_volume: 1.0,
            original_volume: 1.0,
            offset: 0.0,
        };
        let stage = &compile(&OperationConfig::AudioOverlay(config), frame(), 2)[0];
        assert!(!stage.filter.contains("amix"));
        assert!(!stage.filter.contains("adelay"));
        assert!(stage.filter.ends_with("[aout]"));
    }

    #[test]
    fn test_video_overlay_rectangle() {
        let config = VideoOverlayConfig {
            x: 100,
            y: 50,
            width: 320,
            height: 180,
            shape: VideoOverlayShape::Rectangle,
            border: None,
            shadow: None,
        };
        let stage = &compile(&OperationConfig::VideoOverlay(config), frame(), 2)[0];
        assert_eq!(stage.kind, StageKind::Overlay);
        assert!(stage.filter.contains("[1:v]scale=320:180[ov]"));
        assert!(stage.filter.contains("overlay=100:50"));
        assert!(!stage.filter.contains("geq"));
    }

    #[test]
    fn test_video_overlay_circle_masks_alpha() {
        let config = VideoOverlayConfig {
            x: 0,
            y: 0,
            width: 200,
            height: 200,
            shape: VideoOverlayShape::Circle,
            border: None,
            shadow: None,
        };
        let stage = &compile(&OperationConfig::VideoOverlay(config), frame(), 2)[0];
        assert!(stage.filter.contains("geq"));
        assert!(stage.filter.contains("hypot"));
    }

    #[test]
    fn test_video_overlay_shadow_and_border() {
        let config = VideoOverlayConfig {
            x: 100,
            y: 100,
            width: 300,
            height: 200,
            shape: VideoOverlayShape::Rectangle,
            border: Some(Border {
                color: "ffffff".into(),
                width: 2,
            }),
            shadow: Some(Shadow {
                color: "000000".into(),
                offset_x: 6,
                offset_y: 6,
                blur: 10,
                alpha: 0.4,
            }),
        };
        let stage = &compile(&OperationConfig::VideoOverlay(config), frame(), 2)[0];
        assert!(stage.filter.contains("gblur=sigma=10"));
        assert!(stage.filter.contains("overlay=106:106")); // shadow offset
        assert!(stage.filter.contains("drawbox=x=98:y=98:w=304:h=204"));
        assert!(stage.filter.ends_with("[vout]"));
    }

    #[test]
    fn test_subtitles_sidecar() {
        let config = SubtitlesConfig {
            cues: vec![SubtitleCue {
                start: 0.0,
                end: 2.0,
                text: "hello".into(),
            }],
            style: SubtitleStyle::default(),
        };
        let stage = &compile(&OperationConfig::Subtitles(config), frame(), 1)[0];
        assert_eq!(stage.kind, StageKind::SubtitleBurn);
        let sidecar = stage.sidecar.as_ref().unwrap();
        assert_eq!(sidecar.filename, "subtitles.ass");
        assert!(sidecar.contents.contains("Dialogue:"));
        assert!(sidecar.contents.contains("PlayResX: 1920"));
    }

    #[test]
    fn test_join_consumes_all_inputs() {
        let stages = compile(
            &OperationConfig::Join(JoinConfig { transition: None }),
            frame(),
            3,
        );
        assert_eq!(stages[0].kind, StageKind::Concat);
        assert_eq!(stages[0].extra_inputs, vec![0, 1, 2]);
        assert!(stages[0].filter.is_empty());
    }

    #[test]
    fn test_join_with_transition() {
        let stages = compile(
            &OperationConfig::Join(JoinConfig {
                transition: Some(0.5),
            }),
            frame(),
            2,
        );
        assert!(stages[0].filter.contains("xfade"));
        assert!(stages[0].filter.contains("duration=0.5"));
    }

    #[test]
    fn test_combined_flattens_in_order() {
        let config = CombinedConfig {
            operations: vec![
                OperationConfig::TextOverlay(text_config("one")),
                OperationConfig::AudioOverlay(AudioOverlayConfig::default()),
                OperationConfig::Subtitles(SubtitlesConfig {
                    cues: vec![SubtitleCue {
                        start: 0.0,
                        end: 1.0,
                        text: "x".into(),
                    }],
                    style: SubtitleStyle::default(),
                }),
            ],
        };
        let stages = compile(&OperationConfig::Combined(config), frame(), 2);
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].kind, StageKind::DrawText);
        assert_eq!(stages[1].kind, StageKind::AudioMix);
        assert_eq!(stages[2].kind, StageKind::SubtitleBurn);
    }

    #[test]
    fn test_combined_assigns_extra_inputs_in_order() {
        let config = CombinedConfig {
            operations: vec![
                OperationConfig::AudioOverlay(AudioOverlayConfig::default()),
                OperationConfig::VideoOverlay(VideoOverlayConfig {
                    x: 0,
                    y: 0,
                    width: 100,
                    height: 100,
                    shape: VideoOverlayShape::Rectangle,
                    border: None,
                    shadow: None,
                }),
            ],
        };
        let stages = compile(&OperationConfig::Combined(config), frame(), 3);
        assert_eq!(stages[0].extra_inputs, vec![1]);
        assert_eq!(stages[1].extra_inputs, vec![2]);
    }
}
