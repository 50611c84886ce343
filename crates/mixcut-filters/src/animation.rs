//! Animation expression compilation.
//!
//! Animations are compiled to engine expression strings over the frame
//! timestamp `t`, evaluated per output frame by the engine itself. The
//! compiler never evaluates them eagerly.

use serde::{Deserialize, Serialize};

use mixcut_models::{AnimationKind, AnimationSpec};

/// Which stage parameter an expression drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatedParam {
    /// Element opacity, 0.0-1.0
    Alpha,
    /// Element x coordinate in pixels
    X,
    /// Element y coordinate in pixels
    Y,
    /// Text size in points (zoom animations)
    FontSize,
}

/// A compiled, time-parameterized parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationExpr {
    pub param: AnimatedParam,
    pub expr: String,
}

/// Static facts about the animated element needed to anchor the expressions.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTarget {
    /// Resolved element position
    pub x: i32,
    pub y: i32,
    /// Output frame size
    pub frame_w: i32,
    pub frame_h: i32,
    /// Rendered element size
    pub elem_w: i32,
    pub elem_h: i32,
    /// Steady-state opacity
    pub alpha: f64,
    /// Steady-state font size
    pub font_size: u32,
}

/// Linear interpolation from `from` to `to` over `[delay, delay+duration]`,
/// clamped to the endpoints outside the window.
fn lerp_expr(from: f64, to: f64, delay: f64, duration: f64) -> String {
    format!(
        "if(lt(t,{d}),{from},if(lt(t,{d}+{dur}),{from}+({to}-{from})*(t-{d})/{dur},{to}))",
        d = delay,
        dur = duration,
        from = from,
        to = to,
    )
}

/// Compile an animation spec into the parameter expression it drives.
pub fn compile_animation(spec: &AnimationSpec, target: &AnimationTarget) -> AnimationExpr {
    let d = spec.delay;
    let dur = spec.duration;
    match spec.kind {
        AnimationKind::FadeIn => AnimationExpr {
            param: AnimatedParam::Alpha,
            expr: lerp_expr(0.0, target.alpha, d, dur),
        },
        AnimationKind::FadeOut => AnimationExpr {
            param: AnimatedParam::Alpha,
            expr: lerp_expr(target.alpha, 0.0, d, dur),
        },
        AnimationKind::Fade => {
            // Ramp up over the first half of the window, down over the second.
            let half = dur / 2.0;
            let a = target.alpha;
            AnimationExpr {
                param: AnimatedParam::Alpha,
                expr: format!(
                    "if(lt(t,{d}),0,if(lt(t,{d}+{h}),{a}*(t-{d})/{h},if(lt(t,{d}+{dur}),{a}*(1-(t-{d}-{h})/{h}),0)))",
                    d = d,
                    h = half,
                    dur = dur,
                    a = a,
                ),
            }
        }
        AnimationKind::SlideLeft => AnimationExpr {
            // Enter from beyond the right frame edge.
            param: AnimatedParam::X,
            expr: lerp_expr(target.frame_w as f64, target.x as f64, d, dur),
        },
        AnimationKind::SlideRight => AnimationExpr {
            // Enter from beyond the left frame edge.
            param: AnimatedParam::X,
            expr: lerp_expr(-(target.elem_w as f64), target.x as f64, d, dur),
        },
        AnimationKind::SlideUp => AnimationExpr {
            // Enter from beyond the bottom frame edge.
            param: AnimatedParam::Y,
            expr: lerp_expr(target.frame_h as f64, target.y as f64, d, dur),
        },
        AnimationKind::SlideDown => AnimationExpr {
            // Enter from beyond the top frame edge.
            param: AnimatedParam::Y,
            expr: lerp_expr(-(target.elem_h as f64), target.y as f64, d, dur),
        },
        AnimationKind::ZoomIn => AnimationExpr {
            param: AnimatedParam::FontSize,
            expr: lerp_expr(0.0, target.font_size as f64, d, dur),
        },
        AnimationKind::ZoomOut => AnimationExpr {
            param: AnimatedParam::FontSize,
            expr: lerp_expr(target.font_size as f64, 0.0, d, dur),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> AnimationTarget {
        AnimationTarget {
            x: 910,
            y: 525,
            frame_w: 1920,
            frame_h: 1080,
            elem_w: 100,
            elem_h: 30,
            alpha: 1.0,
            font_size: 48,
        }
    }

    #[test]
    fn test_fade_in_ramps_opacity() {
        let spec = AnimationSpec::new(AnimationKind::FadeIn, 2.0).with_delay(0.5);
        let compiled = compile_animation(&spec, &target());
        assert_eq!(compiled.param, AnimatedParam::Alpha);
        assert_eq!(
            compiled.expr,
            "if(lt(t,0.5),0,if(lt(t,0.5+2),0+(1-0)*(t-0.5)/2,1))"
        );
    }

    #[test]
    fn test_fade_out_reverses() {
        let spec = AnimationSpec::new(AnimationKind::FadeOut, 1.0);
        let compiled = compile_animation(&spec, &target());
        assert_eq!(compiled.param, AnimatedParam::Alpha);
        assert!(compiled.expr.starts_with("if(lt(t,0),1,"));
    }

    #[test]
    fn test_slide_left_starts_off_frame() {
        let spec = AnimationSpec::new(AnimationKind::SlideLeft, 1.0);
        let compiled = compile_animation(&spec, &target());
        assert_eq!(compiled.param, AnimatedParam::X);
        // Origin is the frame width; destination is the resolved x.
        assert!(compiled.expr.contains("1920"));
        assert!(compiled.expr.contains("910"));
    }

    #[test]
    fn test_slide_right_origin_is_negative_width() {
        let spec = AnimationSpec::new(AnimationKind::SlideRight, 1.0);
        let compiled = compile_animation(&spec, &target());
        assert!(compiled.expr.contains("-100"));
    }

    #[test]
    fn test_zoom_targets_font_size() {
        let spec = AnimationSpec::new(AnimationKind::ZoomIn, 0.8);
        let compiled = compile_animation(&spec, &target());
        assert_eq!(compiled.param, AnimatedParam::FontSize);
        assert!(compiled.expr.contains("48"));
    }

    #[test]
    fn test_expression_is_time_parameterized() {
        // Every compiled expression must reference the frame timestamp.
        for kind in [
            AnimationKind::FadeIn,
            AnimationKind::Fade,
            AnimationKind::SlideUp,
            AnimationKind::ZoomOut,
        ] {
            let spec = AnimationSpec::new(kind, 1.0);
            let compiled = compile_animation(&spec, &target());
            assert!(compiled.expr.contains("t"), "{kind} not time-based");
        }
    }
}
