//! Stage execution against the external engine.
//!
//! The dispatcher drives compiled stages through the [`StageEngine`] trait;
//! [`FfmpegEngine`] is the production implementation. Keeping the seam here
//! lets orchestration logic run under test with a scripted engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::watch;
use tracing::debug;

use mixcut_filters::{escape_filter_path, FilterStage, StageKind};
use mixcut_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_media, MediaInfo};

/// Callback for stage progress, 0.0-100.0.
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Everything a stage execution needs from the dispatcher.
pub struct StageContext {
    /// Resolved task input files, in task-input order
    pub inputs: Vec<PathBuf>,
    /// Running intermediate consumed as the primary input
    pub current: PathBuf,
    /// Where the stage writes its result
    pub output: PathBuf,
    /// Task scratch workspace for sidecars and list files
    pub scratch: PathBuf,
    /// Cancellation signal; `true` aborts the in-flight process
    pub cancel: watch::Receiver<bool>,
    /// Best-effort progress sink
    pub on_progress: Option<ProgressCallback>,
}

/// Executes one compiled filter stage.
#[async_trait]
pub trait StageEngine: Send + Sync {
    /// Inspect a media file (frame geometry and duration drive compilation
    /// and progress math).
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    async fn execute_stage(&self, stage: &FilterStage, ctx: &StageContext) -> MediaResult<()>;
}

/// Production engine invoking the FFmpeg CLI.
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    /// Per-stage timeout in seconds; None disables the timeout
    stage_timeout_secs: Option<u64>,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(EncodingConfig::default())
    }
}

impl FfmpegEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            stage_timeout_secs: None,
        }
    }

    pub fn with_stage_timeout(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = Some(secs);
        self
    }

    /// The extra input file for a stage that consumes one.
    fn extra_input<'a>(&self, stage: &FilterStage, ctx: &'a StageContext) -> MediaResult<&'a Path> {
        let idx = *stage
            .extra_inputs
            .first()
            .ok_or_else(|| MediaError::InvalidMedia("stage is missing its overlay input".into()))?;
        ctx.inputs
            .get(idx)
            .map(PathBuf::as_path)
            .ok_or_else(|| MediaError::InvalidMedia(format!("no input at index {idx}")))
    }

    /// Assemble the command for a single-invocation stage (everything but
    /// Concat, which depends on probed clip durations).
    fn build_stage_command(
        &self,
        stage: &FilterStage,
        current: &Path,
        extra: Option<&Path>,
        output: &Path,
        sidecar_path: Option<&Path>,
    ) -> MediaResult<FfmpegCommand> {
        let enc = &self.encoding;
        let cmd = FfmpegCommand::new(output).input(current);

        let cmd = match stage.kind {
            StageKind::DrawText if !stage.complex => cmd
                .video_filter(stage.filter.clone())
                .video_codec(&enc.codec)
                .preset(&enc.preset)
                .crf(enc.crf)
                .audio_codec("copy"),
            StageKind::DrawText => cmd
                .filter_complex(stage.filter.clone())
                .map("[vout]")
                .map("0:a?")
                .video_codec(&enc.codec)
                .preset(&enc.preset)
                .crf(enc.crf)
                .audio_codec("copy"),
            StageKind::Overlay => {
                let extra =
                    extra.ok_or_else(|| MediaError::InvalidMedia("overlay input missing".into()))?;
                cmd.input(extra)
                    .filter_complex(stage.filter.clone())
                    .map("[vout]")
                    .map("0:a?")
                    .video_codec(&enc.codec)
                    .preset(&enc.preset)
                    .crf(enc.crf)
                    .audio_codec("copy")
            }
            StageKind::AudioMix => {
                let extra =
                    extra.ok_or_else(|| MediaError::InvalidMedia("audio input missing".into()))?;
                cmd.input(extra)
                    .filter_complex(stage.filter.clone())
                    .map("0:v")
                    .map("[aout]")
                    .video_codec("copy")
                    .audio_codec(&enc.audio_codec)
                    .output_arg("-b:a")
                    .output_arg(enc.audio_bitrate.clone())
            }
            StageKind::SubtitleBurn => {
                let sidecar = sidecar_path.ok_or_else(|| {
                    MediaError::InvalidMedia("subtitle stage is missing its document".into())
                })?;
                let filter = format!(
                    "subtitles=filename='{}'",
                    escape_filter_path(&sidecar.to_string_lossy())
                );
                cmd.video_filter(filter)
                    .video_codec(&enc.codec)
                    .preset(&enc.preset)
                    .crf(enc.crf)
                    .audio_codec("copy")
            }
            StageKind::Concat => {
                return Err(MediaError::InvalidMedia(
                    "concat stages are assembled separately".into(),
                ))
            }
        };
        Ok(cmd)
    }

    /// Stream-copy concatenation via the concat demuxer and a list file.
    fn build_concat_command(&self, list_path: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input(list_path)
            .input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
            .output_arg("-c")
            .output_arg("copy")
    }

    /// Crossfaded concatenation; offsets come from probed clip durations.
    fn build_xfade_command(
        &self,
        inputs: &[PathBuf],
        durations: &[f64],
        fade: f64,
        output: &Path,
    ) -> FfmpegCommand {
        let enc = &self.encoding;
        let mut cmd = FfmpegCommand::new(output);
        for input in inputs {
            cmd = cmd.input(input);
        }

        let mut chains: Vec<String> = Vec::new();
        let mut prev_v = "0:v".to_string();
        let mut prev_a = "0:a".to_string();
        let mut offset = 0.0;
        for i in 1..inputs.len() {
            offset += durations[i - 1] - fade;
            let v_out = format!("v{}", i);
            let a_out = format!("a{}", i);
            chains.push(format!(
                "[{prev_v}][{i}:v]xfade=transition=fade:duration={fade}:offset={offset}[{v_out}]"
            ));
            chains.push(format!("[{prev_a}][{i}:a]acrossfade=d={fade}[{a_out}]"));
            prev_v = v_out;
            prev_a = a_out;
        }

        cmd.filter_complex(chains.join(";"))
            .map(format!("[{}]", prev_v))
            .map(format!("[{}]", prev_a))
            .video_codec(&enc.codec)
            .preset(&enc.preset)
            .crf(enc.crf)
            .audio_codec(&enc.audio_codec)
    }
}

/// Parse the crossfade duration out of a concat stage's filter fragment.
fn transition_duration(stage: &FilterStage) -> Option<f64> {
    let (_, value) = stage.filter.rsplit_once("duration=")?;
    value.parse().ok()
}

/// Concat demuxer list file contents; single quotes escape as `'\''`.
fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| {
            format!(
                "file '{}'\n",
                p.to_string_lossy().replace('\'', "'\\''")
            )
        })
        .collect()
}

#[async_trait]
impl StageEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn execute_stage(&self, stage: &FilterStage, ctx: &StageContext) -> MediaResult<()> {
        // Materialize the sidecar document before the invocation references it.
        let sidecar_path = match &stage.sidecar {
            Some(sidecar) => {
                let path = ctx.scratch.join(&sidecar.filename);
                fs::write(&path, &sidecar.contents).await?;
                Some(path)
            }
            None => None,
        };

        let (cmd, total_duration) = match stage.kind {
            StageKind::Concat => {
                let mut inputs = Vec::with_capacity(stage.extra_inputs.len());
                for idx in &stage.extra_inputs {
                    let path = ctx.inputs.get(*idx).cloned().ok_or_else(|| {
                        MediaError::InvalidMedia(format!("no input at index {idx}"))
                    })?;
                    inputs.push(path);
                }

                let mut durations = Vec::with_capacity(inputs.len());
                for input in &inputs {
                    durations.push(probe_media(input).await?.duration);
                }
                let total: f64 = durations.iter().sum();

                let cmd = match transition_duration(stage) {
                    Some(fade) if inputs.len() >= 2 => {
                        self.build_xfade_command(&inputs, &durations, fade, &ctx.output)
                    }
                    _ => {
                        let list_path = ctx.scratch.join("concat.txt");
                        fs::write(&list_path, concat_list(&inputs)).await?;
                        self.build_concat_command(&list_path, &ctx.output)
                    }
                };
                (cmd, total)
            }
            _ => {
                let info = probe_media(&ctx.current).await?;
                let extra = if stage.extra_inputs.is_empty() {
                    None
                } else {
                    Some(self.extra_input(stage, ctx)?.to_path_buf())
                };
                let cmd = self.build_stage_command(
                    stage,
                    &ctx.current,
                    extra.as_deref(),
                    &ctx.output,
                    sidecar_path.as_deref(),
                )?;
                (cmd, info.duration)
            }
        };

        debug!(kind = %stage.kind, "Executing filter stage");

        let mut runner = FfmpegRunner::new().with_cancel(ctx.cancel.clone());
        if let Some(secs) = self.stage_timeout_secs {
            runner = runner.with_timeout(secs);
        }

        match &ctx.on_progress {
            Some(callback) => {
                let callback = Arc::clone(callback);
                runner
                    .run_with_progress(&cmd, move |p| callback(p.percent(total_duration)))
                    .await
            }
            None => runner.run(&cmd).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcut_filters::FilterStage;

    fn engine() -> FfmpegEngine {
        FfmpegEngine::default()
    }

    #[test]
    fn test_drawtext_command() {
        let stage = FilterStage::simple(StageKind::DrawText, "drawtext=text='hi':x=10:y=10");
        let cmd = engine()
            .build_stage_command(
                &stage,
                Path::new("/w/current.mp4"),
                None,
                Path::new("/w/out.mp4"),
                None,
            )
            .unwrap();
        let args = cmd.build_args();
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"drawtext=text='hi':x=10:y=10".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"copy".to_string()));
    }

    #[test]
    fn test_overlay_command_maps_labels() {
        let stage = FilterStage::complex(StageKind::Overlay, "[0:v][1:v]overlay=0:0[vout]")
            .with_extra_inputs(vec![1]);
        let cmd = engine()
            .build_stage_command(
                &stage,
                Path::new("/w/current.mp4"),
                Some(Path::new("/w/pip.mp4")),
                Path::new("/w/out.mp4"),
                None,
            )
            .unwrap();
        let args = cmd.build_args();
        assert!(args.contains(&"[vout]".to_string()));
        assert!(args.contains(&"0:a?".to_string()));
        assert!(args.contains(&"/w/pip.mp4".to_string()));
    }

    #[test]
    fn test_audio_mix_copies_video() {
        let stage = FilterStage::complex(StageKind::AudioMix, "[1:a]volume=1[aout]")
            .with_extra_inputs(vec![1]);
        let cmd = engine()
            .build_stage_command(
                &stage,
                Path::new("/w/current.mp4"),
                Some(Path::new("/w/music.mp3")),
                Path::new("/w/out.mp4"),
                None,
            )
            .unwrap();
        let args = cmd.build_args();
        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv + 1], "copy");
        assert!(args.contains(&"[aout]".to_string()));
        assert!(args.contains(&"aac".to_string()));
    }

    #[test]
    fn test_subtitle_burn_references_sidecar() {
        let stage = FilterStage::simple(StageKind::SubtitleBurn, "")
            .with_sidecar("subtitles.ass", "doc");
        let cmd = engine()
            .build_stage_command(
                &stage,
                Path::new("/w/current.mp4"),
                None,
                Path::new("/w/out.mp4"),
                Some(Path::new("/w/scratch/subtitles.ass")),
            )
            .unwrap();
        let args = cmd.build_args();
        assert!(args
            .iter()
            .any(|a| a.contains("subtitles=filename='/w/scratch/subtitles.ass'")));
    }

    #[test]
    fn test_concat_command_stream_copies() {
        let cmd = engine().build_concat_command(Path::new("/w/list.txt"), Path::new("/w/out.mp4"));
        let args = cmd.build_args();
        assert!(args.contains(&"concat".to_string()));
        assert!(args.contains(&"-safe".to_string()));
        let c = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[c + 1], "copy");
    }

    #[test]
    fn test_xfade_offsets_accumulate() {
        let inputs = vec![
            PathBuf::from("/w/a.mp4"),
            PathBuf::from("/w/b.mp4"),
            PathBuf::from("/w/c.mp4"),
        ];
        let cmd = engine().build_xfade_command(
            &inputs,
            &[10.0, 5.0, 7.0],
            0.5,
            Path::new("/w/out.mp4"),
        );
        let args = cmd.build_args();
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        // First boundary at 10 - 0.5, second at 9.5 + 5 - 0.5.
        assert!(graph.contains("offset=9.5"));
        assert!(graph.contains("offset=14"));
        assert!(graph.contains("acrossfade=d=0.5"));
        assert!(args.contains(&"[v2]".to_string()));
        assert!(args.contains(&"[a2]".to_string()));
    }

    #[test]
    fn test_transition_duration_parse() {
        let stage = FilterStage {
            kind: StageKind::Concat,
            filter: "xfade=transition=fade:duration=0.75".into(),
            complex: false,
            extra_inputs: vec![0, 1],
            sidecar: None,
            animation: None,
        };
        assert_eq!(transition_duration(&stage), Some(0.75));

        let plain = FilterStage::simple(StageKind::Concat, "");
        assert_eq!(transition_duration(&plain), None);
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/w/it's.mp4")]);
        assert_eq!(list, "file '/w/it'\\''s.mp4'\n");
    }
}
