//! Concrete plugin variants
//!
//! Seven capabilities, one shared certification path. Each variant differs
//! only in its descriptor text, sandbox budget, and output integrity check;
//! all of them delegate to [`validate_in_sandbox`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use promptcut_exec::Executor;

use crate::base::{IoMap, ToolPlugin, Verdict};
use crate::validator::{validate_in_sandbox, OutputCheck};

const MEDIA_CLI_BUDGET: Duration = Duration::from_secs(30);
const SCRIPTING_BUDGET: Duration = Duration::from_secs(45);
const PROBE_BUDGET: Duration = Duration::from_secs(10);
const GENERATIVE_BUDGET: Duration = Duration::from_secs(120);
const ANIMATION_BUDGET: Duration = Duration::from_secs(90);
const MUSIC_BUDGET: Duration = Duration::from_secs(60);
const VOICEOVER_BUDGET: Duration = Duration::from_secs(20);

const SHARED_SCRIPT_RULES: &str = "\
The script is given two Python dicts already bound for it: `inputs` maps \
logical input names to filenames and `outputs` maps logical output names to \
filenames. Read filenames from these dicts; never hard-code paths. Write \
every declared output. Emit only Python code, with no explanations and no \
markdown fences. Do not call sys.exit(); on failure raise a RuntimeError \
with a descriptive message.";

/// Simple frame-accurate transformations through the `ffmpeg` binary.
pub struct MediaCommandLinePlugin {
    executor: Executor,
}

impl MediaCommandLinePlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for MediaCommandLinePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for MediaCommandLinePlugin {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn description(&self) -> &str {
        "Processes video and images with ffmpeg for simple transformations: \
         trimming, flipping, rotating, cropping, color and contrast \
         adjustment, grayscale conversion, speed changes, and similar \
         single-pass effects. Takes an input file and produces a transformed \
         output file."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that perform one video or image \
         transformation by invoking the ffmpeg command line through the \
         subprocess module, with check=True and capture_output=True. Prefer \
         a single ffmpeg invocation with -y so outputs are overwritten. \
         Keep filters simple and deterministic."
    }

    fn prerequisites(&self) -> &str {
        "The ffmpeg binary is on PATH. Python standard library only."
    }

    fn sandbox_timeout(&self) -> Duration {
        MEDIA_CLI_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::MediaReadable,
        )
        .await
    }
}

/// Compositional edits through the MoviePy Python library.
pub struct ScriptingLibraryPlugin {
    executor: Executor,
}

impl ScriptingLibraryPlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for ScriptingLibraryPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for ScriptingLibraryPlugin {
    fn name(&self) -> &str {
        "moviepy"
    }

    fn description(&self) -> &str {
        "Edits video with the MoviePy library for compositional work: \
         concatenation, subclips, crossfades, text overlays, audio mixing, \
         and multi-clip timelines. Best when an edit needs programmatic \
         control rather than a single filter."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that edit video using the moviepy \
         library. Close every clip you open. When the inputs dict contains \
         a .json metadata file, read it and use the real dimensions, \
         duration, and frame rate to construct precise operations instead \
         of guessing. Catch OSError, IOError, and library exceptions and \
         re-raise them as RuntimeError."
    }

    fn prerequisites(&self) -> &str {
        "The moviepy package is importable; ffmpeg is on PATH for encoding."
    }

    fn sandbox_timeout(&self) -> Duration {
        SCRIPTING_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::MediaReadable,
        )
        .await
    }
}

/// Metadata extraction via `ffprobe` into a JSON file.
pub struct MetadataProbePlugin {
    executor: Executor,
}

impl MetadataProbePlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for MetadataProbePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for MetadataProbePlugin {
    fn name(&self) -> &str {
        "probe"
    }

    fn description(&self) -> &str {
        "Analyzes a media file and saves its metadata (dimensions, \
         duration, frame rate, codecs) as JSON. Often a required first step \
         before a complex manipulation."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that extract media metadata by running \
         ffprobe with -print_format json -show_format -show_streams through \
         the subprocess module, and write its stdout verbatim to the \
         declared JSON output file."
    }

    fn prerequisites(&self) -> &str {
        "The ffprobe binary is on PATH. Python standard library only."
    }

    fn sandbox_timeout(&self) -> Duration {
        PROBE_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::JsonWellFormed,
        )
        .await
    }
}

/// Net-new media from a hosted generative model.
///
/// In the sandbox the remote service is unreachable, so the integrity check
/// is existence only; scripts are instructed to degrade to a placeholder
/// asset when the service cannot be reached.
pub struct GenerativeMediaPlugin {
    executor: Executor,
}

impl GenerativeMediaPlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for GenerativeMediaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for GenerativeMediaPlugin {
    fn name(&self) -> &str {
        "generative"
    }

    fn description(&self) -> &str {
        "Generates a brand-new video clip from a text description using a \
         hosted generative model. Use only when the edit asks for footage \
         that does not exist in the session."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that request a video clip from the \
         configured generative media endpoint over HTTP and save the result \
         to the declared output file. If the endpoint is unreachable or \
         unconfigured, synthesize a short placeholder clip locally with \
         ffmpeg instead of failing."
    }

    fn prerequisites(&self) -> &str {
        "Network access to the generative endpoint when available; ffmpeg \
         on PATH for the local fallback."
    }

    fn sandbox_timeout(&self) -> Duration {
        GENERATIVE_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::Exists,
        )
        .await
    }
}

/// Programmatic animation rendered with the manim library.
pub struct AnimationPlugin {
    executor: Executor,
}

impl AnimationPlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for AnimationPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for AnimationPlugin {
    fn name(&self) -> &str {
        "manim"
    }

    fn description(&self) -> &str {
        "Generates animated video from a text description of the animation: \
         explainers, data visualization, animating text or shapes, and \
         motion graphics. The output is always a .mov file rendered with a \
         transparent background, which makes it suitable for overlays."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that build a single manim Scene from the \
         task description and render it programmatically, with a \
         transparent background, into the declared .mov output. Keep scenes \
         short and deterministic, use only shapes and text available in \
         manim itself, and avoid Tex and MathTex."
    }

    fn prerequisites(&self) -> &str {
        "The manim package is importable; ffmpeg is on PATH for encoding. \
         No LaTeX distribution is assumed."
    }

    fn sandbox_timeout(&self) -> Duration {
        ANIMATION_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::MediaReadable,
        )
        .await
    }
}

/// Instrumental music from a hosted generation service.
pub struct MusicPlugin {
    executor: Executor,
}

impl MusicPlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for MusicPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for MusicPlugin {
    fn name(&self) -> &str {
        "music"
    }

    fn description(&self) -> &str {
        "Generates instrumental music from a text description of a genre, \
         mood, or style (for example 'upbeat electronic pop' or 'sad piano \
         melody'). Always produces a 30-second loopable audio clip (.wav); \
         custom durations are not supported."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that request a 30-second instrumental \
         track from the configured music generation endpoint over HTTP, \
         decode the base64 audio payload, and save it to the declared .wav \
         output. If the endpoint is unreachable or unconfigured, write a \
         minimal silent WAV locally instead of failing."
    }

    fn prerequisites(&self) -> &str {
        "Network access to the music endpoint when available; Python \
         standard library only for the local fallback."
    }

    fn sandbox_timeout(&self) -> Duration {
        MUSIC_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::Exists,
        )
        .await
    }
}

/// Narration audio from a hosted text-to-speech service.
pub struct VoiceoverPlugin {
    executor: Executor,
}

impl VoiceoverPlugin {
    /// Plugin with the default `python3` interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executor: Executor::new(),
        }
    }

    /// Plugin running scripts through a specific interpreter.
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executor: Executor::with_interpreter(interpreter),
        }
    }
}

impl Default for VoiceoverPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPlugin for VoiceoverPlugin {
    fn name(&self) -> &str {
        "voiceover"
    }

    fn description(&self) -> &str {
        "Generates a single high-quality voiceover audio file (.mp3) from a \
         text script. Best for short phrases or paragraphs that do not need \
         per-sentence synchronization to video."
    }

    fn generation_instructions(&self) -> &str {
        "You write Python scripts that synthesize speech for the task's \
         script text through the configured text-to-speech endpoint and \
         save the returned MP3 bytes to the declared output. If the \
         endpoint is unreachable or unconfigured, write a short silent MP3 \
         placeholder instead of failing."
    }

    fn prerequisites(&self) -> &str {
        "Network access to the text-to-speech endpoint when available."
    }

    fn sandbox_timeout(&self) -> Duration {
        VOICEOVER_BUDGET
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        validate_in_sandbox(
            &self.executor,
            script,
            sandbox_dir,
            inputs,
            outputs,
            self.sandbox_timeout(),
            OutputCheck::Exists,
        )
        .await
    }
}

/// Combined instruction block for one plugin: shared rules plus its own.
#[must_use]
pub fn full_instructions(plugin: &dyn ToolPlugin) -> String {
    format!(
        "{}\n\n{}\n\nEnvironment: {}",
        plugin.generation_instructions(),
        SHARED_SCRIPT_RULES,
        plugin.prerequisites()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_are_ordered_by_expected_cost() {
        let probe = MetadataProbePlugin::new();
        let voiceover = VoiceoverPlugin::new();
        let cli = MediaCommandLinePlugin::new();
        let scripting = ScriptingLibraryPlugin::new();
        let music = MusicPlugin::new();
        let animation = AnimationPlugin::new();
        let generative = GenerativeMediaPlugin::new();
        assert!(probe.sandbox_timeout() < voiceover.sandbox_timeout());
        assert!(voiceover.sandbox_timeout() < cli.sandbox_timeout());
        assert!(cli.sandbox_timeout() < scripting.sandbox_timeout());
        assert!(scripting.sandbox_timeout() < music.sandbox_timeout());
        assert!(music.sandbox_timeout() < animation.sandbox_timeout());
        assert!(animation.sandbox_timeout() < generative.sandbox_timeout());
    }

    #[test]
    fn names_are_unique() {
        let plugins: Vec<Box<dyn ToolPlugin>> = vec![
            Box::new(MediaCommandLinePlugin::new()),
            Box::new(ScriptingLibraryPlugin::new()),
            Box::new(MetadataProbePlugin::new()),
            Box::new(GenerativeMediaPlugin::new()),
            Box::new(AnimationPlugin::new()),
            Box::new(MusicPlugin::new()),
            Box::new(VoiceoverPlugin::new()),
        ];
        let mut names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn full_instructions_include_shared_rules() {
        let plugin = MediaCommandLinePlugin::new();
        let text = full_instructions(&plugin);
        assert!(text.contains("markdown fences"));
        assert!(text.contains("ffmpeg"));
    }
}
