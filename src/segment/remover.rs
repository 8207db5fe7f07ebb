use std::{
    io::{BufRead as _, BufReader, Read as _},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    assets::{
        decode::{apply_alpha_matte, decode_bitmap, encode_png},
        upload::UploadFile,
    },
    foundation::error::{TextBehindError, TextBehindResult},
};

/// Model key used when none is configured.
pub const DEFAULT_MODEL: &str = "isnet_fp16";

/// Model-selection options forwarded to a remover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovalConfig {
    pub model: String,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Progress of one phase of background removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Phase key, e.g. `fetch:model` or `compute:inference`.
    pub phase: String,
    pub current: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn new(phase: impl Into<String>, current: u64, total: u64) -> Self {
        Self {
            phase: phase.into(),
            current,
            total,
        }
    }

    /// Rounded completion percentage; 0 when the total is unknown.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.current as f64 / self.total as f64) * 100.0).round() as u32
    }

    /// Model/asset download phases are the ones surfaced to the user.
    pub fn is_model_download(&self) -> bool {
        self.phase.starts_with("fetch")
    }
}

/// Receiver of progress events emitted during removal.
pub trait ProgressReporter {
    fn report(&mut self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&ProgressEvent),
{
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _event: &ProgressEvent) {}
}

/// Turns an uploaded image into an encoded cutout (the subject on a transparent background).
///
/// Failures are reported as [`TextBehindError::Segmentation`] and are never retried.
pub trait BackgroundRemover {
    fn remove_background(
        &self,
        file: &UploadFile,
        config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>>;
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for &R {
    fn remove_background(
        &self,
        file: &UploadFile,
        config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        (**self).remove_background(file, config, progress)
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for Box<R> {
    fn remove_background(
        &self,
        file: &UploadFile,
        config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        (**self).remove_background(file, config, progress)
    }
}

/// Runs an external segmentation program.
///
/// The argument template may contain `{input}`, `{output}` and `{model}`; both `{input}`
/// and `{output}` are required. Lines printed on stdout in the form
/// `progress <phase> <current> <total>` are forwarded as progress events.
#[derive(Clone, Debug)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
}

impl CommandRemover {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> TextBehindResult<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(TextBehindError::validation(
                "remover command must name a program",
            ));
        }
        for placeholder in ["{input}", "{output}"] {
            if !args.iter().any(|a| a.contains(placeholder)) {
                return Err(TextBehindError::validation(format!(
                    "remover arguments must contain {placeholder}"
                )));
            }
        }
        Ok(Self { program, args })
    }

    /// Build from a full argv (program first).
    pub fn from_argv(argv: &[String]) -> TextBehindResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| TextBehindError::validation("remover command must name a program"))?;
        Self::new(program.clone(), args.to_vec())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn expand_args(&self, input: &Path, output: &Path, model: &str) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| {
                a.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{model}", model)
            })
            .collect()
    }
}

impl BackgroundRemover for CommandRemover {
    #[tracing::instrument(skip_all, fields(program = %self.program, model = %config.model))]
    fn remove_background(
        &self,
        file: &UploadFile,
        config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        let scratch = ScratchFiles::new(file)?;
        std::fs::write(&scratch.input, file.bytes.as_slice()).map_err(|e| {
            TextBehindError::segmentation(format!("failed to stage input image: {e}"))
        })?;

        progress.report(&ProgressEvent::new("compute:inference", 0, 1));

        let mut child = Command::new(&self.program)
            .args(self.expand_args(&scratch.input, &scratch.output, &config.model))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TextBehindError::segmentation(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.program
                ))
            })?;

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                match parse_progress_line(&line) {
                    Some(event) => progress.report(&event),
                    None => tracing::trace!(line = %line, "remover output"),
                }
            }
        }

        let status = child.wait().map_err(|e| {
            TextBehindError::segmentation(format!("failed to wait for '{}': {e}", self.program))
        })?;
        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(TextBehindError::segmentation(format!(
                "'{}' exited with status {status}: {}",
                self.program,
                stderr.trim()
            )));
        }

        let bytes = std::fs::read(&scratch.output).map_err(|e| {
            TextBehindError::segmentation(format!("remover produced no output file: {e}"))
        })?;
        if bytes.is_empty() {
            return Err(TextBehindError::segmentation("remover produced an empty image"));
        }

        progress.report(&ProgressEvent::new("compute:inference", 1, 1));
        tracing::debug!(bytes = bytes.len(), "cutout produced");
        Ok(bytes)
    }
}

fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "progress" {
        return None;
    }
    let phase = parts.next()?;
    let current = parts.next()?.parse().ok()?;
    let total = parts.next()?.parse().ok()?;
    Some(ProgressEvent::new(phase, current, total))
}

/// Input/output paths in the temp directory, removed on drop.
struct ScratchFiles {
    input: PathBuf,
    output: PathBuf,
}

impl ScratchFiles {
    fn new(file: &UploadFile) -> TextBehindResult<Self> {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let stem = format!("textbehind-{}-{n}", std::process::id());
        let ext = Path::new(&file.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("img");

        let dir = std::env::temp_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            TextBehindError::segmentation(format!("cannot create temp directory: {e}"))
        })?;
        Ok(Self {
            input: dir.join(format!("{stem}-in.{ext}")),
            output: dir.join(format!("{stem}-out.png")),
        })
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.input);
        let _ = std::fs::remove_file(&self.output);
    }
}

/// Returns a cutout that was computed ahead of time.
#[derive(Clone, Debug)]
pub struct CutoutFileRemover {
    path: PathBuf,
}

impl CutoutFileRemover {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BackgroundRemover for CutoutFileRemover {
    fn remove_background(
        &self,
        _file: &UploadFile,
        _config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            TextBehindError::segmentation(format!(
                "cannot read cutout '{}': {e}",
                self.path.display()
            ))
        })?;
        if bytes.is_empty() {
            return Err(TextBehindError::segmentation(format!(
                "cutout '{}' is empty",
                self.path.display()
            )));
        }
        let len = bytes.len() as u64;
        progress.report(&ProgressEvent::new("fetch:cutout", len, len));
        Ok(bytes)
    }
}

/// Treats the inner remover's output as a grayscale matte and applies it as the alpha
/// channel of the uploaded image. The result is PNG encoded.
#[derive(Clone, Debug)]
pub struct MaskRemover<R> {
    inner: R,
}

impl<R: BackgroundRemover> MaskRemover<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BackgroundRemover> BackgroundRemover for MaskRemover<R> {
    fn remove_background(
        &self,
        file: &UploadFile,
        config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        let matte_bytes = self.inner.remove_background(file, config, progress)?;
        let as_segmentation =
            |e: TextBehindError| TextBehindError::segmentation(format!("mask: {}", e.user_message()));

        let original = decode_bitmap(file.bytes.as_slice()).map_err(as_segmentation)?;
        let matte = decode_bitmap(&matte_bytes).map_err(as_segmentation)?;
        let cutout = apply_alpha_matte(&original, &matte).map_err(as_segmentation)?;
        encode_png(&cutout).map_err(as_segmentation)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/segment/remover.rs"]
mod tests;
