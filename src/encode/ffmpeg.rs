use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread::JoinHandle;

#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub output: PathBuf,
    /// Original track, muxed back in as the soundtrack.
    pub audio: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

/// Raw RGBA frames on stdin, encoded video plus original audio out.
pub fn encoder_args(settings: &EncoderSettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-nostats",
        "-loglevel", "error",
        "-f", "rawvideo",
        "-pixel_format", "rgba",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.extend([
        "-video_size".into(),
        format!("{}x{}", settings.width, settings.height).into(),
        "-framerate".into(),
        settings.fps.to_string().into(),
        "-i".into(),
        "pipe:0".into(),
        "-i".into(),
        settings.audio.as_os_str().to_owned(),
        "-c:v".into(),
        settings.codec.clone().into(),
        "-pix_fmt".into(),
        settings.pix_fmt.clone().into(),
        "-crf".into(),
        settings.crf.to_string().into(),
        "-preset".into(),
        "medium".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-shortest".into(),
        settings.output.as_os_str().to_owned(),
    ]);

    args
}

pub struct FfmpegEncoder {
    child: Child,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

/// Collect stderr on its own thread so a chatty ffmpeg can never fill the
/// pipe and stall the frame writes on stdin.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = stderr.read_to_end(&mut buf) {
            log::warn!("Lost ffmpeg stderr: {}", err);
        }
        buf
    })
}

impl FfmpegEncoder {
    pub fn new(settings: &EncoderSettings) -> Result<Self> {
        let mut command = Command::new("ffmpeg");
        command.args(encoder_args(settings));
        let encoder = Self::spawn(command).context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        Ok(encoder)
    }

    fn spawn(mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        let stderr = child.stderr.take().map(drain_stderr);
        Ok(Self { child, stderr })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self, output: &Path) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let status = self.child.wait().context("Failed to wait for ffmpeg")?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete: {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_pipe_rgba_and_mux_audio() {
        let settings = EncoderSettings {
            output: PathBuf::from("out.mp4"),
            audio: PathBuf::from("song.flac"),
            width: 1280,
            height: 720,
            fps: 60,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 20,
        };
        let args: Vec<String> = encoder_args(&settings)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-video_size") + 1], "1280x720");
        assert_eq!(args[pos("-framerate") + 1], "60");
        assert_eq!(args[pos("-crf") + 1], "20");
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "song.flac"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> FfmpegEncoder {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        FfmpegEncoder::spawn(command).unwrap()
    }

    #[test]
    fn args_keep_stderr_quiet() {
        let settings = EncoderSettings {
            output: PathBuf::from("out.mp4"),
            audio: PathBuf::from("song.flac"),
            width: 64,
            height: 64,
            fps: 30,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
        };
        let args: Vec<String> = encoder_args(&settings)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.iter().any(|a| a == "-nostats"));
        assert!(args.windows(2).any(|w| w[0] == "-loglevel" && w[1] == "error"));
    }

    #[cfg(unix)]
    #[test]
    fn chatty_encoder_does_not_stall_writes() {
        // ~500 KiB of progress lines before stdin is read, well past a pipe buffer
        let mut encoder = shell(
            "i=0; while [ $i -lt 8000 ]; do \
             echo 'frame=  120 fps= 60 q=28.0 size=256kB time=00:00:02.00 speed=1x' >&2; \
             i=$((i+1)); done; cat > /dev/null",
        );
        let frame = vec![0u8; 64 * 1024];
        for _ in 0..64 {
            encoder.write_frame(&frame).unwrap();
        }
        encoder.finish(Path::new("out.mp4")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn failed_encoder_reports_its_stderr() {
        let mut encoder = shell("cat > /dev/null; echo 'Unknown encoder libnope' >&2; exit 1");
        encoder.write_frame(&[0u8; 16]).unwrap();
        let err = encoder.finish(Path::new("out.mp4")).unwrap_err();
        assert!(err.to_string().contains("Unknown encoder libnope"));
    }
}
