// src/process/output.rs

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One output stream of a freshly started child.
#[derive(Debug)]
pub enum OutputPipe {
    Stdout(ChildStdout),
    Stderr(ChildStderr),
}

impl OutputPipe {
    pub fn label(&self) -> &'static str {
        match self {
            OutputPipe::Stdout(_) => "stdout:",
            OutputPipe::Stderr(_) => "stderr:",
        }
    }
}

/// Spawn the output logger.
///
/// The supervisor sends each child's stdout and then its stderr over the
/// returned channel. Every pipe gets its own Tokio task that logs lines until
/// end-of-stream, so a chatty or stuck child never blocks the supervisor.
pub fn spawn_output_logger(label_lines: bool) -> mpsc::Sender<OutputPipe> {
    let (tx, mut rx) = mpsc::channel::<OutputPipe>(1);

    tokio::spawn(async move {
        while let Some(pipe) = rx.recv().await {
            let label = label_lines.then(|| pipe.label());
            match pipe {
                OutputPipe::Stdout(stdout) => {
                    tokio::spawn(drain_lines(stdout, label));
                }
                OutputPipe::Stderr(stderr) => {
                    tokio::spawn(drain_lines(stderr, label));
                }
            }
        }
        debug!("output logger finished (channel closed)");
    });

    tx
}

/// Log every line of `reader` until end-of-stream or a read error.
///
/// Lines are read as raw bytes and decoded lossily, so output that is not
/// UTF-8 is still logged and the pipe keeps being drained. Returns the number
/// of lines logged. End-of-stream, including when the child is killed, is the
/// normal way for this to finish.
pub async fn drain_lines<R>(reader: R, label: Option<&'static str>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(trim_newline(&buf));
                info!("{}", format_line(label, &line));
                count += 1;
            }
            Err(err) => {
                warn!(?label, error = %err, "could not read child output");
                break;
            }
        }
    }

    debug!(?label, lines = count, "output stream ended");
    count
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub fn format_line(label: Option<&str>, line: &str) -> String {
    match label {
        Some(label) => format!("{label} {line}"),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_labelled_only_when_enabled() {
        assert_eq!(format_line(Some("stderr:"), "boom"), "stderr: boom");
        assert_eq!(format_line(None, "boom"), "boom");
    }

    #[tokio::test]
    async fn drains_until_end_of_stream() {
        let input: &[u8] = b"first\nsecond\nlast without newline";
        assert_eq!(drain_lines(input, Some("stdout:")).await, 3);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_draining() {
        let input: &[u8] = b"first\n\xff\xfe bad\nthird\r\nfourth\n";
        assert_eq!(drain_lines(input, None).await, 4);
    }

    #[test]
    fn line_endings_are_trimmed() {
        assert_eq!(trim_newline(b"text\r\n"), b"text");
        assert_eq!(trim_newline(b"text\n"), b"text");
        assert_eq!(trim_newline(b"text"), b"text");
    }

    #[tokio::test]
    async fn empty_stream_is_not_an_error() {
        let input: &[u8] = b"";
        assert_eq!(drain_lines(input, None).await, 0);
    }
}
