//! Line forwarding of a child's stdout/stderr to the log sink

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Which output stream of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }

    /// Prefix used when forwarding this stream, e.g. `"tee:ffmpeg stdErr> "`
    pub fn prefix(&self, label: &str, program: &str) -> String {
        let tag = match self {
            OutputStream::Stdout => "stdOut",
            OutputStream::Stderr => "stdErr",
        };
        format!("{label}:{program} {tag}> ")
    }
}

/// Copy every line of `stream` to the log, prefixed with `prefix`.
///
/// Runs until the stream reaches EOF or fails; returns the number of lines
/// forwarded. Invalid UTF-8 is replaced, read failures end forwarding.
pub async fn forward_lines<R>(stream: R, prefix: String) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let mut count = 0;
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                log::debug!("{}{}", prefix, text.trim_end_matches(['\n', '\r']));
                count += 1;
            }
            Err(e) => {
                log::trace!("{}stream closed: {}", prefix, e);
                break;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_format() {
        assert_eq!(
            OutputStream::Stdout.prefix("test_tee", "ffmpeg"),
            "test_tee:ffmpeg stdOut> "
        );
        assert_eq!(
            OutputStream::Stderr.prefix("audio", "cat"),
            "audio:cat stdErr> "
        );
    }

    #[tokio::test]
    async fn test_forward_lines_counts() {
        let input: &[u8] = b"frame=1\nframe=2\n\nlast without newline";
        let forwarded = forward_lines(input, "p> ".to_string()).await;
        assert_eq!(forwarded, 4);
    }

    #[tokio::test]
    async fn test_forward_lines_binary() {
        let input: &[u8] = &[0xff, 0xfe, b'\n', 0x80, 0x00];
        assert_eq!(forward_lines(input, String::new()).await, 2);
    }

    #[tokio::test]
    async fn test_forward_lines_empty() {
        let input: &[u8] = b"";
        assert_eq!(forward_lines(input, String::new()).await, 0);
    }
}
