#![allow(dead_code)]

pub mod harness;

/// Route `tracing` output to the test writer; `RUST_LOG` selects the level
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

/// Lines of `text` split on CRLF, lone CR and lone LF
pub fn split_lines(text: &[u16]) -> Vec<String> {
    const CR: u16 = b'\r' as u16;
    const LF: u16 = b'\n' as u16;
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            CR => {
                lines.push(String::from_utf16_lossy(&text[start..i]));
                if text.get(i + 1) == Some(&LF) {
                    i += 1;
                }
                start = i + 1;
            }
            LF => {
                lines.push(String::from_utf16_lossy(&text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(String::from_utf16_lossy(&text[start..]));
    lines
}
