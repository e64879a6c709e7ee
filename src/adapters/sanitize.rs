//! Log redaction for clinical values.
//!
//! Observations are redacted by type (their `Debug` prints field names only),
//! but formatted messages can still carry values, e.g. `age=40` or
//! `"oxygen": 91`. This module scrubs such key/value pairs for clinical
//! fields, plus record identifiers, before log lines reach the sink.
//!
//! Input is capped per call (`CWA_SANITIZE_MAX_BYTES`, default 16 KiB).

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Observation fields whose values never belong in logs.
const CLINICAL_FIELDS: &str = "age|gender|weight_kg|heart_rate|respiratory|systolic_bp|oxygen|gcs|symptoms|comorbidity|exposure_estimate|time_since_exposure_min|exposure_route";

struct Rules {
    set: RegexSet,
    rules: Vec<(Regex, &'static str)>,
}

fn rules() -> &'static Result<Rules, regex::Error> {
    static RULES: OnceLock<Result<Rules, regex::Error>> = OnceLock::new();
    RULES.get_or_init(|| {
        let specs: Vec<(String, &'static str)> = vec![
            // key=value / key: value / "key": value (quoted values included)
            (
                format!(
                    r#"(?i)(?P<key>"?\b(?:{CLINICAL_FIELDS})\b"?\s*[:=]\s*)(?:"[^"]*"|[^\s,}}\]]+)"#
                ),
                "${key}[REDACTED]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
                    .to_string(),
                "[REDACTED-UUID]",
            ),
            (r"\bMRN[:\s]?\d{6,10}\b".to_string(), "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9._%+-]{1,64}@(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}\b".to_string(),
                "[REDACTED-EMAIL]",
            ),
        ];

        let set = RegexSet::new(specs.iter().map(|(p, _)| p.as_str()))?;
        let rules = specs
            .into_iter()
            .map(|(p, r)| Regex::new(&p).map(|re| (re, r)))
            .collect::<Result<_, _>>()?;
        Ok(Rules { set, rules })
    })
}

/// Compile the redaction rules, reporting the first bad pattern.
///
/// Call before installing the subscriber. Lines written while the rules are
/// broken are dropped rather than written unredacted.
///
/// # Errors
/// Returns the `regex` compile error.
pub fn check_rules() -> Result<(), regex::Error> {
    rules().as_ref().map(|_| ()).map_err(Clone::clone)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("CWA_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Redact clinical values and identifiers from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

const DROPPED_LINE: &str = "[REDACTED: log sanitizer unavailable]";

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    redact(rules().as_ref().ok(), input, max_bytes)
}

fn redact(rules: Option<&Rules>, input: &str, max_bytes: usize) -> String {
    let Some(rules) = rules else {
        let mut out = DROPPED_LINE.to_string();
        if input.ends_with('\n') {
            out.push('\n');
        }
        return out;
    };
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut out = prefix.to_string();
    for idx in rules.set.matches(prefix).into_iter() {
        if let Some((re, replacement)) = rules.rules.get(idx) {
            out = re.replace_all(&out, *replacement).into_owned();
        }
    }
    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// `MakeWriter` wrapper that sanitizes each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines()?;

        // A single line without newline must not grow without bound.
        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}
