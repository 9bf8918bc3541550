use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

use press_core::codec::Codec;
use press_core::container::{gzip_compress, gzip_decompress};
use press_core::{Error, Result};
use tracing::{trace, warn};

/// Codec that pipes every block through an external compressor binary.
///
/// The compressor's output is stored inside a level-0 gzip member, so the
/// container stays a valid gzip stream whatever the backend is. One short-lived
/// process is spawned per block; stdin/stdout are the only channels used.
///
/// Best for: archival data where ratio matters more than speed (xz).
pub struct ExternalCodec {
    name: &'static str,
    binary: PathBuf,
    compress_args: &'static [&'static str],
    decompress_args: &'static [&'static str],
}

impl ExternalCodec {
    /// `xz -c` (or `xz -c1` when `fast`), decompressed with `xz -dc`.
    pub fn xz(binary: impl Into<PathBuf>, fast: bool) -> Self {
        Self {
            name: if fast { "xz-min" } else { "xz" },
            binary: binary.into(),
            compress_args: if fast { &["-c1"] } else { &["-c"] },
            decompress_args: &["-dc"],
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>> {
        let output = ScopedProcess::spawn(&self.binary, args)?
            .communicate(input)
            .inspect_err(|e| warn!(binary = %self.binary.display(), ?args, error = %e, "external codec failed"))?;
        trace!(binary = %self.binary.display(), ?args, input = input.len(), output = output.len(), "external codec run");
        Ok(output)
    }
}

impl Codec for ExternalCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let packed = self.run(self.compress_args, raw)?;
        gzip_compress(&packed, 0)
    }

    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        let packed = gzip_decompress(compressed)?;
        self.run(self.decompress_args, &packed)
    }
}

/// A child process that is always reaped.
///
/// Pipes are moved out while the process runs and dropped (closed) before the
/// final wait. If anything fails before that wait, `Drop` kills and reaps the
/// child, so no process or pipe outlives the block it was spawned for.
struct ScopedProcess {
    child: Child,
    reaped: bool,
}

impl ScopedProcess {
    fn spawn(binary: &Path, args: &[&str]) -> Result<Self> {
        let child = Command::new(binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Backend(format!("cannot spawn {}: {}", binary.display(), e)))?;
        Ok(Self { child, reaped: false })
    }

    /// Feed `input` on stdin while draining stdout and stderr, then wait.
    ///
    /// Any spawn, pipe, or exit-status problem is a backend failure and the
    /// partial output is dropped.
    fn communicate(mut self, input: &[u8]) -> Result<Vec<u8>> {
        let (stdin, stdout, stderr) = match (self.child.stdin.take(), self.child.stdout.take(), self.child.stderr.take()) {
            (Some(i), Some(o), Some(e)) => (i, o, e),
            _ => return Err(Error::Backend("child process pipes unavailable".into())),
        };

        let (written, output, diagnostics) = thread::scope(|s| {
            let writer = s.spawn(move || feed(stdin, input));
            let errors = s.spawn(move || drain_stderr(stderr));
            let output = drain(stdout);
            (writer.join(), output, errors.join())
        });

        let status = self
            .child
            .wait()
            .map_err(|e| Error::Backend(format!("waiting for backend: {}", e)))?;
        self.reaped = true;

        if !status.success() {
            let diagnostics = diagnostics.unwrap_or_default();
            return Err(Error::Backend(format!(
                "backend exited with {}: {}",
                status,
                String::from_utf8_lossy(&diagnostics).trim()
            )));
        }
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Error::Backend(format!("writing to backend: {}", e))),
            Err(_) => return Err(Error::Backend("backend writer thread panicked".into())),
        }
        output.map_err(|e| Error::Backend(format!("reading from backend: {}", e)))
    }
}

impl Drop for ScopedProcess {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn feed(mut stdin: ChildStdin, input: &[u8]) -> std::io::Result<()> {
    stdin.write_all(input)?;
    stdin.flush()
    // stdin dropped here: EOF for the child
}

fn drain(mut stdout: ChildStdout) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    stdout.read_to_end(&mut out)?;
    Ok(out)
}

fn drain_stderr(mut stderr: ChildStderr) -> Vec<u8> {
    let mut out = Vec::new();
    let _ = stderr.read_to_end(&mut out);
    out
}
