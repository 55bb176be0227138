// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office document → PDF conversion via LibreOffice.
//
// The print subsystem only understands PDF, so DOC/DOCX uploads are run
// through `soffice --headless --convert-to pdf`.  LibreOffice writes
// `<outdir>/<input stem>.pdf`; a zero exit status without that file is still
// a failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

use printdrop_core::error::{PrintdropError, Result};

/// Capability: convert one document into a printable PDF.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `input` and write the PDF into `output_dir`.
    ///
    /// Returns the path of the produced file.  Callers bound the call with a
    /// timeout; implementations must not leave child processes behind when
    /// the future is dropped.
    async fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf>;
}

/// Well-known install locations, tried after `$PATH`.
const SOFFICE_CANDIDATES: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/bin/libreoffice",
    "/usr/local/bin/soffice",
    "/opt/libreoffice/program/soffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    "C:\\Program Files\\LibreOffice\\program\\soffice.exe",
    "C:\\Program Files (x86)\\LibreOffice\\program\\soffice.exe",
];

/// Converter backed by the LibreOffice command line.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl SofficeConverter {
    /// Use an explicit `soffice` binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `explicit` if given, otherwise search `$PATH` and the usual install
    /// locations, falling back to a bare `soffice`.
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let program = explicit
            .or_else(|| find_in_path(&["soffice", "libreoffice"]))
            .or_else(|| {
                SOFFICE_CANDIDATES
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_file())
            })
            .unwrap_or_else(|| PathBuf::from("soffice"));
        info!(program = %program.display(), "LibreOffice converter configured");
        Self { program }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Converter for SofficeConverter {
    #[instrument(skip(self), fields(input = %input.display()))]
    async fn convert_to_pdf(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        debug!(program = %self.program.display(), "starting conversion");

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PrintdropError::Conversion(format!(
                    "could not start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = %output.status, stderr = %stderr.trim(), "LibreOffice conversion failed");
            return Err(PrintdropError::Conversion(format!(
                "converter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let produced = expected_output(input, output_dir)?;
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            let stdout = String::from_utf8_lossy(&output.stdout);
            error!(expected = %produced.display(), stdout = %stdout.trim(), "PDF missing after conversion");
            return Err(PrintdropError::Conversion(
                "no PDF was produced by the converter".into(),
            ));
        }

        info!(output = %produced.display(), "conversion successful");
        Ok(produced)
    }
}

/// Where LibreOffice writes the PDF for `input`.
fn expected_output(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        PrintdropError::Conversion(format!("input has no file name: {}", input.display()))
    })?;
    let mut name = stem.to_os_string();
    name.push(".pdf");
    Ok(output_dir.join(name))
}

/// First executable named `names[i]` found on `$PATH`.
fn find_in_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_replaces_extension() {
        let out = expected_output(Path::new("/tmp/up/171-abc.docx"), Path::new("/tmp/up"))
            .expect("has stem");
        assert_eq!(out, PathBuf::from("/tmp/up/171-abc.pdf"));
    }

    #[test]
    fn explicit_program_wins() {
        let conv = SofficeConverter::locate(Some(PathBuf::from("/opt/custom/soffice")));
        assert_eq!(conv.program(), Path::new("/opt/custom/soffice"));
    }

    #[tokio::test]
    async fn missing_program_is_conversion_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"docx").expect("write");

        let conv = SofficeConverter::new(dir.path().join("no-such-soffice"));
        let err = conv
            .convert_to_pdf(&input, dir.path())
            .await
            .expect_err("must fail");
        assert!(matches!(err, PrintdropError::Conversion(_)));
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fake_soffice_produces_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            dir.path(),
            "fake-soffice",
            r#"while [ $# -gt 1 ]; do
  if [ "$1" = "--outdir" ]; then out="$2"; fi
  shift
done
base=$(basename "$1")
printf 'PDF' > "$out/${base%.*}.pdf""#,
        );
        let input = dir.path().join("memo.docx");
        std::fs::write(&input, b"docx").expect("write");

        let produced = SofficeConverter::new(script)
            .convert_to_pdf(&input, dir.path())
            .await
            .expect("conversion");
        assert_eq!(produced, dir.path().join("memo.pdf"));
        assert_eq!(std::fs::read(&produced).expect("read"), b"PDF");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "broken-soffice", "echo 'source file could not be loaded' >&2\nexit 3");
        let input = dir.path().join("memo.doc");
        std::fs::write(&input, b"doc").expect("write");

        let err = SofficeConverter::new(script)
            .convert_to_pdf(&input, dir.path())
            .await
            .expect_err("must fail");
        match err {
            PrintdropError::Conversion(msg) => assert!(msg.contains("could not be loaded")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_without_output_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "silent-soffice", "exit 0");
        let input = dir.path().join("memo.doc");
        std::fs::write(&input, b"doc").expect("write");

        let err = SofficeConverter::new(script)
            .convert_to_pdf(&input, dir.path())
            .await
            .expect_err("must fail");
        assert!(matches!(err, PrintdropError::Conversion(_)));
    }
}
