//! Interactive session: a thin menu loop over [`ImageService`].
//!
//! The session owns the only reference to the current image. It prompts for
//! a source until one loads, then reads one action per line until `quit` or
//! end of input. Input and output are generic so tests can drive a session
//! from a byte buffer.
//!
//! Every failure is reported and the loop continues:
//!
//! - a bad source at startup re-prompts; a bad source for `load` keeps the
//!   current image
//! - an invalid size re-prompts for width and height
//! - an unknown filter or bad parameter returns to the menu
//! - a failed save falls back to `auto_saved` in the output directory

use crate::imaging::{FilterKind, ImageBackend, LoadError, ResizeBounds, parse_filter_params};
use crate::output;
use crate::service::ImageService;
use log::warn;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// File name used when a requested save fails.
pub const AUTO_SAVE_NAME: &str = "auto_saved";

const SOURCE_PROMPT: &str = "Image path or URL: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Show,
    Write,
    Resize,
    Filter,
    Info,
    Load,
    Quit,
}

impl Action {
    fn parse(input: &str) -> Option<Self> {
        let action = match input.trim().to_ascii_lowercase().as_str() {
            "s" | "show" => Self::Show,
            "w" | "write" | "save" => Self::Write,
            "r" | "resize" => Self::Resize,
            "f" | "filter" => Self::Filter,
            "i" | "info" => Self::Info,
            "l" | "load" | "reload" => Self::Load,
            "q" | "quit" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(action)
    }
}

pub struct Session<B: ImageBackend, R, W> {
    service: ImageService<B>,
    bounds: ResizeBounds,
    input: R,
    output: W,
}

impl<B, R, W> Session<B, R, W>
where
    B: ImageBackend + Clone,
    R: BufRead,
    W: Write,
{
    /// Open the first image. `initial` is tried first, then the user is
    /// prompted until a source loads. Returns `None` if input ends first.
    pub fn start(
        backend: B,
        bounds: ResizeBounds,
        initial: Option<&str>,
        mut input: R,
        mut output: W,
    ) -> io::Result<Option<Self>> {
        let mut candidate = initial.map(str::to_string);
        loop {
            let source = match candidate.take() {
                Some(source) => source,
                None => match prompt(&mut input, &mut output, SOURCE_PROMPT)? {
                    Some(source) => source,
                    None => return Ok(None),
                },
            };
            if source.is_empty() {
                continue;
            }
            match ImageService::open(backend.clone(), &source) {
                Ok(service) => {
                    let lines = output::format_info(service.source(), &service.info());
                    output::write_lines(&mut output, &lines)?;
                    return Ok(Some(Self {
                        service,
                        bounds,
                        input,
                        output,
                    }));
                }
                Err(e) => report_load_error(&mut output, &e)?,
            }
        }
    }

    pub fn service(&self) -> &ImageService<B> {
        &self.service
    }

    /// Read and execute actions until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        output::write_lines(&mut self.output, &output::format_menu())?;
        loop {
            let Some(line) = self.prompt("> ")? else {
                return Ok(());
            };
            if line.is_empty() {
                continue;
            }
            let Some(action) = Action::parse(&line) else {
                writeln!(self.output, "Unknown action '{}'", line)?;
                output::write_lines(&mut self.output, &output::format_menu())?;
                continue;
            };
            match action {
                Action::Show => self.show()?,
                Action::Write => self.save()?,
                Action::Resize => self.resize()?,
                Action::Filter => self.filter()?,
                Action::Info => self.info()?,
                Action::Load => self.reload()?,
                Action::Quit => return Ok(()),
            }
        }
    }

    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        prompt(&mut self.input, &mut self.output, label)
    }

    fn show(&mut self) -> io::Result<()> {
        if let Err(e) = self.service.show() {
            writeln!(self.output, "Show failed: {}", e)?;
        }
        Ok(())
    }

    fn save(&mut self) -> io::Result<()> {
        let Some(requested) = self.prompt("Save as: ")? else {
            return Ok(());
        };
        match self.service.save(Path::new(&requested)) {
            Ok(path) => writeln!(self.output, "{}", output::format_saved(&path)),
            Err(e) => {
                warn!(
                    "Save to '{}' failed ({}), falling back to {}",
                    requested, e, AUTO_SAVE_NAME
                );
                writeln!(self.output, "Save failed: {}", e)?;
                match self.service.save(Path::new(AUTO_SAVE_NAME)) {
                    Ok(path) => writeln!(self.output, "{}", output::format_saved(&path)),
                    Err(e) => writeln!(self.output, "Auto-save failed: {}", e),
                }
            }
        }
    }

    fn resize(&mut self) -> io::Result<()> {
        loop {
            let Some(width) = self.prompt("Width: ")? else {
                return Ok(());
            };
            let Some(height) = self.prompt("Height: ")? else {
                return Ok(());
            };
            match self.bounds.parse(&width, &height) {
                Ok(size) => {
                    self.service.resize(size);
                    return writeln!(self.output, "Resized to {}", size);
                }
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }

    fn filter(&mut self) -> io::Result<()> {
        output::write_lines(
            &mut self.output,
            &output::format_filter_catalog(self.service.filters()),
        )?;
        let Some(name) = self.prompt("Filter: ")? else {
            return Ok(());
        };
        let kind: FilterKind = match name.parse() {
            Ok(kind) => kind,
            Err(e) => return writeln!(self.output, "{}", e),
        };
        let Some(raw) = self.prompt("Parameters (name=value, comma-separated; blank for defaults): ")? else {
            return Ok(());
        };
        let params = match parse_filter_params(&raw) {
            Ok(params) => params,
            Err(e) => return writeln!(self.output, "{}", e),
        };
        match self.service.apply_filter(kind, &params) {
            Ok(resolved) => {
                output::write_lines(&mut self.output, &output::format_applied(kind, &resolved))
            }
            Err(e) => writeln!(self.output, "{}", e),
        }
    }

    fn info(&mut self) -> io::Result<()> {
        let lines = output::format_info(self.service.source(), &self.service.info());
        output::write_lines(&mut self.output, &lines)
    }

    fn reload(&mut self) -> io::Result<()> {
        let Some(source) = self.prompt(SOURCE_PROMPT)? else {
            return Ok(());
        };
        match self.service.reload(&source) {
            Ok(()) => self.info(),
            Err(e) => {
                report_load_error(&mut self.output, &e)?;
                writeln!(self.output, "Keeping {}", self.service.source())
            }
        }
    }
}

/// Write `label`, then read one trimmed line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
) -> io::Result<Option<String>> {
    write!(output, "{}", label)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn report_load_error<W: Write>(output: &mut W, error: &LoadError) -> io::Result<()> {
    warn!("Load failed: {}", error);
    writeln!(output, "Could not load image: {}", error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{BackendSettings, ImageHandle, RasterBackend};
    use crate::test_helpers::write_png;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_mock(script: &str) -> (Vec<RecordedOp>, String) {
        let mut out = Vec::new();
        let mut session = Session::start(
            MockBackend::with_dimensions(1920, 1080),
            ResizeBounds::default(),
            Some("photo.png"),
            Cursor::new(script.as_bytes()),
            &mut out,
        )
        .unwrap()
        .unwrap();
        session.run().unwrap();
        let ops = session.service().backend().get_operations();
        drop(session);
        (ops, String::from_utf8(out).unwrap())
    }

    // =========================================================================
    // Startup
    // =========================================================================

    #[test]
    fn start_retries_until_source_loads() {
        let tmp = TempDir::new().unwrap();
        let good = write_png(tmp.path(), "good.png", 20, 10);
        let script = format!("{}\n\n{}\n", tmp.path().join("nope.png").display(), good.display());
        let mut out = Vec::new();
        let session = Session::start(
            RasterBackend::default(),
            ResizeBounds::default(),
            None,
            Cursor::new(script.into_bytes()),
            &mut out,
        )
        .unwrap()
        .unwrap();
        assert_eq!(session.service().handle().width(), 20);
        drop(session);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Could not load image").count(), 1);
        assert!(text.contains("Size: 20x10"));
    }

    #[test]
    fn start_gives_up_at_end_of_input() {
        let mut out = Vec::new();
        let session = Session::start(
            MockBackend::failing(),
            ResizeBounds::default(),
            Some("missing.png"),
            Cursor::new(&b"also-missing.png\n"[..]),
            &mut out,
        )
        .unwrap();
        assert!(session.is_none());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Could not load image").count(), 2);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    #[test]
    fn quit_stops_reading() {
        let (ops, _) = run_mock("q\nshow\n");
        assert!(!ops.contains(&RecordedOp::Show));
    }

    #[test]
    fn end_of_input_ends_session() {
        let (ops, text) = run_mock("show\n");
        assert!(ops.contains(&RecordedOp::Show));
        assert!(text.starts_with("photo.png"));
    }

    #[test]
    fn unknown_action_reprints_menu() {
        let (_, text) = run_mock("dance\nq\n");
        assert!(text.contains("Unknown action 'dance'"));
        assert_eq!(text.matches("Actions").count(), 2);
    }

    #[test]
    fn resize_reprompts_on_invalid_size() {
        let (ops, text) = run_mock("r\n100\n600\nwide\n600\n300\n600\nq\n");
        let resizes: Vec<_> = ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::Resize { .. }))
            .collect();
        assert_eq!(resizes, vec![&RecordedOp::Resize { width: 300, height: 600 }]);
        assert!(text.contains("Resized to 300x600"));
        assert_eq!(text.matches("Width: ").count(), 3);
    }

    #[test]
    fn resize_accepts_closed_bounds() {
        let (ops, _) = run_mock("resize\n120\n1080\nq\n");
        assert!(ops.contains(&RecordedOp::Resize { width: 120, height: 1080 }));
    }

    #[test]
    fn filter_reports_defaults() {
        let (ops, text) = run_mock("f\nblur\n\nq\n");
        assert!(ops.contains(&RecordedOp::Filter(FilterKind::Blur)));
        assert!(text.contains("Filters (raster backend)"));
        assert!(text.contains("strength = 2 (default)"));
    }

    #[test]
    fn filter_with_explicit_parameter() {
        let (_, text) = run_mock("f\nblur\nstrength=4\nq\n");
        assert!(text.contains("    strength = 4\n"));
    }

    #[test]
    fn filter_rejects_unknown_kind_and_parameter() {
        let (ops, text) = run_mock("f\nemboss\nf\nblur\nradius=3\nf\nblur\nstrength\nq\n");
        // Only the second attempt reaches the backend
        let attempts = ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::Filter(_)))
            .count();
        assert_eq!(attempts, 1);
        assert!(text.contains("unknown filter 'emboss'"));
        assert!(text.contains("no parameter 'radius'"));
        assert!(!text.contains("Applied"));
    }

    #[test]
    fn unregistered_filter_is_reported() {
        let (_, text) = run_mock("f\nsmooth\n\nq\n");
        assert!(text.contains("raster backend has no 'smooth' filter"));
        assert!(!text.contains("Applied"));
    }

    #[test]
    fn save_reports_resolved_path() {
        let (ops, text) = run_mock("w\nout/photo\nq\n");
        assert!(ops.contains(&RecordedOp::Save("out/photo".into())));
        assert!(text.contains("Saved → out/photo.png"));
    }

    #[test]
    fn info_prints_current_image() {
        let (_, text) = run_mock("i\nq\n");
        assert_eq!(text.matches("Size: 1920x1080").count(), 2);
    }

    // =========================================================================
    // Raster backend end to end
    // =========================================================================

    #[test]
    fn failed_save_falls_back_to_auto_saved() {
        let tmp = TempDir::new().unwrap();
        let source = write_png(tmp.path(), "in.png", 16, 16);
        let saved = tmp.path().join("saved");
        let backend = RasterBackend::new(BackendSettings {
            output_dir: saved.clone(),
            ..BackendSettings::default()
        });
        let mut out = Vec::new();
        let mut session = Session::start(
            backend,
            ResizeBounds::default(),
            source.to_str(),
            Cursor::new(&b"w\n..\nq\n"[..]),
            &mut out,
        )
        .unwrap()
        .unwrap();
        session.run().unwrap();
        drop(session);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Save failed"));
        assert!(saved.join("auto_saved.png").is_file());
    }

    #[test]
    fn reload_failure_keeps_image() {
        let tmp = TempDir::new().unwrap();
        let first = write_png(tmp.path(), "first.png", 30, 20);
        let second = write_png(tmp.path(), "second.png", 12, 12);
        let script = format!(
            "l\n{}\nl\n{}\nq\n",
            tmp.path().join("gone.png").display(),
            second.display()
        );
        let mut out = Vec::new();
        let mut session = Session::start(
            RasterBackend::default(),
            ResizeBounds::default(),
            first.to_str(),
            Cursor::new(script.into_bytes()),
            &mut out,
        )
        .unwrap()
        .unwrap();
        session.run().unwrap();
        assert_eq!(session.service().handle().width(), 12);
        drop(session);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("Keeping {}", first.display())));
    }
}
