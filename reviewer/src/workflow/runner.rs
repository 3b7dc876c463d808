use crate::gui_bridge::bridge::SnapshotBridge;
use crate::workflow::command::ReviewCommand;
use crate::workflow::config::ReviewConfig;
use anyhow::{anyhow, Context};
use log::warn;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use roostcore::navigation::{dispatch, NavPosition, Selection};
use roostcore::prelude::{ChangeGuard, DataSource, Transition};
use roostcore::records::format_day;
use roostcore::tracks::SurfaceId;
use roostcore::ReviewSession;

/// Surface name under which the terminal "draws" the active tracks.
pub const TERMINAL_SURFACE: &str = "terminal";

/// Asks on the console before discarding unsaved labels.
pub struct ConsoleGuard {
    auto_accept: bool,
}

impl ConsoleGuard {
    pub fn new(auto_accept: bool) -> Self {
        Self { auto_accept }
    }
}

impl ChangeGuard for ConsoleGuard {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.auto_accept {
            return true;
        }
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(err) => {
                warn!("could not read confirmation: {}", err);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Drives a review session from command lines.
pub struct Runner {
    session: ReviewSession,
    source: Box<dyn DataSource>,
    guard: Box<dyn ChangeGuard>,
    config: ReviewConfig,
    surfaces: Vec<SurfaceId>,
    bridge: Option<SnapshotBridge>,
}

impl Runner {
    pub fn new(
        config: ReviewConfig,
        source: Box<dyn DataSource>,
        guard: Box<dyn ChangeGuard>,
    ) -> Self {
        let selection = Selection::with_delay(config.unselect_delay());
        Self {
            session: ReviewSession::with_selection(selection),
            source,
            guard,
            config,
            surfaces: vec![TERMINAL_SURFACE.to_string()],
            bridge: None,
        }
    }

    pub fn with_bridge(mut self, bridge: SnapshotBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    /// Opens the saved position and reports the first frame.
    pub fn open(&mut self, position: &NavPosition) -> anyhow::Result<String> {
        if !self.config.datasets.is_empty() && !self.config.datasets.contains(&position.dataset) {
            warn!("dataset {} is not listed in the review config", position.dataset);
        }
        self.session
            .resume(position, self.source.as_mut(), self.guard.as_mut())
            .with_context(|| format!("opening dataset {}", position.dataset))?;
        self.after_command();
        Ok(self.describe_frame())
    }

    /// Runs one command and returns the text to show the reviewer.
    pub fn execute(&mut self, command: ReviewCommand) -> anyhow::Result<(Flow, String)> {
        let expired = self.session.poll_unselect(Instant::now());
        let report = match command {
            ReviewCommand::Key(key, modifiers) => {
                let selected = self.session.selected_track().is_some();
                match dispatch(key, modifiers, selected) {
                    Some(command) => {
                        self.session.execute(command)?;
                        self.describe_frame()
                    }
                    None => "key ignored".to_string(),
                }
            }
            ReviewCommand::Dataset(name) => {
                let transition =
                    self.session
                        .select_dataset(&name, self.source.as_mut(), self.guard.as_mut())?;
                self.describe_transition(transition)
            }
            ReviewCommand::Batch(name) => {
                let transition =
                    self.session
                        .select_batch(&name, self.source.as_mut(), self.guard.as_mut())?;
                self.describe_transition(transition)
            }
            ReviewCommand::Day(index) => {
                self.session.select_day(index)?;
                self.describe_frame()
            }
            ReviewCommand::Frame(index) => {
                self.session.select_frame(index)?;
                self.describe_frame()
            }
            ReviewCommand::Label { track, label } => {
                self.session.label_track(&track, label)?;
                format!("{} -> {}", track, label)
            }
            ReviewCommand::Notes(text) => {
                let track = self
                    .session
                    .selected_track()
                    .cloned()
                    .ok_or_else(|| anyhow!("no track selected"))?;
                self.session.set_track_notes(&track, &text)?;
                format!("notes saved for {}", track)
            }
            ReviewCommand::DayNotes(text) => {
                self.session.set_day_notes(&text)?;
                "day notes saved".to_string()
            }
            ReviewCommand::Filter { key, value } => {
                let relabeled = self.session.set_filter(&key, &value)?;
                format!("{} = {} ({} tracks relabeled)", key, value, relabeled)
            }
            ReviewCommand::Hover(track) => {
                self.session.select_track(&track)?;
                format!("selected {}", track)
            }
            ReviewCommand::Leave => match self.session.schedule_unselect(Instant::now()) {
                Some(_) => "unselect scheduled".to_string(),
                None => "nothing selected".to_string(),
            },
            ReviewCommand::Wait(duration) => {
                thread::sleep(duration);
                match self.session.poll_unselect(Instant::now()) {
                    Some(track) => format!("unselected {}", track),
                    None => "waited".to_string(),
                }
            }
            ReviewCommand::Export(path) => self.export(path)?,
            ReviewCommand::Status => self.describe_status(),
            ReviewCommand::Quit => {
                if self.session.is_dirty() {
                    warn!("quitting with labels that were not exported");
                }
                return Ok((Flow::Quit, "bye".to_string()));
            }
        };
        self.after_command();
        let report = match expired {
            Some(track) => format!("unselected {}\n{}", track, report),
            None => report,
        };
        Ok((Flow::Continue, report))
    }

    /// Reads command lines until `quit` or end of input. Bad lines are
    /// reported and skipped.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line.context("reading command input")?;
            let command = match ReviewCommand::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    writeln!(out, "error: {:#}", err)?;
                    continue;
                }
            };
            match self.execute(command) {
                Ok((flow, report)) => {
                    writeln!(out, "{}", report)?;
                    if flow == Flow::Quit {
                        break;
                    }
                }
                Err(err) => writeln!(out, "error: {:#}", err)?,
            }
        }
        Ok(())
    }

    /// Writes the export CSV. Without a path the file lands in the export
    /// directory under the batch's default name.
    pub fn export(&mut self, path: Option<PathBuf>) -> anyhow::Result<String> {
        let path = match path {
            Some(path) => path,
            None => self.config.export_path(&self.session.export_filename()?),
        };
        let rows = write_export_file(&mut self.session, &path)?;
        Ok(format!("exported {} rows to {}", rows, path.display()))
    }

    fn after_command(&mut self) {
        self.session.present_frame(&self.surfaces);
        if let Some(bridge) = &self.bridge {
            bridge.publish(self.session.snapshot());
        }
    }

    fn describe_transition(&self, transition: Transition) -> String {
        match transition {
            Transition::Applied => self.describe_frame(),
            Transition::Cancelled => "change cancelled".to_string(),
        }
    }

    /// Day, frame and the tracks drawn in the current frame.
    pub fn describe_frame(&self) -> String {
        let nav = self.session.navigation();
        let (Some(day), Some(frame)) = (nav.current_day(), nav.current_frame()) else {
            return format!("{:?}", nav.phase());
        };
        let position = nav.position();
        let mut text = format!(
            "{} [{}/{}] {} [{}/{}]",
            format_day(day),
            position.day + 1,
            nav.days().len(),
            frame.label(),
            position.frame + 1,
            nav.frames().len()
        );
        let selected = self.session.selected_track();
        for id in self.session.active_tracks() {
            let Some(track) = self.session.track(id) else {
                continue;
            };
            let marker = if selected == Some(id) { '*' } else { ' ' };
            let label = track.label.map(|label| label.as_str()).unwrap_or("-");
            text.push_str(&format!("\n {} {} {}", marker, id, label));
            if track.is_filtered() {
                text.push_str(" (filtered)");
            }
        }
        text
    }

    fn describe_status(&self) -> String {
        let nav = self.session.navigation();
        let position = nav.position();
        let metrics = self.session.metrics();
        let policy = self.session.policy();
        format!(
            "dataset={} batch={} day={} frame={} flagged_days={} unsaved={} \
             labels_assigned={} rows_skipped={} detections_min={} \
             high_quality_detections_min={} score_min={} avg_score_min={}",
            position.dataset,
            position.batch,
            position.day,
            position.frame,
            nav.days().flagged_count(),
            self.session.is_dirty(),
            metrics.labels_assigned,
            metrics.rows_skipped,
            policy.detections_min,
            policy.high_quality_detections_min,
            policy.score_min,
            policy.avg_score_min
        )
    }
}

fn write_export_file(session: &mut ReviewSession, path: &Path) -> anyhow::Result<usize> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("creating export file {}", path.display()))?;
    let rows = session
        .write_export(BufWriter::new(file))
        .with_context(|| format!("writing export file {}", path.display()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_source, GeneratorConfig, SYNTHETIC_DATASET};
    use roostcore::prelude::{BatchPayload, RejectAll};
    use roostcore::records::FieldMap;
    use roostcore::source::MemorySource;
    use roostcore::tracks::Label;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn row(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().copied().collect()
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert_dataset("roosts", Default::default());
        source.insert_batch(
            "roosts",
            "KDOX2019",
            BatchPayload {
                scan_rows: vec![
                    row(&[("filename", "KDOX20191001_100000_V06"), ("local_time", "20191001050000")]),
                    row(&[("filename", "KDOX20191001_101000_V06"), ("local_time", "20191001051000")]),
                ],
                detection_rows: vec![
                    row(&[
                        ("track_id", "1"),
                        ("filename", "KDOX20191001_100000_V06"),
                        ("local_time", "20191001050000"),
                        ("det_score", "0.9"),
                    ]),
                    row(&[
                        ("track_id", "1"),
                        ("filename", "KDOX20191001_101000_V06"),
                        ("local_time", "20191001051000"),
                        ("det_score", "0.8"),
                    ]),
                ],
            },
        );
        source.insert_batch("roosts", "KDOX2020", BatchPayload::default());
        source
    }

    fn runner(export_dir: &Path, guard: Box<dyn ChangeGuard>) -> Runner {
        let config = ReviewConfig {
            export_dir: export_dir.to_path_buf(),
            unselect_delay_ms: 0,
            ..ReviewConfig::default()
        };
        let mut runner = Runner::new(config, Box::new(source()), guard);
        let position = NavPosition {
            dataset: "roosts".into(),
            ..NavPosition::default()
        };
        runner.open(&position).unwrap();
        runner
    }

    fn run(runner: &mut Runner, script: &str) -> String {
        let mut out = Vec::new();
        runner.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn script_labels_and_exports() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(dir.path(), Box::new(ConsoleGuard::new(true)));
        let output = run(&mut runner, "tab\n5\nnotes two boxes\nexport\nquit\nright\n");
        assert!(output.contains("* KDOX20191001-1 swallow-roost"));
        assert!(output.contains("exported 2 rows"));
        assert!(output.ends_with("bye\n"));
        assert_eq!(runner.session().position().frame, 0);

        let track = runner.session().track("KDOX20191001-1").unwrap();
        assert_eq!(track.label, Some(Label::ApRoost));
        assert_eq!(track.notes, "two boxes");
        assert!(track.viewed);
        assert!(!runner.session().is_dirty());

        let exported = fs::read_to_string(dir.path().join("roost_labels_KDOX2019.csv")).unwrap();
        assert!(exported.lines().nth(1).unwrap().contains("AP-roost,swallow-roost,two boxes"));
    }

    #[test]
    fn rejected_guard_keeps_the_batch() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(dir.path(), Box::new(RejectAll));
        let output = run(&mut runner, "label KDOX20191001-1 bad-track\nbatch KDOX2020\n");
        assert!(output.contains("change cancelled"));
        assert_eq!(runner.session().position().batch, "KDOX2019");

        let (_, report) = runner.execute(ReviewCommand::Export(None)).unwrap();
        assert!(report.starts_with("exported 2 rows"));
        let output = run(&mut runner, "batch KDOX2020\nstatus\n");
        assert!(output.contains("batch=KDOX2020"));
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(dir.path(), Box::new(ConsoleGuard::new(true)));
        let output = run(&mut runner, "frame 9\nfly\n3\nright\n");
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("error: index 9 out of range"));
        assert!(lines[1].starts_with("error: unknown command"));
        assert_eq!(lines[2], "key ignored");
        assert!(lines[3].starts_with("2019-10-01 [1/1] 10:10:00 [2/2]"));
    }

    #[test]
    fn hover_and_leave_unselect_after_the_delay() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(dir.path(), Box::new(ConsoleGuard::new(true)));
        let output = run(&mut runner, "hover KDOX20191001-1\nleave\nwait 1\n");
        assert!(output.contains("unselected KDOX20191001-1"));
        assert!(runner.session().selected_track().is_none());
    }

    #[test]
    fn synthetic_batch_publishes_snapshots() {
        let dir = TempDir::new().unwrap();
        let config = ReviewConfig {
            export_dir: dir.path().to_path_buf(),
            ..ReviewConfig::default()
        };
        let source = build_source(&GeneratorConfig::default()).unwrap();
        let bridge = SnapshotBridge::new();
        let mut runner = Runner::new(config, Box::new(source), Box::new(ConsoleGuard::new(true)))
            .with_bridge(bridge.clone());
        let position = NavPosition {
            dataset: SYNTHETIC_DATASET.into(),
            ..NavPosition::default()
        };
        runner.open(&position).unwrap();
        runner.execute(ReviewCommand::Day(1)).unwrap();

        let model = bridge.model();
        assert_eq!(model.revision, 2);
        assert_eq!(model.snapshot.unwrap().position.day, 1);
    }
}
