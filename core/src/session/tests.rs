use std::time::{Duration, Instant};

use super::*;
use crate::navigation::{dispatch, Key, Modifiers, Phase};
use crate::prelude::{AcceptAll, BatchPayload, RejectAll};
use crate::records::FieldMap;
use crate::source::MemorySource;

const DAY1: &str = "20191001";
const DAY3: &str = "20191003";

fn row(pairs: &[(&str, &str)]) -> FieldMap {
    pairs.iter().copied().collect()
}

fn scan_row(day: &str, hhmmss: &str) -> FieldMap {
    let filename = format!("KDOX{}_{}_V06", day, hhmmss);
    let local_time = format!("{}{}", day, hhmmss);
    row(&[("filename", filename.as_str()), ("local_time", local_time.as_str())])
}

fn box_row(track: &str, day: &str, hhmmss: &str, score: &str) -> FieldMap {
    let filename = format!("KDOX{}_{}_V06", day, hhmmss);
    let local_time = format!("{}{}", day, hhmmss);
    row(&[
        ("track_id", track),
        ("filename", filename.as_str()),
        ("local_time", local_time.as_str()),
        ("x", "10"),
        ("y", "20"),
        ("r", "5"),
        ("det_score", score),
    ])
}

fn fixture() -> MemorySource {
    let mut source = MemorySource::new();
    let config = DatasetConfig::from_json(
        r#"{
            "boxes": "{dataset}/boxes_{batch}.csv",
            "scans": "{dataset}/scans_{batch}.csv",
            "filtering": {"detections_min": 2},
            "urls": ["img/dz/{filename}.png", "img/vr/{filename}.png"]
        }"#,
    )
    .unwrap();
    source.insert_dataset("roosts", config);
    source.insert_batch(
        "roosts",
        "KDOX2019",
        BatchPayload {
            scan_rows: vec![
                scan_row(DAY1, "100000"),
                scan_row(DAY1, "101000"),
                scan_row(DAY1, "102000"),
                scan_row("20191002", "100000"),
                scan_row("20191002", "101000"),
                scan_row(DAY3, "100000"),
                scan_row(DAY3, "101000"),
            ],
            detection_rows: vec![
                box_row("1", DAY1, "101000", "0.8"),
                box_row("2", DAY1, "101000", "0.01"),
                box_row("1", DAY1, "102000", "0.6"),
                box_row("3", DAY3, "100000", "0.9"),
                box_row("3", DAY3, "101000", "0.7"),
            ],
        },
    );
    source.insert_batch(
        "roosts",
        "KDOX2020",
        BatchPayload {
            scan_rows: vec![scan_row("20200901", "100000")],
            detection_rows: vec![box_row("9", "20200901", "100000", "0.5")],
        },
    );
    source
}

fn open() -> (ReviewSession, MemorySource) {
    let mut source = fixture();
    let mut session = ReviewSession::new();
    let transition = session
        .select_dataset("roosts", &mut source, &mut AcceptAll)
        .unwrap();
    assert_eq!(transition, Transition::Applied);
    (session, source)
}

#[test]
fn selecting_a_dataset_loads_its_first_batch() {
    let (session, _) = open();
    assert_eq!(session.navigation().phase(), Phase::DaySelected);
    assert_eq!(session.batches(), &["KDOX2019".to_string(), "KDOX2020".to_string()]);
    assert_eq!(session.navigation().batch(), Some("KDOX2019"));
    assert_eq!(session.policy().detections_min, 2);

    let days = session.navigation().days();
    assert_eq!(days.len(), 3);
    assert_eq!(days.flags(), &[true, false, true]);
    assert_eq!(session.navigation().frames().flags(), &[false, true, true]);
    assert_eq!(session.tracks().unwrap().len(), 3);
    assert!(session.active_tracks().is_empty());
    assert!(!session.is_dirty());
}

#[test]
fn labels_follow_the_dataset_policy() {
    let (session, _) = open();
    let label = |id: &str| session.track(id).unwrap().label;
    assert_eq!(label("KDOX20191001-1"), Some(Label::SwallowRoost));
    assert_eq!(label("KDOX20191001-2"), Some(Label::NonRoost));
    assert_eq!(label("KDOX20191003-3"), Some(Label::SwallowRoost));
}

#[test]
fn flagged_day_moves_skip_empty_days_and_reset_the_frame() {
    let (mut session, _) = open();
    session.step_frame(Step::Next);
    assert_eq!(session.position().frame, 1);

    assert!(session.execute(Command::NextFlaggedDay).unwrap());
    assert_eq!(session.navigation().current_day(), Some(DAY3));
    assert_eq!(session.position().frame, 0);
    assert_eq!(session.navigation().frames().len(), 2);
    assert_eq!(session.active_tracks(), &["KDOX20191003-3".to_string()]);

    assert!(!session.execute(Command::NextFlaggedDay).unwrap());
    assert!(!session.execute(Command::NextDay).unwrap());
    assert!(session.execute(Command::PrevDay).unwrap());
    assert_eq!(session.navigation().current_day(), Some("20191002"));
    assert!(session.active_tracks().is_empty());
}

#[test]
fn frame_moves_are_bounded_and_flag_aware() {
    let (mut session, _) = open();
    assert!(!session.step_frame(Step::Prev));
    assert!(session.step_frame(Step::NextFlagged));
    assert_eq!(session.position().frame, 1);
    assert_eq!(
        session.active_tracks(),
        &["KDOX20191001-1".to_string(), "KDOX20191001-2".to_string()]
    );
    assert!(session.step_frame(Step::NextFlagged));
    assert!(!session.step_frame(Step::NextFlagged));
    assert!(!session.step_frame(Step::Next));
    assert_eq!(session.position().frame, 2);
    assert!(matches!(
        session.select_frame(7),
        Err(ReviewError::IndexOutOfRange { what: "frames", .. })
    ));
    assert_eq!(session.position().frame, 2);
}

#[test]
fn track_cycling_wraps_to_nothing_selected() {
    let (mut session, _) = open();
    session.select_frame(1).unwrap();

    assert_eq!(session.next_track().as_deref(), Some("KDOX20191001-1"));
    assert_eq!(session.next_track().as_deref(), Some("KDOX20191001-2"));
    assert_eq!(session.next_track(), None);
    assert!(session.selected_track().is_none());

    assert_eq!(session.prev_track().as_deref(), Some("KDOX20191001-2"));
    assert_eq!(session.prev_track().as_deref(), Some("KDOX20191001-1"));
    assert_eq!(session.prev_track(), None);
    assert!(session.selected_track().is_none());
}

#[test]
fn digit_keys_label_only_the_selected_track() {
    let (mut session, _) = open();
    session.select_frame(1).unwrap();
    let plain = Modifiers::default();

    assert_eq!(dispatch(Key::Digit(3), plain, session.selected_track().is_some()), None);

    session.execute(Command::NextTrack).unwrap();
    let command = dispatch(Key::Digit(3), plain, session.selected_track().is_some()).unwrap();
    assert!(session.execute(command).unwrap());

    let track = session.track("KDOX20191001-1").unwrap();
    assert_eq!(track.label, Some(Label::WeatherRoost));
    assert_eq!(track.original_label, Some(Label::SwallowRoost));
    assert!(track.user_labeled);
    assert!(session.is_dirty());
    assert_eq!(session.metrics().labels_assigned, 1);
}

#[test]
fn changing_frames_drops_the_selection() {
    let (mut session, _) = open();
    session.select_frame(1).unwrap();
    session.select_track("KDOX20191001-2").unwrap();
    session.step_frame(Step::Next);
    assert!(session.selected_track().is_none());
}

#[test]
fn hover_leave_unselects_after_delay_unless_reselected() {
    let (mut session, _) = open();
    let start = Instant::now();
    session.select_track("KDOX20191001-1").unwrap();
    session.schedule_unselect(start).unwrap();
    assert_eq!(
        session.select_track("KDOX20191001-1").unwrap(),
        SelectionChange::Unchanged
    );
    assert_eq!(session.poll_unselect(start + Duration::from_secs(1)), None);

    session.schedule_unselect(start).unwrap();
    assert_eq!(
        session.poll_unselect(start + Duration::from_secs(1)).as_deref(),
        Some("KDOX20191001-1")
    );
    assert!(matches!(
        session.select_track("nope"),
        Err(ReviewError::UnknownTrack(_))
    ));
}

#[test]
fn presenting_a_frame_marks_tracks_viewed() {
    let (mut session, _) = open();
    session.select_frame(1).unwrap();
    session.present_frame(&["dz".to_string(), "vr".to_string()]);
    let track = session.track("KDOX20191001-2").unwrap();
    assert!(track.viewed);
    assert_eq!(track.surfaces().collect::<Vec<_>>(), vec!["dz", "vr"]);
    assert!(!session.track("KDOX20191003-3").unwrap().viewed);

    session.step_frame(Step::Next);
    let track = session.track("KDOX20191001-2").unwrap();
    assert!(track.viewed);
    assert!(!track.is_visible());
}

#[test]
fn policy_changes_relabel_only_unlabeled_tracks() {
    let (mut session, _) = open();
    session.label_track("KDOX20191003-3", Label::BadTrack).unwrap();
    let relabeled = session.set_filter("detections_min", "3").unwrap();
    assert_eq!(relabeled, 2);
    let track = |id: &str| session.track(id).unwrap().clone();
    assert_eq!(track("KDOX20191001-1").label, Some(Label::NonRoost));
    assert_eq!(track("KDOX20191001-1").original_label, Some(Label::NonRoost));
    assert_eq!(track("KDOX20191003-3").label, Some(Label::BadTrack));
    assert_eq!(track("KDOX20191003-3").original_label, Some(Label::SwallowRoost));
    assert!(session.set_filter("score_min", "inf").is_err());
    assert_eq!(session.policy().detections_min, 3);
}

#[test]
fn rejected_guard_leaves_state_untouched() {
    let (mut session, mut source) = open();
    session.select_day(2).unwrap();
    session.label_track("KDOX20191003-3", Label::Duplicate).unwrap();
    let before = session.position();

    let transition = session
        .select_batch("KDOX2020", &mut source, &mut RejectAll)
        .unwrap();
    assert_eq!(transition, Transition::Cancelled);
    let transition = session
        .select_dataset("roosts", &mut source, &mut RejectAll)
        .unwrap();
    assert_eq!(transition, Transition::Cancelled);

    assert_eq!(session.position(), before);
    assert!(session.is_dirty());
    assert_eq!(
        session.track("KDOX20191003-3").unwrap().label,
        Some(Label::Duplicate)
    );
}

#[test]
fn accepted_guard_switches_batch_and_clears_edits() {
    let (mut session, mut source) = open();
    session.label_track("KDOX20191003-3", Label::Duplicate).unwrap();
    let mut prompts = Vec::new();
    let mut guard = |prompt: &str| {
        prompts.push(prompt.to_string());
        true
    };
    let transition = session
        .select_batch("KDOX2020", &mut source, &mut guard)
        .unwrap();
    assert_eq!(transition, Transition::Applied);
    assert_eq!(prompts.len(), 1);
    assert_eq!(session.navigation().batch(), Some("KDOX2020"));
    assert_eq!(session.position().day, 0);
    assert!(!session.is_dirty());
    assert_eq!(session.tracks().unwrap().len(), 1);
}

#[test]
fn resume_restores_saved_position() {
    let mut source = fixture();
    let mut session = ReviewSession::new();
    let position = NavPosition {
        dataset: "roosts".into(),
        batch: "KDOX2019".into(),
        day: 2,
        frame: 1,
    };
    session.resume(&position, &mut source, &mut AcceptAll).unwrap();
    assert_eq!(session.position(), position);
    assert_eq!(session.active_tracks(), &["KDOX20191003-3".to_string()]);

    let out_of_range = NavPosition {
        day: 40,
        frame: 40,
        ..position
    };
    session
        .resume(&out_of_range, &mut source, &mut AcceptAll)
        .unwrap();
    assert_eq!(session.position().day, 0);
    assert_eq!(session.position().frame, 0);
}

#[test]
fn export_carries_day_notes_and_clears_dirty_flag() {
    let (mut session, _) = open();
    session.set_day_notes("low clouds").unwrap();
    session
        .set_track_notes("KDOX20191001-1", "clear ring")
        .unwrap();
    assert!(session.is_dirty());

    let mut buffer = Vec::new();
    let rows = session.write_export(&mut buffer).unwrap();
    assert_eq!(rows, 5);
    assert!(!session.is_dirty());
    assert_eq!(session.export_filename().unwrap(), "roost_labels_KDOX2019.csv");

    let table = session.export().unwrap();
    assert_eq!(table.value(0, "day_notes"), Some("low clouds"));
    assert_eq!(table.value(0, "notes"), Some("clear ring"));
    assert_eq!(table.value(3, "day_notes"), Some(""));
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.starts_with(
        "track_id,filename,local_time,x,y,r,det_score,station,date,time,local_date,length,"
    ));
}

#[test]
fn snapshot_describes_the_current_frame() {
    let (mut session, _) = open();
    session.select_frame(1).unwrap();
    session.select_track("KDOX20191001-1").unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.days.flags, vec![true, false, true]);
    assert_eq!(snapshot.frames.items[1], "10:10:00");
    assert_eq!(snapshot.active_tracks.len(), 2);
    assert!(snapshot.active_tracks[0].selected);
    assert!(snapshot.active_tracks[1].filtered);
    assert_eq!(snapshot.active_tracks[0].boxes.len(), 1);
    assert_eq!(
        snapshot.frame_urls,
        vec![
            "img/dz/KDOX20191001_101000_V06.png".to_string(),
            "img/vr/KDOX20191001_101000_V06.png".to_string()
        ]
    );
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"selected_track\":\"KDOX20191001-1\""));
}

#[test]
fn operations_without_a_batch_are_reported() {
    let mut session = ReviewSession::new();
    assert!(matches!(session.export(), Err(ReviewError::NoBatch)));
    assert!(matches!(
        session.set_day_notes("x"),
        Err(ReviewError::NoBatch)
    ));
    assert!(!session.step_day(Step::Next));
    assert_eq!(session.next_track(), None);
    let mut source = fixture();
    assert!(matches!(
        session.select_batch("KDOX2019", &mut source, &mut AcceptAll),
        Err(ReviewError::NoDataset)
    ));
}
