#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Level;

use pmprom_core::{ErrorCode, LabelKey};
use pmprom_exporter::ingest::RunnerState;

mod common;
use common::{capture, frame, CapturedEvents, RecordingPublisher};

fn key(app: &str, pid: &str) -> LabelKey {
    LabelKey::from([app, pid])
}

#[tokio::test]
async fn spec_scenario_single_line() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let input = "header\napp1,100,a,b,c,d,e,f,2,1.5,16.0,16.2,1.0,2.0,3.0\n";
    let report = runner
        .run(input.as_bytes(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_ok, 1);
    assert_eq!(report.lines_failed, 0);
    assert!(!report.cancelled);
    assert_eq!(report.final_state, RunnerState::Stopped);
    assert_eq!(runner.state(), RunnerState::Stopped);

    let k = key("app1", "100");
    assert_eq!(metrics.frames.get(&k), Some(1.0));
    assert_eq!(metrics.dropped.get(&k), Some(2.0));
    assert_eq!(metrics.time_in_seconds.get(&k), Some(1.5));
    let snap = metrics.present_between.as_histogram().unwrap().get(&k).unwrap();
    assert_eq!(snap.count, 1);
    assert!(metrics.is_draining());
}

#[tokio::test]
async fn first_line_is_never_data() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    // A numerically valid first line is still a header.
    let lines = [
        frame("hdr", "1", 0.0, 1.0, [1.0; 5]),
        frame("app1", "100", 0.0, 1.0, [1.0; 5]),
    ];
    let input = lines.join("\n");
    let report = runner
        .run(input.as_bytes(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_ok, 1);
    assert_eq!(metrics.frames.get(&key("hdr", "1")), None);
    assert_eq!(metrics.frames.get(&key("app1", "100")), Some(1.0));
}

#[tokio::test]
async fn each_malformed_line_logs_one_warning() {
    let captured = CapturedEvents::default();
    let _guard = captured.install();

    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let input = capture(&[
        frame("app1", "100", 1.0, 0.5, [1.0; 5]),
        "app2,200,0x1,DXGI,0,0,0,Composed: Flip,1,0.6,1.0,1.0,1.0,1.0,oops".to_string(),
        "too,short".to_string(),
        String::new(),
        frame("app1", "100", 2.0, 0.8, [1.0; 5]),
    ]);

    let report = runner
        .run(input.as_bytes(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.lines_failed, 3);

    let warnings: Vec<_> = captured
        .events()
        .into_iter()
        .filter(|e| e.level == Level::WARN && e.field("message") == Some("couldn't parse line"))
        .collect();
    assert_eq!(warnings.len(), 3, "{warnings:?}");
    for w in &warnings {
        assert!(w.field("line").is_some(), "{w:?}");
        assert!(w.field("error").is_some_and(|e| !e.is_empty()), "{w:?}");
    }
    assert!(warnings[0].field("line").unwrap().ends_with("oops"));
    assert_eq!(warnings[1].field("line"), Some("too,short"));
    assert_eq!(warnings[2].field("line"), Some(""));
}

#[tokio::test]
async fn malformed_lines_are_skipped_without_partial_updates() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let input = capture(&[
        frame("app1", "100", 1.0, 0.5, [1.0; 5]),
        // bad MsUntilDisplayed on an unseen key: nothing may appear for it
        "app2,200,0x1,DXGI,0,0,0,Composed: Flip,1,0.6,1.0,1.0,1.0,1.0,oops".to_string(),
        // bad field on a seen key: its series must stay put
        "app1,100,0x1,DXGI,0,0,0,Composed: Flip,9,0.7,x,1.0,1.0,1.0,1.0".to_string(),
        "too,short".to_string(),
        String::new(),
        frame("app1", "100", 2.0, 0.8, [1.0; 5]),
    ]);

    let report = runner
        .run(input.as_bytes(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_ok, 2);
    assert_eq!(report.lines_failed, 4);
    assert_eq!(publisher.after_lines, 6);

    let k1 = key("app1", "100");
    assert_eq!(metrics.frames.get(&k1), Some(2.0));
    assert_eq!(metrics.dropped.get(&k1), Some(3.0));
    assert_eq!(metrics.time_in_seconds.get(&k1), Some(0.8));

    let k2 = key("app2", "200");
    assert_eq!(metrics.frames.get(&k2), None);
    assert!(metrics.timings().iter().all(|t| t.as_histogram().unwrap().get(&k2).is_none()));
}

#[tokio::test]
async fn crlf_and_invalid_utf8_lines() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let mut input: Vec<u8> = b"header\r\n".to_vec();
    input.extend_from_slice(frame("app1", "100", 0.0, 1.0, [1.0; 5]).as_bytes());
    input.extend_from_slice(b"\r\n");
    input.extend_from_slice(b"app\xff,1,0x1,DXGI,0,0,0,Composed: Flip,0,1,1,1,1,1,1\r\n");

    let report = runner
        .run(input.as_slice(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_ok, 1);
    assert_eq!(report.lines_failed, 1);
}

#[tokio::test]
async fn empty_input_starts_and_stops_publisher() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let report = runner
        .run(&b""[..], &mut publisher, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.lines_ok + report.lines_failed, 0);
    assert_eq!((publisher.started, publisher.after_lines, publisher.stopped), (1, 0, 1));
}

#[tokio::test]
async fn cancelled_before_start_reads_nothing() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let input = capture(&[frame("app1", "100", 0.0, 1.0, [1.0; 5])]);
    let report = runner.run(input.as_bytes(), &mut publisher, &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.lines_ok, 0);
    assert_eq!(metrics.frames.len(), 0);
    assert_eq!((publisher.started, publisher.stopped), (1, 1));
}

#[tokio::test]
async fn cancellation_mid_stream_leaves_a_valid_prefix() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);

    let cancel = CancellationToken::new();
    let mut publisher = RecordingPublisher {
        cancel_after: Some((3, cancel.clone())),
        ..Default::default()
    };

    let lines: Vec<String> = (1..=10)
        .map(|i| frame("app1", "100", i as f64, i as f64 * 0.1, [i as f64; 5]))
        .collect();
    let report = runner
        .run(capture(&lines).as_bytes(), &mut publisher, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.lines_ok, 3);
    assert_eq!(publisher.stopped, 1);

    let k = key("app1", "100");
    assert_eq!(metrics.frames.get(&k), Some(3.0));
    assert_eq!(metrics.dropped.get(&k), Some(1.0 + 2.0 + 3.0));
    assert_eq!(metrics.time_in_seconds.get(&k), Some(3.0 * 0.1));
    assert_eq!(metrics.render_time.as_histogram().unwrap().get(&k).unwrap().count, 3);
}

#[tokio::test]
async fn cancellation_aborts_a_blocked_read() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher::default();

    // Writer half stays open and silent: the read would block forever.
    let (mut tx, rx) = tokio::io::duplex(1024);
    tokio::io::AsyncWriteExt::write_all(&mut tx, b"header\n").await.unwrap();
    let input = tokio::io::BufReader::new(rx);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run(input, &mut publisher, &cancel),
    )
    .await
    .expect("blocked read was not cancelled")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(publisher.stopped, 1);
    drop(tx);
}

#[tokio::test]
async fn publisher_fault_is_fatal_but_still_stops() {
    let metrics = common::pull_metrics();
    let mut runner = common::runner(&metrics);
    let mut publisher = RecordingPublisher {
        fail_after_line: true,
        ..Default::default()
    };

    let input = capture(&[
        frame("app1", "100", 0.0, 1.0, [1.0; 5]),
        frame("app1", "100", 0.0, 2.0, [1.0; 5]),
    ]);
    let err = runner
        .run(input.as_bytes(), &mut publisher, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Publish);
    assert_eq!(publisher.after_lines, 1);
    assert_eq!(publisher.stopped, 1);
    assert_eq!(runner.state(), RunnerState::Stopped);
    // the line before the failed push was already recorded
    assert_eq!(metrics.frames.get(&key("app1", "100")), Some(1.0));
}
