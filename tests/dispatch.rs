mod common;

use serde_json::Value;

use shardlog::config::DispatchConfig;
use shardlog::corpus::Corpus;
use shardlog::dispatch::{self, DispatchMode, DispatchStatus};
use shardlog::report::json;

fn dispatch_config(mode: DispatchMode, endpoint: String) -> DispatchConfig {
    DispatchConfig {
        enabled: true,
        mode,
        endpoint,
        timeout_secs: 5,
    }
}

#[test]
fn webhook_posts_report_json() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(2, 2));
    let sink = common::HttpSink::start(200);

    let cfg = dispatch_config(DispatchMode::Webhook, sink.url());
    let status = dispatch::deliver_report(&report, &cfg);
    assert!(status.is_delivered(), "{status}");

    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0], json::to_json(&report).expect("json"));
    let doc: Value = serde_json::from_slice(&bodies[0]).expect("body json");
    assert_eq!(doc["all_tasks"].as_array().expect("all_tasks").len(), 2);
}

#[test]
fn webhook_rejection_is_a_failed_status() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(1, 1));
    let sink = common::HttpSink::start(500);

    let cfg = dispatch_config(DispatchMode::Webhook, sink.url());
    let status = dispatch::deliver_report(&report, &cfg);
    assert!(matches!(status, DispatchStatus::Failed(ref reason) if reason.contains("500")));
    // Single attempt, no retry.
    assert_eq!(sink.bodies().len(), 1);
}

#[test]
fn unreachable_sinks_do_not_touch_the_report() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(2, 2));
    let before = report.clone();
    let addr = common::closed_port();

    for cfg in [
        dispatch_config(DispatchMode::Webhook, format!("http://{addr}/reports")),
        dispatch_config(DispatchMode::Socket, format!("tcp://{addr}")),
    ] {
        let status = dispatch::deliver_report(&report, &cfg);
        assert!(matches!(status, DispatchStatus::Failed(_)), "{status}");
    }
    assert_eq!(report, before);
}

#[test]
fn socket_sends_one_json_line() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(3, 2));
    let (addr, sink) = common::socket_sink();

    let cfg = dispatch_config(DispatchMode::Socket, format!("tcp://{addr}"));
    let status = dispatch::deliver_report(&report, &cfg);
    assert!(status.is_delivered(), "{status}");

    let line = sink.join().expect("sink");
    assert!(line.ends_with('\n'));
    let doc: Value = serde_json::from_str(line.trim_end()).expect("frame json");
    assert_eq!(doc["all_tasks"][2]["tasks"]["keyword_count"]["count"], 1);
}

#[test]
fn disabled_dispatch_sends_nothing() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(1, 1));
    let mut cfg = dispatch_config(DispatchMode::Socket, "tcp://127.0.0.1:1".into());
    cfg.enabled = false;
    assert!(matches!(
        dispatch::deliver_report(&report, &cfg),
        DispatchStatus::Disabled
    ));
}

#[test]
fn malformed_endpoint_is_a_failed_status() {
    let report = common::run_threads(&Corpus::builtin(), &common::settings(1, 1));
    let cfg = dispatch_config(DispatchMode::Webhook, "not a url".into());
    assert!(matches!(
        dispatch::deliver_report(&report, &cfg),
        DispatchStatus::Failed(_)
    ));
}
