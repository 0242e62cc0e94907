//! Criterion benchmarks for the AMI ingestion hot path.
//!
//! Every byte the PBX sends goes through framing, classification and field
//! parsing before it reaches the state, so these are the functions that bound
//! event throughput on a busy system.
//!
//! Run with:
//! ```bash
//! cargo bench --package ami-core --bench fields_bench
//! ```

use ami_core::{apply_event, classify, parse_event, DerivedState, FrameAssembler};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Event fixtures ────────────────────────────────────────────────────────────

const PEER_STATUS: &str = "Event: PeerStatus\r\nPrivilege: system,all\r\nChannelType: PJSIP\r\n\
Peer: PJSIP/101\r\nPeerStatus: Reachable\r\nAddress: 10.0.0.21:5060\r\n";

const DIAL_END: &str = "Event: DialEnd\r\nPrivilege: call,all\r\nChannel: PJSIP/100-00000001\r\n\
ChannelState: 6\r\nChannelStateDesc: Up\r\nCallerIDNum: 100\r\nCallerIDName: \r\n\
ConnectedLineNum: 200\r\nConnectedLineName: \r\nLanguage: en\r\nAccountCode: \r\n\
Context: internal\r\nExten: 200\r\nPriority: 1\r\nUniqueid: 1700000000.1\r\n\
Linkedid: 1700000000.1\r\nDestChannel: PJSIP/200-00000002\r\nDialStatus: ANSWER\r\n";

const HANGUP: &str = "Event: Hangup\r\nChannel: PJSIP/100-00000001\r\nCallerIDNum: 100\r\n\
ConnectedLineNum: 200\r\nLinkedid: 1700000000.1\r\nCause: 16\r\nCause-txt: Normal Clearing\r\n";

fn fixtures() -> Vec<(&'static str, &'static str)> {
    vec![
        ("peer_status", PEER_STATUS),
        ("dial_end", DIAL_END),
        ("hangup", HANGUP),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_parse_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_event");
    for (name, text) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| parse_event(black_box(text)))
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let stream: String = [PEER_STATUS, DIAL_END, HANGUP]
        .iter()
        .map(|text| format!("{text}\r\n"))
        .collect();

    c.bench_function("pipeline/frame_classify_parse_apply", |b| {
        b.iter(|| {
            let mut framer = FrameAssembler::new();
            let mut state = DerivedState::new();
            for line in black_box(&stream).split_inclusive('\n') {
                if let Some(msg) = framer.push_line(line) {
                    let classified = classify(&msg);
                    if classified.is_event() {
                        apply_event(&mut state, &parse_event(classified.text()));
                    }
                }
            }
            state
        })
    });
}

criterion_group!(benches, bench_parse_event, bench_full_pipeline);
criterion_main!(benches);
