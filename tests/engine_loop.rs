//! End-to-end engine behavior across task types
//!
//! Exercises the loop semantics (count bound, deadline bound, single-shot)
//! and the failure modes against the deterministic mock backend.

use std::error::Error as _;
use std::mem::discriminant;
use std::time::Duration;

use medir::engine::{
    run, run_with_registry, InputBatch, RunOptions, SliceSource, StrategyRegistry, MAX_TEXT_LEN,
};
use medir::mock_model::{DemoSource, MockModel};
use medir::model::ModelBackend;
use medir::{MedirError, TaskType};

fn demo_options(task: TaskType, iterations: usize) -> RunOptions {
    RunOptions::new(task)
        .with_iterations(iterations)
        .with_input_names(vec!["input".to_string()])
}

fn demo_source(task: TaskType) -> DemoSource {
    DemoSource::new(task, 1, vec!["input".to_string()])
}

#[test]
fn test_single_shot_and_looped_share_decoded_shape() {
    let model = MockModel::new();
    for task in TaskType::ALL {
        let mut source = demo_source(task);
        let single = run(&model, &mut source, &demo_options(task, 1)).unwrap();

        let mut source = demo_source(task);
        let looped = run(&model, &mut source, &demo_options(task, 2)).unwrap();

        assert_eq!(single.latencies.len(), 1, "task {task}");
        assert_eq!(looped.latencies.len(), 2, "task {task}");

        let single_output = single.output.expect("single-shot output retained");
        let looped_output = looped.output.expect("looped output retained");
        assert_eq!(
            discriminant(&single_output),
            discriminant(&looped_output),
            "decoded result shape must not depend on the iteration count (task {task})"
        );
    }
}

#[test]
fn test_iteration_count_bounds_loop_when_duration_is_zero() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::Classification);
    let outcome = run(
        &model,
        &mut source,
        &demo_options(TaskType::Classification, 5),
    )
    .unwrap();
    assert_eq!(outcome.latencies.len(), 5);
}

#[test]
fn test_deadline_stops_loop_between_iterations() {
    // 200ms per call against a 300ms budget: the first iteration ends under
    // budget, the second overruns it, the third is never started.
    let model = MockModel::new().with_latency(Duration::from_millis(200));
    let mut source = demo_source(TaskType::Classification);
    let options = demo_options(TaskType::Classification, 1000)
        .with_duration(Duration::from_millis(300));
    let outcome = run(&model, &mut source, &options).unwrap();
    assert_eq!(outcome.latencies.len(), 2);
}

#[test]
fn test_expired_deadline_still_yields_one_sample() {
    let model = MockModel::new().with_latency(Duration::from_millis(20));
    let mut source = demo_source(TaskType::Feedforward);
    let options = demo_options(TaskType::Feedforward, 0)
        .with_duration(Duration::from_nanos(1));
    let outcome = run(&model, &mut source, &options).unwrap();
    assert_eq!(outcome.latencies.len(), 1);
}

#[test]
fn test_zero_iterations_and_zero_duration_rejected() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::Feedforward);
    let err = run(&model, &mut source, &demo_options(TaskType::Feedforward, 0)).unwrap_err();
    assert!(matches!(err, MedirError::InvalidConfiguration(_)));
}

struct CountingSource {
    inner: DemoSource,
    calls: usize,
}

impl SliceSource for CountingSource {
    fn next_slice(&mut self) -> medir::Result<InputBatch> {
        self.calls += 1;
        self.inner.next_slice()
    }
}

#[test]
fn test_missing_strategy_fails_before_any_input_is_drawn() {
    let model = MockModel::new();
    let mut source = CountingSource {
        inner: demo_source(TaskType::Classification),
        calls: 0,
    };
    let registry = StrategyRegistry::empty();
    let err = run_with_registry(
        &model,
        &mut source,
        &demo_options(TaskType::Classification, 3),
        &registry,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        MedirError::UnsupportedTask {
            stage: "input-construction",
            ..
        }
    ));
    assert_eq!(source.calls, 0, "dispatch must fail before input construction");
}

struct FailingModel;

impl ModelBackend for FailingModel {
    fn name(&self) -> &str {
        "failing-stub"
    }
}

#[test]
fn test_iteration_failure_wraps_original_cause() {
    // A backend with no tensor entry point fails on the first iteration; the
    // loop aborts and the cause is preserved.
    let model = FailingModel;
    let mut source = demo_source(TaskType::Classification);
    let err = run(
        &model,
        &mut source,
        &demo_options(TaskType::Classification, 3),
    )
    .unwrap_err();

    match &err {
        MedirError::IterationFailure { iteration, .. } => assert_eq!(*iteration, 0),
        other => panic!("expected IterationFailure, got {other}"),
    }
    let cause = err.source().expect("original cause preserved");
    assert!(cause.to_string().contains("forward"));
}

#[test]
fn test_generation_collects_token_counts_per_row() {
    let model = MockModel::new();
    let mut source = DemoSource::new(TaskType::TextGeneration, 2, vec![]);
    let options = RunOptions::new(TaskType::TextGeneration).with_iterations(3);
    let outcome = run(&model, &mut source, &options).unwrap();

    // 3 iterations x 2 batch rows
    assert_eq!(outcome.token_counts.len(), 6);
    // Every row generates the same fixed-length continuation plus the
    // trailing end token.
    assert!(outcome.token_counts.iter().all(|&c| c == 5));
}

#[test]
fn test_speech_collects_audio_lengths_and_sample_rate() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::SpeechToText);
    let outcome = run(
        &model,
        &mut source,
        &demo_options(TaskType::SpeechToText, 2),
    )
    .unwrap();

    assert_eq!(outcome.audio_lengths, vec![1600.0, 1600.0]);
    assert_eq!(outcome.sample_rate, Some(16_000));
    assert_eq!(outcome.token_counts.len(), 2);
}

#[test]
fn test_speech_single_shot_reuses_planned_audio() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::SpeechToText);
    let outcome = run(
        &model,
        &mut source,
        &demo_options(TaskType::SpeechToText, 1),
    )
    .unwrap();

    assert_eq!(outcome.audio_lengths, vec![1600.0]);
    assert_eq!(outcome.sample_rate, Some(16_000));
}

#[test]
fn test_batch_generation_single_shot_reports_fixed_width() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::BatchTextGeneration);
    let outcome = run(
        &model,
        &mut source,
        &demo_options(TaskType::BatchTextGeneration, 1),
    )
    .unwrap();
    assert_eq!(outcome.token_counts, vec![MAX_TEXT_LEN]);
}

#[test]
fn test_batch_generation_looped_has_no_token_counts() {
    let model = MockModel::new();
    let mut source = demo_source(TaskType::BatchTextGeneration);
    let outcome = run(
        &model,
        &mut source,
        &demo_options(TaskType::BatchTextGeneration, 2),
    )
    .unwrap();
    assert!(outcome.token_counts.is_empty());
    assert_eq!(outcome.latencies.len(), 2);
}

#[test]
fn test_latencies_are_non_negative_and_ordered_by_iteration() {
    let model = MockModel::new().with_latency(Duration::from_millis(5));
    let mut source = demo_source(TaskType::Feedforward);
    let outcome = run(&model, &mut source, &demo_options(TaskType::Feedforward, 4)).unwrap();

    assert_eq!(outcome.latencies.len(), 4);
    for latency in &outcome.latencies {
        assert!(*latency >= 0.005);
    }
}
