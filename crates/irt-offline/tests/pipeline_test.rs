//! Background pipeline behaviour: delivery, supersession, failures

use std::time::Duration;

use irt_core::{AudioBuffer, NUM_BANDS};
use irt_offline::{JobKind, PipelineConfig, PipelineEvent, ProcessingPipeline};

const WAIT: Duration = Duration::from_secs(30);

fn noise(len: usize, sr: u32) -> AudioBuffer {
    let mut state = 0x1234_5678u32;
    let samples = (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect();
    AudioBuffer::new(samples, sr).unwrap()
}

fn convolve(di_len: usize, ir_len: usize, wet_mix: f64) -> JobKind {
    JobKind::Convolve {
        ir: noise(ir_len, 44100),
        di: noise(di_len, 44100),
        wet_mix,
        gains: None,
    }
}

/// Wait for the terminal event of the latest job, collecting progress on the way
fn wait_terminal(pipeline: &mut ProcessingPipeline) -> (Vec<u8>, PipelineEvent) {
    let mut progress = Vec::new();
    loop {
        let event = pipeline.recv_timeout(WAIT).expect("pipeline went quiet");
        match event {
            PipelineEvent::Progress { percent, .. } => progress.push(percent),
            other => return (progress, other),
        }
    }
}

#[test]
fn test_finished_event_carries_result() {
    let mut pipeline = ProcessingPipeline::new(PipelineConfig::default());
    let id = pipeline.submit(convolve(88200, 22050, 1.0)).unwrap();

    let (progress, event) = wait_terminal(&mut pipeline);
    assert_eq!(progress.first(), Some(&10));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    match event {
        PipelineEvent::Finished { job, result } => {
            assert_eq!(job, id);
            assert_eq!(result.output.len(), 110249);
            assert_eq!(result.sample_rate(), 44100);
            assert_eq!(result.wet_mix, Some(1.0));
            assert!(result.output.ptr_eq(&result.raw));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!pipeline.is_busy());
}

#[test]
fn test_superseded_job_never_delivered() {
    let mut pipeline = ProcessingPipeline::default();
    let first = pipeline.submit(convolve(441000, 44100, 1.0)).unwrap();
    let second = pipeline.submit(convolve(4410, 441, 0.5)).unwrap();
    assert!(second > first);
    assert_eq!(pipeline.latest_job(), Some(second));

    let (_, event) = wait_terminal(&mut pipeline);
    assert_eq!(event.job(), second);

    // Nothing from the first job may follow
    std::thread::sleep(Duration::from_millis(50));
    assert!(pipeline.drain().iter().all(|e| e.job() == second));
}

#[test]
fn test_empty_input_reports_failure() {
    let mut pipeline = ProcessingPipeline::default();
    let kind = JobKind::Convolve {
        ir: AudioBuffer::new(Vec::new(), 44100).unwrap(),
        di: noise(100, 44100),
        wet_mix: 1.0,
        gains: None,
    };
    let id = pipeline.submit(kind).unwrap();

    let (_, event) = wait_terminal(&mut pipeline);
    match event {
        PipelineEvent::Failed { job, message } => {
            assert_eq!(job, id);
            assert!(message.contains("impulse response"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_equalize_job() {
    let mut pipeline = ProcessingPipeline::default();
    let raw = noise(4096, 44100);
    let mut gains = [0.0; NUM_BANDS];
    gains[4] = -6.0;
    pipeline
        .submit(JobKind::Equalize {
            raw: raw.clone(),
            gains,
        })
        .unwrap();

    let (_, event) = wait_terminal(&mut pipeline);
    let PipelineEvent::Finished { result, .. } = event else {
        panic!("expected result");
    };
    assert!(result.is_eq_only());
    assert!(result.raw.ptr_eq(&raw));
    assert!(!result.output.ptr_eq(&raw));
    assert_eq!(result.output.len(), raw.len());
}

#[test]
fn test_cancel_current_silences_job() {
    let mut pipeline = ProcessingPipeline::default();
    pipeline.submit(convolve(441000, 44100, 1.0)).unwrap();
    pipeline.cancel_current();
    assert!(!pipeline.is_busy());
    assert_eq!(pipeline.latest_job(), None);

    let leftovers = pipeline.drain();
    assert!(
        !leftovers
            .iter()
            .any(|e| matches!(e, PipelineEvent::Finished { .. })),
        "{leftovers:?}"
    );
    assert!(leftovers.is_empty());
}

#[test]
fn test_cancel_drops_already_queued_result() {
    let mut pipeline = ProcessingPipeline::default();
    pipeline.submit(convolve(64, 8, 1.0)).unwrap();

    // Let the worker finish so its result sits in the channel
    let deadline = std::time::Instant::now() + WAIT;
    while pipeline.is_busy() {
        assert!(std::time::Instant::now() < deadline, "worker never finished");
        std::thread::sleep(Duration::from_millis(1));
    }

    pipeline.cancel_current();
    let leftovers = pipeline.drain();
    assert!(
        !leftovers
            .iter()
            .any(|e| matches!(e, PipelineEvent::Finished { .. })),
        "{leftovers:?}"
    );
    assert!(pipeline.recv_timeout(Duration::from_millis(50)).is_none());
}
