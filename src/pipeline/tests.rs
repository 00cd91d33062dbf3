use super::*;
use crate::shutdown::{request_shutdown, shutdown_channel};
use crate::source::Reading;
use crate::source::test_support::CountingSource;
use std::future::Future;

const RECV_TIMEOUT: Duration = Duration::from_secs(30);

fn nz(value: usize) -> Result<NonZeroUsize, String> {
    NonZeroUsize::new(value).ok_or_else(|| "value must be non-zero".to_owned())
}

fn settings(depth: usize, rate: usize) -> Result<PipelineSettings, String> {
    Ok(PipelineSettings::new(nz(depth)?, nz(rate)?))
}

fn run_paused<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

async fn next_snapshot(
    rx: &mut mpsc::Receiver<AggregateSnapshot>,
) -> Result<AggregateSnapshot, String> {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .map_err(|err| format!("timed out waiting for snapshot: {}", err))?
        .ok_or_else(|| "output closed".to_owned())
}

fn one_minute_load(snapshot: &AggregateSnapshot) -> Result<f64, String> {
    match &snapshot.reading {
        Reading::LoadAverage(load) => Ok(load.one),
        other => Err(format!("unexpected reading {:?}", other)),
    }
}

fn fire_ticks(state: &mut PipelineState, ticks: usize) -> Vec<usize> {
    (1..=ticks).filter(|_| state.record_tick()).collect()
}

#[test]
fn overlapping_windows_fire_every_rate_ticks() -> Result<(), String> {
    let mut state = PipelineState::new(nz(5)?, nz(2)?);
    let mut fired = Vec::new();
    for tick in 1..=11 {
        if state.record_tick() {
            fired.push((tick, state.ticks_since_aggregate()));
        }
    }
    if fired != vec![(5, 3), (7, 3), (9, 3), (11, 3)] {
        return Err(format!("unexpected firing pattern {:?}", fired));
    }
    Ok(())
}

#[test]
fn equal_rate_and_depth_gives_disjoint_windows() -> Result<(), String> {
    let mut state = PipelineState::new(nz(3)?, nz(3)?);
    let fired = fire_ticks(&mut state, 9);
    if fired != vec![3, 6, 9] || state.ticks_since_aggregate() != 0 {
        return Err(format!("unexpected firing pattern {:?}", fired));
    }
    Ok(())
}

#[test]
fn rate_above_depth_skips_ticks_between_windows() -> Result<(), String> {
    let mut state = PipelineState::new(nz(2)?, nz(4)?);
    let fired = fire_ticks(&mut state, 10);
    if fired != vec![2, 6, 10] {
        return Err(format!("unexpected firing pattern {:?}", fired));
    }
    Ok(())
}

#[test]
fn capacity_below_depth_is_rejected() -> Result<(), String> {
    let bad = settings(5, 1)?.with_capacity(nz(4)?);
    match SamplingPipeline::new(CountingSource::new("counting"), bad) {
        Err(PipelineError::Validation(ValidationError::CapacityBelowDepth {
            capacity: 4,
            depth: 5,
        })) => Ok(()),
        Err(err) => Err(format!("unexpected error {}", err)),
        Ok(_) => Err("capacity below depth accepted".to_owned()),
    }
}

#[test]
fn windows_overlap_by_depth_minus_rate() -> Result<(), String> {
    run_paused(async {
        let mut pipeline = SamplingPipeline::new(CountingSource::new("counting"), settings(5, 2)?)
            .map_err(|err| err.to_string())?;
        if pipeline.phase() != PipelinePhase::Idle {
            return Err("new pipeline should be idle".to_owned());
        }
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let result = pipeline.run(shutdown_rx, out_tx).await;
            (pipeline, result)
        });

        let first = next_snapshot(&mut out_rx).await?;
        let second = next_snapshot(&mut out_rx).await?;
        request_shutdown(&shutdown_tx);

        let (pipeline, result) = handle.await.map_err(|err| err.to_string())?;
        result.map_err(|err| err.to_string())?;

        if (one_minute_load(&first)? - 3.0).abs() > 1e-9 {
            return Err(format!("first window mean {:?}", first));
        }
        if (one_minute_load(&second)? - 5.0).abs() > 1e-9 {
            return Err(format!("second window mean {:?}", second));
        }
        if first.covered != Duration::from_secs(5) {
            return Err(format!("unexpected coverage {:?}", first.covered));
        }
        let shift = second.window_start - first.window_start;
        if shift != TimeDelta::seconds(2) {
            return Err(format!("windows should start 2s apart, got {}", shift));
        }
        if first.window_end - first.window_start != TimeDelta::seconds(5) {
            return Err("window should span depth seconds".to_owned());
        }
        if pipeline.phase() != PipelinePhase::Stopped {
            return Err(format!("unexpected phase {:?}", pipeline.phase()));
        }
        if pipeline.buffer().len() > pipeline.buffer().capacity().get() {
            return Err("buffer exceeded capacity".to_owned());
        }
        Ok(())
    })
}

#[test]
fn single_sample_windows_cover_one_second() -> Result<(), String> {
    run_paused(async {
        let mut pipeline = SamplingPipeline::new(CountingSource::new("counting"), settings(1, 1)?)
            .map_err(|err| err.to_string())?;
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { pipeline.run(shutdown_rx, out_tx).await });

        let snapshot = next_snapshot(&mut out_rx).await?;
        request_shutdown(&shutdown_tx);
        handle
            .await
            .map_err(|err| err.to_string())?
            .map_err(|err| err.to_string())?;

        if snapshot.covered != Duration::from_secs(1) {
            return Err(format!("unexpected coverage {:?}", snapshot.covered));
        }
        if (one_minute_load(&snapshot)? - 1.0).abs() > 1e-9 {
            return Err(format!("unexpected value {:?}", snapshot));
        }
        Ok(())
    })
}

#[test]
fn sample_failure_stops_the_pipeline() -> Result<(), String> {
    run_paused(async {
        let source = CountingSource::new("flaky").failing_sample_at(3);
        let mut pipeline =
            SamplingPipeline::new(source, settings(5, 1)?).map_err(|err| err.to_string())?;
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        let (out_tx, _out_rx) = mpsc::channel(1);

        let result = tokio::time::timeout(RECV_TIMEOUT, pipeline.run(shutdown_rx, out_tx))
            .await
            .map_err(|err| format!("pipeline did not stop: {}", err))?;
        match result {
            Err(PipelineError::Source(_)) => {}
            other => return Err(format!("expected source error, got {:?}", other)),
        }
        if pipeline.state().ticks_since_aggregate() != 2 {
            return Err("failed tick must not be counted".to_owned());
        }
        if pipeline.phase() != PipelinePhase::Stopped {
            return Err(format!("unexpected phase {:?}", pipeline.phase()));
        }
        Ok(())
    })
}

#[test]
fn reduction_failure_stops_the_pipeline() -> Result<(), String> {
    run_paused(async {
        let source = CountingSource::new("broken").failing_reduce();
        let mut pipeline =
            SamplingPipeline::new(source, settings(2, 2)?).map_err(|err| err.to_string())?;
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        let (out_tx, mut out_rx) = mpsc::channel(1);

        let result = tokio::time::timeout(RECV_TIMEOUT, pipeline.run(shutdown_rx, out_tx))
            .await
            .map_err(|err| format!("pipeline did not stop: {}", err))?;
        match result {
            Err(PipelineError::Source(crate::error::SourceError::InvalidData { .. })) => {}
            other => return Err(format!("expected reduction error, got {:?}", other)),
        }
        if out_rx.recv().await.is_some() {
            return Err("failed reduction must not emit a snapshot".to_owned());
        }
        Ok(())
    })
}

#[test]
fn shutdown_before_first_tick_exits_cleanly() -> Result<(), String> {
    run_paused(async {
        let mut pipeline = SamplingPipeline::new(CountingSource::new("idle"), settings(3, 1)?)
            .map_err(|err| err.to_string())?;
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (out_tx, mut out_rx) = mpsc::channel(1);
        request_shutdown(&shutdown_tx);

        pipeline
            .run(shutdown_rx, out_tx)
            .await
            .map_err(|err| err.to_string())?;
        if !pipeline.buffer().is_empty() {
            return Err("no sample should be taken after shutdown".to_owned());
        }
        if out_rx.recv().await.is_some() {
            return Err("no snapshot expected".to_owned());
        }
        Ok(())
    })
}

#[test]
fn window_check_accepts_partial_and_full_windows() -> Result<(), String> {
    check_window(5, 5).map_err(|err| err.to_string())?;
    check_window(3, 5).map_err(|err| err.to_string())?;
    check_window(1, 1).map_err(|err| err.to_string())
}

#[test]
fn window_check_rejects_empty_window() -> Result<(), String> {
    match check_window(0, 5) {
        Err(PipelineError::BufferInconsistency {
            expected: 5,
            found: 0,
        }) => Ok(()),
        other => Err(format!("expected BufferInconsistency, got {:?}", other)),
    }
}

#[test]
fn window_check_rejects_oversized_window() -> Result<(), String> {
    let err = match check_window(6, 5) {
        Err(err) => err,
        Ok(()) => return Err("expected oversized window to fail".to_owned()),
    };
    let message = err.to_string();
    if message != "gathering: buffer returned 6 of 5 window samples" {
        return Err(format!("unexpected message '{}'", message));
    }
    Ok(())
}
