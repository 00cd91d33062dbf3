use super::*;
use crate::args::OutputFormat;
use crate::source::{AggregateSnapshot, CpuUsage, LoadAverage, Reading};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

fn snapshot(reading: Reading) -> Result<AggregateSnapshot, String> {
    let window_start =
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).ok_or("invalid timestamp")?;
    let window_end = DateTime::<Utc>::from_timestamp(1_700_000_005, 0).ok_or("invalid timestamp")?;
    Ok(AggregateSnapshot {
        reading,
        window_start,
        window_end,
        covered: Duration::from_secs(5),
    })
}

fn load() -> Reading {
    Reading::LoadAverage(LoadAverage {
        one: 0.5,
        five: 0.25,
        fifteen: 1.0,
    })
}

#[test]
fn text_line_for_load_average() -> Result<(), String> {
    let line = render_text(&snapshot(load())?);
    let expected = "Load average: 1m: 0.50, 5m: 0.25, 15m: 1.00 - Begin: 2023-11-14T22:13:20Z, End: 2023-11-14T22:13:25Z, Duration: 5s";
    if line != expected {
        return Err(format!("unexpected line '{}'", line));
    }
    Ok(())
}

#[test]
fn text_line_for_cpu_usage() -> Result<(), String> {
    let line = render_text(&snapshot(Reading::CpuUsage(CpuUsage {
        user: 12.346,
        nice: 0.0,
        system: 3.5,
        idle: 84.154,
    }))?);
    if !line.starts_with("CPU usage: User: 12.35, Nice: 0.00, System: 3.50, Idle: 84.15 - Begin: ") {
        return Err(format!("unexpected line '{}'", line));
    }
    Ok(())
}

#[test]
fn json_line_is_flat_object() -> Result<(), String> {
    let line = render_line(&snapshot(load())?, OutputFormat::Json).map_err(|err| err.to_string())?;
    let value: serde_json::Value = serde_json::from_str(&line).map_err(|err| err.to_string())?;
    if value.get("source").and_then(|v| v.as_str()) != Some("loadavg") {
        return Err(format!("missing source tag in {}", line));
    }
    if value.get("window_start").and_then(|v| v.as_str()) != Some("2023-11-14T22:13:20Z") {
        return Err(format!("unexpected window_start in {}", line));
    }
    Ok(())
}

#[test]
fn sink_writes_every_snapshot_until_closed() -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(async {
        let (tx, rx) = mpsc::channel(2);
        let producer = tokio::spawn(async move {
            for _ in 0..3 {
                let Ok(item) = snapshot(load()) else {
                    return;
                };
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });

        let mut output: Vec<u8> = Vec::new();
        let written = run_sink(rx, OutputFormat::Text, &mut output)
            .await
            .map_err(|err| err.to_string())?;
        producer.await.map_err(|err| err.to_string())?;

        let text = String::from_utf8(output).map_err(|err| err.to_string())?;
        if written != 3 || text.lines().count() != 3 {
            return Err(format!("expected 3 lines, got {}: {}", written, text));
        }
        Ok(())
    })
}
