use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use hoststat::args::DaemonArgs;
use hoststat::config::{DaemonSettings, SourceKind, load_config};
use hoststat::error::{AppError, AppResult};
use hoststat::orchestrator::Orchestrator;
use hoststat::pipeline::{Pipeline, PipelineSettings, SamplingPipeline};
use hoststat::shutdown::{request_shutdown, shutdown_channel};
use hoststat::sinks::run_sink;
use hoststat::source::{CpuUsageSource, LoadAverageSource};

use crate::logger::init_logging;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

pub(crate) fn run() -> ExitCode {
    let args = DaemonArgs::parse();
    init_logging(args.verbose, args.no_color);

    start(&args).map_or_else(
        |err| {
            error!("{}", err);
            ExitCode::FAILURE
        },
        |()| ExitCode::SUCCESS,
    )
}

fn start(args: &DaemonArgs) -> AppResult<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = DaemonSettings::resolve(args, &config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_daemon(settings))
}

fn build_pipeline(
    kind: SourceKind,
    settings: PipelineSettings,
) -> AppResult<Box<dyn Pipeline>> {
    let pipeline: Box<dyn Pipeline> = match kind {
        SourceKind::LoadAverage => {
            Box::new(SamplingPipeline::new(LoadAverageSource::new(), settings)?)
        }
        SourceKind::CpuUsage => Box::new(SamplingPipeline::new(CpuUsageSource::new(), settings)?),
    };
    Ok(pipeline)
}

async fn run_daemon(settings: DaemonSettings) -> AppResult<()> {
    let pipelines = settings
        .sources
        .iter()
        .map(|kind| build_pipeline(*kind, settings.pipeline))
        .collect::<AppResult<Vec<_>>>()?;
    info!(
        sources = ?settings.sources.iter().map(|kind| kind.config_key()).collect::<Vec<_>>(),
        depth = settings.pipeline.depth.get(),
        rate = settings.pipeline.rate.get(),
        "Starting hoststat"
    );

    let orchestrator = Orchestrator::new(pipelines);
    let (out_tx, out_rx) = orchestrator.output_channel();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let sink = tokio::spawn(run_sink(out_rx, settings.output, tokio::io::stdout()));
    let signals = setup_signal_shutdown_handler(&shutdown_tx);

    let outcome = orchestrator.run(shutdown_rx, out_tx).await;

    request_shutdown(&shutdown_tx);
    if let Err(err) = signals.await {
        warn!("Signal handler task failed: {}", err);
    }
    let written = sink.await?.map_err(AppError::sink)?;
    info!(written, "Output flushed");

    outcome.map_err(AppError::from)
}
