pub mod board;
pub mod cli;
pub mod config;
pub mod drag;
pub mod editor;
pub mod error;
pub mod mutation;
pub mod remote;
pub mod render;
pub mod scenario;
pub mod session;
pub mod store;
pub mod subtasks;
pub mod workspace;

#[cfg(test)]
mod testing;

use std::ffi::OsString;
use std::io::Write;

use anyhow::{
  Context,
  anyhow
};
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre = cli::preprocess_args(&raw_args);
  let cli =
    cli::GlobalCli::parse_from(pre.cleaned_args);

  cli::init_tracing(cli.verbose, cli.quiet)?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting corkboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg =
    config::Config::load(cli.rc_file.as_deref())?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  let settings = config::Settings::from(&cfg);
  let renderer =
    render::Renderer::new(settings.color);

  let scenarios =
    scenario::load_scenarios(&cli.scenarios)?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .build()
      .context("failed to start runtime")?;

  let mut out = std::io::stdout().lock();
  let mut failed = Vec::new();

  for sc in &scenarios {
    let runner =
      scenario::ScenarioRunner::new(sc, &settings);
    let (workspace, report) =
      runtime.block_on(runner.run(sc))?;

    writeln!(out, "== {}", report.name)?;
    if !cli.summary {
      renderer
        .write_session(&mut out, workspace.session())?;
      if !report.projects.is_empty() {
        renderer
          .write_projects(&mut out, &report.projects)?;
      }
      renderer.write_board(&mut out, &workspace)?;
      renderer.write_notices(&mut out, &report.notices)?;
      for err in &report.step_errors {
        writeln!(out, "step error: {err}")?;
      }
    }
    for failure in &report.failures {
      writeln!(out, "FAIL {failure}")?;
    }
    writeln!(
      out,
      "{} steps, {} notices, {} expectation failures",
      report.steps_run,
      report.notices.len(),
      report.failures.len()
    )?;

    if !report.passed() {
      warn!(scenario = %report.name, "expectations failed");
      failed.push(report.name);
    }
  }

  if cli.check && !failed.is_empty() {
    return Err(anyhow!(
      "expectations failed in: {}",
      failed.join(", ")
    ));
  }

  info!("done");
  Ok(())
}
