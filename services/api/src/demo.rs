use crate::infra::{parse_positive, synthetic_candidate, InMemoryCandidateRepository};
use crate::server::build_service;
use candidate_tracker::candidates::{CandidateService, Locale};
use candidate_tracker::config::AppConfig;
use candidate_tracker::error::AppError;
use candidate_tracker::export::{
    ExportArtifact, ExportError, ExportFormat, ExportScope, ExportStatus, FormatLimits,
};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Output format: csv, excel or pdf
    #[arg(long, value_parser = parse_format, default_value = "csv")]
    pub(crate) format: ExportFormat,
    /// Number of synthetic candidates to seed before exporting
    #[arg(long, value_parser = parse_positive, default_value = "25")]
    pub(crate) rows: usize,
    /// Zero-based page to export; exports every row when omitted
    #[arg(long)]
    pub(crate) page: Option<usize>,
    /// Page size used together with --page
    #[arg(long, value_parser = parse_positive)]
    pub(crate) size: Option<usize>,
    /// Label language for the Status column (es or en)
    #[arg(long, value_parser = parse_locale, default_value = "es")]
    pub(crate) locale: Locale,
    /// Destination file (defaults to the artifact's own filename)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of synthetic candidates to seed
    #[arg(long, value_parser = parse_positive, default_value = "40")]
    pub(crate) candidates: usize,
    /// Format of the background export
    #[arg(long, value_parser = parse_format, default_value = "excel")]
    pub(crate) format: ExportFormat,
    /// Delay between status polls, in milliseconds
    #[arg(long, value_parser = parse_positive, default_value = "50")]
    pub(crate) poll_ms: usize,
    /// Write the finished artifact into this directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    raw.parse::<ExportFormat>().map_err(|err| err.to_string())
}

fn parse_locale(raw: &str) -> Result<Locale, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "es" => Ok(Locale::Es),
        "en" => Ok(Locale::En),
        other => Err(format!("unsupported locale '{other}' (expected es or en)")),
    }
}

fn seeded_service(
    config: &AppConfig,
    count: usize,
) -> Result<Arc<CandidateService<InMemoryCandidateRepository>>, AppError> {
    let repository = Arc::new(InMemoryCandidateRepository::default());
    let service = build_service(&config.export, repository);
    for n in 0..count {
        service.create(synthetic_candidate(n), Locale::default())?;
    }
    Ok(Arc::new(service))
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        format,
        rows,
        page,
        size,
        locale,
        output,
    } = args;

    let config = AppConfig::load()?;
    let service = seeded_service(&config, rows)?;
    let scope = ExportScope::from_parts(page.is_none() && size.is_none(), page, size)?;

    let worker = Arc::clone(&service);
    let artifact = tokio::task::spawn_blocking(move || worker.export_now(format, scope, locale))
        .await
        .map_err(|err| ExportError::Worker(err.to_string()))??;

    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&path, &artifact.bytes)?;
    print_artifact(&artifact, &path);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        candidates,
        format,
        poll_ms,
        output_dir,
    } = args;

    let config = AppConfig::load()?;
    let limits = config.export.limits();
    let service = seeded_service(&config, candidates)?;

    println!("Candidate export demo");
    println!("- seeded {candidates} synthetic candidates");
    print_limits(&limits, candidates);

    let ticket = service.submit_export(format, ExportScope::All, Locale::default())?;
    println!("\nSubmitted {format} export {}", ticket.id);

    let poll = Duration::from_millis(poll_ms as u64);
    let status = loop {
        match service.exports().status(&ticket.id) {
            ExportStatus::Pending => {
                println!("  status: PENDING");
                tokio::time::sleep(poll).await;
            }
            settled => break settled,
        }
    };

    match status {
        ExportStatus::Ready {
            artifact,
            expires_at,
        } => {
            println!("  status: READY (downloadable until {})", expires_at.to_rfc3339());
            let path = output_dir
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&artifact.filename);
            std::fs::write(&path, &artifact.bytes)?;
            print_artifact(&artifact, &path);
        }
        ExportStatus::Failed(err) => {
            println!("  status: FAILED ({err})");
        }
        other => {
            println!("  status: {}", other.code());
        }
    }

    let report = service.exports().sweep();
    println!(
        "\nSweep removed {} artifacts and {} job records; {} exports still pending",
        report.artifacts,
        report.jobs,
        service.exports().pending_jobs()
    );
    Ok(())
}

fn print_limits(limits: &FormatLimits, candidates: usize) {
    println!(
        "- artifacts stay downloadable for {} minutes",
        limits.expiration_minutes
    );
    for format in ExportFormat::ALL {
        let verdict = match limits.check(format, candidates) {
            Ok(()) => "allowed".to_string(),
            Err(err) => format!("rejected: {err}"),
        };
        println!(
            "  - {format}: up to {} rows ({verdict})",
            limits.ceiling(format)
        );
    }
}

fn print_artifact(artifact: &ExportArtifact, path: &Path) {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    println!("Wrote {}", path.display());
    println!(
        "- {} rows | {} bytes | content type {} (file extension suggests {})",
        artifact.rows,
        artifact.size(),
        artifact.content_type,
        guessed
    );
    if artifact.sections.len() > 1 {
        println!(
            "- split into {} sections of {:?} rows",
            artifact.sections.len(),
            artifact.sections
        );
    }
}
