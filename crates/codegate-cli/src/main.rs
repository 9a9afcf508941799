//! `codegate`: check generated payloads and replay completion records
//! against the commit gate, offline.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use codegate_core::collaborators::memory::{LedgerRefunds, LogNotifier, MemoryLiveView, MemorySnapshotStore};
use codegate_core::{
    CommitGate, CompletionRecord, GateConfig, GateOutcome, Pipeline, ProducerReason, ProjectSession, RejectionCode,
};
use codegate_filemap::FileMap;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("codegate")
        .version(codegate_core::VERSION)
        .about("Zero-trust validation and commit gate for generated source bundles")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Gate configuration file (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("check")
                .about("Run the shape, syntax and isolation layers over a payload")
                .arg(
                    Arg::new("payload")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the raw producer output"),
                )
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .value_parser(value_parser!(PathBuf))
                        .help("Current snapshot as a JSON object of path to text"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Feed a completion record through the full gate")
                .arg(
                    Arg::new("record")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Completion record (JSON)"),
                )
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .value_parser(value_parser!(PathBuf))
                        .help("Current snapshot as a JSON object of path to text"),
                )
                .arg(
                    Arg::new("fail-store")
                        .long("fail-store")
                        .action(ArgAction::SetTrue)
                        .help("Make the durable write fail"),
                ),
        )
        .subcommand(Command::new("codes").about("List every reason code the gate can emit"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => GateConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GateConfig::default(),
    };
    let pipeline = Pipeline::from_config(&config)?;
    tracing::debug!(?config, "gate configured");

    match matches.subcommand() {
        Some(("check", args)) => {
            let raw = read_text(required_path(args, "payload")?)?;
            let snapshot = load_snapshot(args.get_one::<PathBuf>("snapshot"))?;
            let report = check_payload(&pipeline, &raw, snapshot.as_ref());
            println!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(if report["accepted"] == Value::Bool(true) { 0 } else { 1 });
        }
        Some(("replay", args)) => {
            let text = read_text(required_path(args, "record")?)?;
            let record: CompletionRecord = serde_json::from_str(&text).context("parsing completion record")?;
            let snapshot = load_snapshot(args.get_one::<PathBuf>("snapshot"))?;
            let outcome = replay(&config, pipeline, &record, snapshot, args.get_flag("fail-store")).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            std::process::exit(if outcome.is_committed() { 0 } else { 1 });
        }
        Some(("codes", _)) => {
            for code in RejectionCode::ALL {
                println!("gate      {code}");
            }
            for reason in ProducerReason::ALL {
                println!("producer  {reason}");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{name}>"))
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_snapshot(path: Option<&PathBuf>) -> Result<Option<FileMap>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let entries: BTreeMap<String, String> = serde_json::from_str(&read_text(path)?)
        .with_context(|| format!("snapshot {} must be an object of path to text", path.display()))?;
    Ok(Some(FileMap::from_raw_pairs(entries)?))
}

/// Per-layer verdicts; later layers are skipped once one fails
fn check_payload(pipeline: &Pipeline, raw: &str, snapshot: Option<&FileMap>) -> Value {
    let files = match pipeline.shape(Some(raw)) {
        Ok(files) => files,
        Err(rejection) => {
            return json!({
                "accepted": false,
                "shape": rejection,
            })
        }
    };
    let shape = json!({ "files": files.len(), "fingerprint": files.fingerprint() });

    if let Err(rejection) = pipeline.syntax(&files) {
        return json!({ "accepted": false, "shape": shape, "syntax": rejection });
    }

    let mode = pipeline.isolation_mode(snapshot);
    if let Err(rejection) = pipeline.isolation(&files, mode) {
        return json!({
            "accepted": false,
            "shape": shape,
            "syntax": "ok",
            "isolation": { "mode": mode, "rejection": rejection },
        });
    }

    let plan = pipeline.plan_commit(files, snapshot);
    json!({
        "accepted": true,
        "shape": shape,
        "syntax": "ok",
        "isolation": { "mode": mode },
        "commit": { "mode": plan.mode, "files": plan.files.len() },
    })
}

async fn replay(
    config: &GateConfig,
    pipeline: Pipeline,
    record: &CompletionRecord,
    snapshot: Option<FileMap>,
    fail_store: bool,
) -> Result<GateOutcome> {
    let store = match snapshot {
        Some(files) => MemorySnapshotStore::new().with_snapshot(record.project_id.clone(), files),
        None => MemorySnapshotStore::new(),
    };
    store.set_fail_writes(fail_store);

    let gate = CommitGate::new(
        pipeline,
        Arc::new(store),
        Arc::new(MemoryLiveView::new()),
        Arc::new(LedgerRefunds::default()),
        Arc::new(LogNotifier),
    );

    let mut session = ProjectSession::with_history(record.project_id.clone(), config.processed_history);
    session.begin_attempt(record.id.clone())?;
    Ok(gate.handle_completion(&mut session, record).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn check_reports_first_failing_layer() {
        let pipeline = Pipeline::default();
        let raw = r#"{"/admin/Panel.tsx": "export const Panel = () => <div />;"}"#;

        let report = check_payload(&pipeline, raw, None);

        assert_eq!(report["accepted"], json!(false));
        assert_eq!(report["syntax"], json!("ok"));
        assert_eq!(report["isolation"]["rejection"]["code"], json!("path_isolation"));
    }

    #[test]
    fn check_accepts_storefront_delta() {
        let raw = r#"{"storefront/Hero.tsx": "export const Hero = () => <section>Sale</section>;"}"#;

        let report = check_payload(&Pipeline::default(), raw, None);

        assert_eq!(report["accepted"], json!(true));
        assert_eq!(report["commit"]["mode"]["kind"], json!("delta_merge"));
    }

    #[test]
    fn snapshot_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"components/Nav.tsx": "export {{}}"}}"#).unwrap();

        let snapshot = load_snapshot(Some(&file.path().to_path_buf())).unwrap().unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.paths().any(|path| path.as_str() == "/components/Nav.tsx"));
    }

    #[tokio::test]
    async fn replay_with_failing_store_aborts() {
        let record: CompletionRecord = serde_json::from_value(json!({
            "id": "a1",
            "project_id": "shop",
            "status": "completed",
            "prompt": "add a banner",
            "code_result": r#"{"/App.tsx": "export default function App(){return <div>Hi</div>}"}"#,
        }))
        .unwrap();

        let outcome = replay(&GateConfig::default(), Pipeline::default(), &record, None, true)
            .await
            .unwrap();

        assert_eq!(outcome.label(), "aborted");
    }
}
