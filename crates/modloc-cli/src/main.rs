use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use modloc_services::overrides::OverrideStore;
use modloc_services::process::ArchiveDecision;
use modloc_services::Session;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "modloc", version, about = "Minecraft mod localization pipeline (Rust)")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Staging directory shared by all pipeline stages
    #[arg(long, default_value = "work")]
    work_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report which locales a single archive carries and how complete its
    /// target translation is
    Inspect {
        #[arg(long = "mod", value_name = "ARCHIVE")]
        mod_path: PathBuf,
    },

    /// Extract locale files from mod archives, merge them with override
    /// packs and write the translation work files
    Process {
        /// Mod archives (.jar / .zip); repeatable
        #[arg(long = "mod", value_name = "ARCHIVE", required = true)]
        mods: Vec<PathBuf>,
        /// Existing translation packs used to skip already-translated keys;
        /// repeatable
        #[arg(long = "pack", value_name = "ARCHIVE")]
        packs: Vec<PathBuf>,
        /// Entries per work file (overrides the config value)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Send pending work files to the configured translation service
    Translate {
        /// Seconds to wait between service calls (overrides the config value)
        #[arg(long)]
        wait: Option<f64>,
    },

    /// Merge translation results into per-path locale files and package them
    Assemble {
        /// Static files copied verbatim into the output root
        #[arg(long, default_value = "extras")]
        extras: PathBuf,
        /// Package file to write (default: timestamped zip in the CWD)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Remove the staging directory
    Clean {
        /// Keep the translations extracted from override packs
        #[arg(long, default_value_t = false)]
        keep_packs: bool,
    },
}

fn decision_line(name: &str, decision: &ArchiveDecision, use_color: bool) -> String {
    use owo_colors::OwoColorize;
    let (tag, text) = match decision {
        ArchiveDecision::Unreadable => ("✖", "unreadable archive".to_string()),
        ArchiveDecision::NoLangFiles => ("•", "no locale files".to_string()),
        ArchiveDecision::NoSourceLocale => ("•", "no source locale".to_string()),
        ArchiveDecision::AlreadyComplete { coverage_pct } => {
            ("✔", format!("already translated ({coverage_pct:.1}%)"))
        }
        ArchiveDecision::PartialTarget { coverage_pct } => {
            ("➜", format!("partial translation ({coverage_pct:.1}%)"))
        }
        ArchiveDecision::NoTarget => ("➜", "no translation yet".to_string()),
    };
    if use_color {
        match decision {
            ArchiveDecision::Unreadable => format!("{tag} {} — {}", name, text.red()),
            ArchiveDecision::AlreadyComplete { .. } => {
                format!("{tag} {} — {}", name, text.green())
            }
            _ => format!("{tag} {} — {}", name.cyan(), text),
        }
    } else {
        format!("{tag} {name} — {text}")
    }
}

trait Runnable {
    fn run(self, work_dir: &Path, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, work_dir: &Path, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("▶ Starting command: {}", cmd_name);

        let config = modloc_config::load_config()?;
        let session = Session::new(work_dir, config.source_lang(), config.target_lang());

        let result = match self {
            Commands::Inspect { mod_path } => {
                debug!("Inspect args: mod={:?}", mod_path);
                match modloc_archive::inspect_archive(
                    &mod_path,
                    &session.source_lang,
                    &session.target_lang,
                ) {
                    modloc_archive::InspectOutcome::Unreadable => {
                        println!("✖ {} is not a readable archive", mod_path.display());
                    }
                    modloc_archive::InspectOutcome::Report(report) => {
                        println!("locales: {}", report.locales.join(", "));
                        println!(
                            "source {}: {}  target {}: {}",
                            session.source_lang,
                            if report.has_source_locale { "yes" } else { "no" },
                            session.target_lang,
                            if report.has_target_locale { "yes" } else { "no" },
                        );
                        if report.has_source_locale && report.has_target_locale {
                            let c = modloc_archive::analyze_completeness(
                                &mod_path,
                                &session.source_lang,
                                &session.target_lang,
                            )?;
                            println!(
                                "coverage: {:.1}% ({}/{} keys){}",
                                c.coverage_pct,
                                c.target_keys,
                                c.source_keys,
                                if c.is_complete { " — complete" } else { "" },
                            );
                        }
                    }
                }
                Ok(())
            }

            Commands::Process { mods, packs, batch_size } => {
                debug!("Process args: mods={:?} packs={:?} batch_size={:?}", mods, packs, batch_size);
                session.ensure_layout()?;

                let overrides = OverrideStore::load_packs(&session, &packs)?;
                if !overrides.is_empty() {
                    println!(
                        "Loaded {} override pack(s): {} path(s), {} translation(s)",
                        overrides.loaded_packs(),
                        overrides.path_count(),
                        overrides.entry_count()
                    );
                }

                let report = modloc_services::process::process_archives(&session, &mods)?;
                for (name, decision) in &report.decisions {
                    println!("{}", decision_line(name, decision, use_color));
                }
                let s = &report.stats;
                println!(
                    "\nProcessed {} of {} archive(s) (skipped: {} unreadable, {} without locale files, {} without {}, {} already translated)",
                    s.processed,
                    mods.len(),
                    s.unreadable,
                    s.no_lang_files,
                    s.no_source_locale,
                    session.source_lang,
                    s.already_complete,
                );
                if report.mods.is_empty() {
                    println!("Nothing to do.");
                } else {
                    let outcome = modloc_services::merge::merge_extracted(
                        &report.mods,
                        &session.source_lang,
                        &session.target_lang,
                        &overrides,
                    )?;
                    if outcome.stats.overridden_keys > 0 {
                        println!(
                            "Override packs covered {} key(s):",
                            outcome.stats.overridden_keys
                        );
                        for (mod_name, count) in &outcome.overridden_by_mod {
                            println!("  - {mod_name}: {count}");
                        }
                    }
                    if !outcome.has_pending() {
                        println!("✔ Everything is already translated; no work files needed");
                    } else {
                        let per_file = batch_size.unwrap_or_else(|| config.batch_size());
                        let manifest =
                            modloc_services::batch::write_batches(&session, &outcome, per_file)?;
                        let total_files: usize =
                            manifest.paths.iter().map(|p| p.split_files.len()).sum();
                        println!(
                            "✔ Queued {} key(s) across {} path(s) in {} work file(s); manifest at {}",
                            outcome.stats.pending_keys,
                            manifest.paths.len(),
                            total_files,
                            session.manifest_path().display(),
                        );
                    }
                }
                Ok(())
            }

            Commands::Translate { wait } => {
                debug!("Translate args: wait={:?}", wait);
                let mut settings = config.translator_settings()?;
                if let Some(wait) = wait {
                    if wait <= 0.0 {
                        color_eyre::eyre::bail!("--wait must be greater than zero");
                    }
                    settings.wait_secs = wait;
                }
                let translator = modloc_services::translate::OpenAiTranslator::new(&settings)?;
                println!(
                    "Using model {} at {} (waiting {}s between calls)",
                    settings.model_id, settings.api_url, settings.wait_secs
                );
                let summary = modloc_services::translate::run_driver(
                    &session,
                    &translator,
                    Duration::from_secs_f64(settings.wait_secs),
                )?;
                println!(
                    "\n✔ {} of {} work file(s) done ({} resumed, {} failed); {} key(s) translated",
                    summary.done_files,
                    summary.total_files,
                    summary.skipped_files,
                    summary.failed_files,
                    summary.translated_keys,
                );
                if summary.failed_files > 0 {
                    println!("⚠ Re-run `modloc translate` to retry the failed files");
                }
                Ok(())
            }

            Commands::Assemble { extras, out } => {
                debug!("Assemble args: extras={:?} out={:?}", extras, out);
                let summary = modloc_services::assemble::assemble(
                    &session,
                    Some(extras.as_path()),
                    out.as_deref(),
                )?;
                println!(
                    "✔ Merged {} of {} path(s), {} key(s) total",
                    summary.merged_paths, summary.total_paths, summary.merged_keys
                );
                if summary.missing_files > 0 {
                    println!(
                        "⚠ {} result file(s) were missing; the output is partial",
                        summary.missing_files
                    );
                }
                match summary.package {
                    Some(package) => println!("✔ Package written to {package}"),
                    None => println!("No translations were merged; nothing to package"),
                }
                Ok(())
            }

            Commands::Clean { keep_packs } => {
                debug!("Clean args: keep_packs={}", keep_packs);
                session.clean(keep_packs)?;
                if keep_packs {
                    println!("✔ Staging cleaned (override packs kept)");
                } else {
                    println!("✔ Staging cleaned");
                }
                Ok(())
            }
        };

        match &result {
            Ok(_) => info!("✔ Finished command: {}", cmd_name),
            Err(e) => error!("✖ Command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("logs", "modloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _guard = init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(&cli.work_dir, use_color)
}
