// Honey Duo - command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use honeyduo::config::{apply_env_overrides, load_config, load_config_from, Config};
use honeyduo::dashboard::{record_tick, run_dashboard, run_monitor};
use honeyduo::family::Member;
use honeyduo::foundation::Foundation;
use honeyduo::logging::init_tracing;
use honeyduo::migration::{DocumentMigrator, ReviewGenerator};
use honeyduo::monitor::{MetricsStore, SystemSampler};
use honeyduo::ollama::{create_server, ModelServer};
use honeyduo::orchestrator::{MarketSnapshot, Orchestrator};
use honeyduo::project::ProjectManager;
use honeyduo::training::{
    ModelVersionManager, TrainingCollector, TrainingParams, TrainingSessions,
};
use honeyduo::watcher::{scan_existing, AutonomousLearner, FileMonitor};

/// Honey Duo - drive the local AI family, collect training data, watch the host
#[derive(Parser)]
#[command(name = "honeyduo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $HONEYDUO_CONFIG or ~/.honeyduo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the project root
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt to a family member
    Ask {
        #[arg(value_enum)]
        member: Member,
        prompt: Option<String>,
    },
    /// Test every member in turn
    Health,
    /// Full Nyala -> Deon -> Claudae decision chain
    Decide(MarketArgs),
    /// Parallel quick decision under a short deadline
    Quick(MarketArgs),
    /// Load every member's model and keep it resident
    Preload,
    /// Record training data
    #[command(subcommand)]
    Collect(CollectCommand),
    /// Count collected examples and write the training summary
    Summary,
    /// Named development session that tags everything collected during it
    #[command(subcommand)]
    Session(SessionCommand),
    /// Analyse and reorganise project documents
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Pre-flight checks, backup and layout for an existing project
    #[command(subcommand)]
    Foundation(FoundationCommand),
    /// Project status and documentation
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Model versions: create, prepare, validate, deploy
    #[command(subcommand)]
    Train(TrainCommand),
    /// Watch the project and learn from user code changes until Ctrl-C
    Learn {
        /// Queue every existing user-code file once at start
        #[arg(long)]
        scan_existing: bool,
    },
    /// Live system monitor
    Monitor,
    /// Metrics dashboard with history charts
    Dashboard,
    /// Metrics history store
    #[command(subcommand)]
    Metrics(MetricsCommand),
}

#[derive(clap::Args)]
struct MarketArgs {
    #[arg(long, default_value = "BTC")]
    symbol: String,
    #[arg(long)]
    price: f64,
    /// 24h change in percent
    #[arg(long, allow_negative_numbers = true)]
    change: Option<f64>,
}

impl MarketArgs {
    fn snapshot(&self) -> MarketSnapshot {
        let mut market = MarketSnapshot::new(self.symbol.clone(), self.price);
        market.change_24h = self.change;
        market
    }
}

#[derive(Subcommand)]
enum CollectCommand {
    /// A code example; reads the code from a file
    Code {
        file: PathBuf,
        #[arg(long)]
        context: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "")]
        reasoning: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// An architecture decision
    Decision {
        decision: String,
        #[arg(long = "alternative")]
        alternatives: Vec<String>,
        #[arg(long, default_value = "")]
        reasoning: String,
        #[arg(long, default_value = "")]
        impact: String,
    },
    /// A debugging solution
    Debug {
        problem: String,
        #[arg(long, default_value = "")]
        symptoms: String,
        #[arg(long)]
        solution: String,
        #[arg(long, default_value = "")]
        prevention: String,
    },
    /// A reusable system pattern
    Pattern {
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        example: String,
        #[arg(long, default_value = "")]
        when: String,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Open a session
    Start { name: String },
    /// Show the open session
    Status,
    /// A snippet written during the session; reads the code from a file
    Code {
        file: PathBuf,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "development")]
        category: String,
    },
    /// A file created during the session
    File {
        path: PathBuf,
        #[arg(long)]
        purpose: String,
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// A problem solved during the session
    Solution {
        problem: String,
        #[arg(long)]
        explanation: String,
        #[arg(long, default_value = "")]
        code: String,
    },
    /// An architecture choice made during the session
    Decision {
        choice: String,
        #[arg(long = "alternative")]
        alternatives: Vec<String>,
        #[arg(long, default_value = "")]
        reasoning: String,
    },
    /// Close the session and write its record
    End,
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Back up, analyse and file every project document
    Run,
    /// Write the review reports for the last migration
    Review,
}

#[derive(Subcommand)]
enum FoundationCommand {
    /// Check the model server and project tree
    Validate,
    /// Snapshot project_memory and commit the project
    Backup,
    /// Create the foundation directories and config
    Setup,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Write project_memory/current_status.json and print it
    Status,
    /// Regenerate README.md
    Docs,
    /// Write today's progress report
    Report,
    /// git add + commit
    Commit {
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[derive(Subcommand)]
enum TrainCommand {
    /// Version status for one member or all
    Status {
        #[arg(value_enum)]
        member: Option<Member>,
    },
    /// Create the next version from a base model
    Create {
        #[arg(value_enum)]
        member: Member,
        #[arg(long)]
        base_model: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Write the training plan for a version
    Train {
        #[arg(value_enum)]
        member: Member,
        version: String,
        #[arg(long, default_value_t = 3)]
        epochs: u32,
        #[arg(long, default_value_t = 4)]
        batch_size: u32,
        #[arg(long, default_value_t = 2e-5)]
        learning_rate: f64,
    },
    /// Run the validation checks
    Validate {
        #[arg(value_enum)]
        member: Member,
        version: String,
    },
    /// Promote a version to production
    Deploy {
        #[arg(value_enum)]
        member: Member,
        version: String,
    },
    /// Redeploy an earlier version (default: the previous deployment)
    Rollback {
        #[arg(value_enum)]
        member: Member,
        version: Option<String>,
    },
    /// Rebuild a member's training dataset
    Dataset {
        #[arg(value_enum)]
        member: Member,
    },
}

#[derive(Subcommand)]
enum MetricsCommand {
    /// Take one sample and store it
    Record,
    /// Delete rows older than the retention period
    Prune {
        #[arg(long)]
        hours: Option<u64>,
    },
    /// Print stored samples as JSON lines
    History {
        #[arg(long, default_value_t = 6)]
        hours: u64,
    },
}

impl Commands {
    /// Full-screen commands must keep log output off the terminal
    fn owns_terminal(&self) -> bool {
        matches!(self, Commands::Monitor | Commands::Dashboard)
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = load_config_from(path)?
                .with_context(|| format!("Config file not found: {}", path.display()))?;
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
        None => load_config()?,
    };
    if let Some(root) = &cli.project_root {
        config.project_root = root.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let paths = config.paths();

    let log_file = match &cli.command {
        Commands::Learn { .. } => Some(paths.learning_dir().join("learner.log")),
        Commands::Migrate(_) | Commands::Foundation(_) => {
            Some(paths.foundation_dir().join("logs").join("foundation.log"))
        }
        c if c.owns_terminal() => Some(paths.root.join("monitoring").join("dashboard.log")),
        _ => None,
    };
    init_tracing(log_file.as_deref(), !cli.command.owns_terminal())?;

    match cli.command {
        Commands::Ask { member, prompt } => {
            let orchestrator = Orchestrator::new(create_server(&config.model_server)?, &config)?;
            let prompt = prompt.unwrap_or_else(|| match member {
                Member::Claudae => Orchestrator::guardian_prompt().to_string(),
                _ => member.readiness_prompt(),
            });
            println!("{}", orchestrator.ask(member, &prompt).await?);
        }
        Commands::Health => {
            let orchestrator = Orchestrator::new(create_server(&config.model_server)?, &config)?;
            for record in orchestrator.health_check().await {
                let (mark, text) = match &record.error {
                    None => ("✓", record.text()),
                    Some(e) => ("✗", e.as_str()),
                };
                println!(
                    "{} {} ({}): {}",
                    mark,
                    record.ai.display_name(),
                    record.elapsed_time,
                    text
                );
            }
        }
        Commands::Decide(args) => {
            let orchestrator = Orchestrator::new(create_server(&config.model_server)?, &config)?;
            let decision = orchestrator.coordinate_decision(&args.snapshot()).await;
            print_json(&decision.to_json())?;
            if !decision.is_complete() {
                eprintln!("Decision chain stopped early");
            }
        }
        Commands::Quick(args) => {
            let orchestrator = Orchestrator::new(create_server(&config.model_server)?, &config)?;
            let answers = orchestrator.quick_decision(&args.snapshot()).await;
            let json: serde_json::Map<String, serde_json::Value> = answers
                .iter()
                .map(|(member, answer)| (member.key().to_string(), answer.to_json()))
                .collect();
            print_json(&json)?;
        }
        Commands::Preload => {
            let orchestrator = Orchestrator::new(create_server(&config.model_server)?, &config)?;
            for (member, ok) in orchestrator.preload().await {
                let mark = if ok { "✓" } else { "✗" };
                println!("{} {}", mark, member.display_name());
            }
        }
        Commands::Collect(command) => {
            let collector = TrainingCollector::new(paths.training_dir())?;
            match command {
                CollectCommand::Code {
                    file,
                    context,
                    category,
                    reasoning,
                    tags,
                } => {
                    let code = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let example =
                        collector.collect_code_example(&code, &context, &category, &reasoning, &tags)?;
                    println!("✓ Code example {} saved to {}", example.hash, category);
                }
                CollectCommand::Decision {
                    decision,
                    alternatives,
                    reasoning,
                    impact,
                } => {
                    collector.collect_architecture_decision(&decision, &alternatives, &reasoning, &impact)?;
                    println!("✓ Architecture decision recorded");
                }
                CollectCommand::Debug {
                    problem,
                    symptoms,
                    solution,
                    prevention,
                } => {
                    let record =
                        collector.collect_debugging_solution(&problem, &symptoms, &solution, &prevention)?;
                    println!("✓ Debugging solution recorded ({})", record.component);
                }
                CollectCommand::Pattern {
                    name,
                    description,
                    example,
                    when,
                } => {
                    collector.collect_system_pattern(&name, &description, &example, &when)?;
                    println!("✓ System pattern '{}' recorded", name);
                }
            }
        }
        Commands::Summary => {
            let collector = TrainingCollector::new(paths.training_dir())?;
            print_json(&collector.generate_training_summary()?)?;
        }
        Commands::Session(command) => {
            let sessions = TrainingSessions::new(TrainingCollector::new(paths.training_dir())?);
            match command {
                SessionCommand::Start { name } => {
                    let session = sessions.start(&name)?;
                    println!("✓ Session '{}' started", session.name);
                }
                SessionCommand::Status => match sessions.active()? {
                    Some(session) => print_json(&session)?,
                    None => println!("No session open"),
                },
                SessionCommand::Code {
                    file,
                    description,
                    category,
                } => {
                    let code = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    sessions.collect_code(&code, &description, &category)?;
                    println!("✓ Collected: {}", description);
                }
                SessionCommand::File {
                    path,
                    purpose,
                    patterns,
                } => {
                    sessions.collect_file(&path, &purpose, &patterns)?;
                    println!("✓ Collected file: {}", path.display());
                }
                SessionCommand::Solution {
                    problem,
                    explanation,
                    code,
                } => {
                    sessions.collect_solution(&problem, &code, &explanation)?;
                    println!("✓ Collected solution: {}", problem);
                }
                SessionCommand::Decision {
                    choice,
                    alternatives,
                    reasoning,
                } => {
                    sessions.collect_decision(&choice, &alternatives, &reasoning)?;
                    println!("✓ Collected decision: {}", choice);
                }
                SessionCommand::End => {
                    let closed = sessions.end()?;
                    println!(
                        "✓ Session '{}' complete: {} items in {} min; {} training examples total",
                        closed.record.summary.session_name,
                        closed.record.summary.items_collected,
                        closed.record.summary.duration_minutes,
                        closed.training.total_examples
                    );
                    eprintln!("Saved to {}", closed.path.display());
                }
            }
        }
        Commands::Migrate(command) => match command {
            MigrateCommand::Run => {
                let migrator = DocumentMigrator::new(create_server(&config.model_server)?, &config);
                let report = migrator.run().await?;
                println!(
                    "✓ {}/{} documents migrated ({:.1}%)",
                    report.documents_migrated,
                    report.documents_found,
                    report.success_rate * 100.0
                );
                eprintln!("Results in {}", migrator.migration_dir().display());
            }
            MigrateCommand::Review => {
                let path = ReviewGenerator::new(&paths).generate()?;
                println!("✓ {}", path.display());
            }
        },
        Commands::Foundation(command) => {
            let foundation = Foundation::new(create_server(&config.model_server)?, &config);
            match command {
                FoundationCommand::Validate => {
                    let report = foundation.validate().await?;
                    for v in &report.validations {
                        let mark = if v.status { "✓" } else { "✗" };
                        println!("{} {}: {}", mark, v.component, v.message);
                    }
                    println!("{}/{} checks passed", report.passed, report.total);
                }
                FoundationCommand::Backup => print_json(&foundation.backup()?)?,
                FoundationCommand::Setup => print_json(&foundation.setup()?)?,
            }
        }
        Commands::Project(command) => {
            let manager = ProjectManager::new(paths);
            match command {
                ProjectCommand::Status => print_json(&manager.update_status()?)?,
                ProjectCommand::Docs => {
                    println!("✓ {}", manager.write_readme()?.display());
                }
                ProjectCommand::Report => {
                    let (path, report) = manager.progress_report()?;
                    println!("{}", report);
                    eprintln!("✓ Saved to {}", path.display());
                }
                ProjectCommand::Commit { message } => {
                    if manager.commit(message.as_deref())? {
                        println!("✓ Changes committed");
                    } else {
                        eprintln!("✗ Commit failed (nothing to commit or git unavailable)");
                    }
                }
            }
        }
        Commands::Train(command) => {
            let versions = ModelVersionManager::new(paths)?;
            match command {
                TrainCommand::Status { member } => print_json(&versions.status(member)?)?,
                TrainCommand::Create {
                    member,
                    base_model,
                    notes,
                } => {
                    let base = base_model.unwrap_or_else(|| config.family.profile(member).model.clone());
                    let metadata = versions.create_version(member, &base, &notes)?;
                    println!(
                        "✓ Created {} {} from {} ({} examples)",
                        member.display_name(),
                        metadata.version,
                        metadata.base_model,
                        metadata.training_data_size
                    );
                }
                TrainCommand::Train {
                    member,
                    version,
                    epochs,
                    batch_size,
                    learning_rate,
                } => {
                    let params = TrainingParams {
                        epochs,
                        batch_size,
                        learning_rate,
                    };
                    print_json(&versions.train(member, &version, params)?)?;
                }
                TrainCommand::Validate { member, version } => {
                    let server: Arc<dyn ModelServer> = create_server(&config.model_server)?;
                    print_json(&versions.validate(member, &version, server.as_ref()).await?)?;
                }
                TrainCommand::Deploy { member, version } => {
                    versions.deploy(member, &version)?;
                    println!("✓ {} {} deployed", member.display_name(), version);
                }
                TrainCommand::Rollback { member, version } => {
                    let target = versions.rollback(member, version.as_deref())?;
                    println!("✓ {} rolled back to {}", member.display_name(), target);
                }
                TrainCommand::Dataset { member } => {
                    let (path, count) = versions.prepare_dataset(member)?;
                    println!("✓ {} examples written to {}", count, path.display());
                }
            }
        }
        Commands::Learn { scan_existing: scan } => {
            let server = create_server(&config.model_server)?;
            let learner = AutonomousLearner::new(server, &config)?;
            let (monitor, rx) = FileMonitor::start(&config.project_root)?;

            if scan {
                let queued = monitor.enqueue(scan_existing(&config.project_root, learner.filter()));
                tracing::info!(files = queued, "Existing files queued for analysis");
            }

            eprintln!("Learning from changes under {} (Ctrl-C to stop)", config.project_root.display());
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
            };
            let (path, handoff) = learner.run(rx, shutdown).await?;
            monitor.stop();
            println!(
                "✓ {} learnings captured; handoff at {}",
                handoff.session_summary.learnings_captured,
                path.display()
            );
        }
        Commands::Monitor => {
            run_monitor(&config, create_server(&config.model_server)?).await?;
        }
        Commands::Dashboard => {
            run_dashboard(&config).await?;
        }
        Commands::Metrics(command) => {
            let store = MetricsStore::open(&paths.metrics_db())?;
            match command {
                MetricsCommand::Record => {
                    let mut sampler = SystemSampler::new();
                    sampler.warm_up().await;
                    let stats = sampler.sample();
                    record_tick(&stats, &store, config.monitor.retention_hours)?;
                    println!("{}", stats.format_status());
                }
                MetricsCommand::Prune { hours } => {
                    let removed = store.prune(hours.unwrap_or(config.monitor.retention_hours))?;
                    println!("✓ Removed {} rows", removed);
                }
                MetricsCommand::History { hours } => {
                    for sample in store.history(hours)? {
                        println!("{}", serde_json::to_string(&sample)?);
                    }
                }
            }
        }
    }

    Ok(())
}
