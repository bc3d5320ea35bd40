use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use rexam::config::manager::{
    CONTAINER_HOME_DEFAULT, CONTAINER_HOME_KEY, DIST_URL_DEFAULT, DIST_URL_KEY, WORK_DIR_DEFAULT,
    WORK_DIR_KEY,
};
use rexam::config::{ConfigLoader, ConfigurationManager, RexamConfig};
use rexam::container::{ContainerEvent, ContainerFactory, Journal};
use rexam::history::{self, HistoryStorage};
use rexam::listener::{CollectingListener, ConsoleReporter, ReportingListener, TestSummary};
use rexam::probe::{ProbeBuilder, SuiteManifest};
use rexam::reactor::{ReactorOptions, ReactorStrategy, create_reactor};
use rexam::runner::{SuiteRunner, TestPlan};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 在运行时容器中执行套件清单
    Run {
        /// 套件清单 (TOML)
        manifest: PathBuf,

        /// 配置文件路径，缺省时自动查找 rexam.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 覆盖配置中的 reactor 策略
        #[arg(short, long, value_enum)]
        strategy: Option<ReactorStrategy>,

        /// 显示每个结果所在的容器
        #[arg(short, long)]
        verbose: bool,

        /// 不写入运行历史
        #[arg(long)]
        no_history: bool,
    },

    /// 不启动真实运行时，打印容器生命周期
    Plan {
        manifest: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        strategy: Option<ReactorStrategy>,

        /// 覆盖容器数量
        #[arg(long)]
        containers: Option<usize>,
    },

    /// 显示解析后的配置
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 查看最近的运行记录
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

fn load_suite(manifest: &Path) -> Result<(SuiteManifest, TestPlan)> {
    let manifest = SuiteManifest::load_from_path(manifest)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", manifest.display(), e))?;
    let plan = TestPlan::from_manifest(&manifest);
    if plan.is_empty() {
        anyhow::bail!("probe '{}' declares no executable tests", manifest.probe.name);
    }
    Ok((manifest, plan))
}

/// 执行套件，全部通过时返回 true
pub async fn run(
    manifest: &Path,
    config: Option<&Path>,
    strategy: Option<ReactorStrategy>,
    verbose: bool,
    no_history: bool,
) -> Result<bool> {
    let config = ConfigLoader::load(config)?;
    let strategy = strategy.unwrap_or(config.reactor.strategy);
    let (manifest, plan) = load_suite(manifest)?;

    let cm = ConfigurationManager::new(config.properties.clone());
    let containers = ContainerFactory::new(config.container.clone()).create(&cm)?;
    let container_count = containers.len();

    let probe = ProbeBuilder::from_manifest(manifest);
    let probe_name = probe.name().to_string();
    let reactor = create_reactor(
        strategy,
        containers,
        vec![probe],
        ReactorOptions::from(&config.reactor),
    )?;

    let listener = ReportingListener::new(ConsoleReporter::new(verbose));
    listener
        .reporter()
        .print_header(&probe_name, &strategy.to_string(), plan.executable_count());

    let started_at = Utc::now();
    let report = SuiteRunner::new(reactor).run(&plan, &listener).await;

    let results = listener.results();
    let mut summary = TestSummary::from_results(&results);
    summary.total_duration = report.duration;
    listener.reporter().print_summary(&summary);

    if !no_history {
        let record = history::build_record(
            &probe_name,
            strategy,
            container_count,
            started_at,
            report.duration,
            &results,
        );
        history::record_run(&HistoryStorage::new(), &record);
    }

    Ok(summary.is_success())
}

pub async fn plan(
    manifest: &Path,
    config: Option<&Path>,
    strategy: Option<ReactorStrategy>,
    containers: Option<usize>,
) -> Result<()> {
    let mut config = ConfigLoader::load(config)?;
    if let Some(count) = containers {
        config.container.count = count;
    }
    let strategy = strategy.unwrap_or(config.reactor.strategy);
    let (manifest, plan) = load_suite(manifest)?;

    let journal = Journal::new();
    let containers = ContainerFactory::new(config.container.clone()).create_dry_run(&journal)?;
    let reactor = create_reactor(
        strategy,
        containers,
        vec![ProbeBuilder::from_manifest(manifest)],
        ReactorOptions::from(&config.reactor),
    )?;

    let listener = CollectingListener::new();
    SuiteRunner::new(reactor).run(&plan, &listener).await;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Container", "Event"]);
    for (index, entry) in journal.entries().iter().enumerate() {
        let color = match &entry.event {
            ContainerEvent::Started | ContainerEvent::Stopped => Color::Cyan,
            ContainerEvent::Called(_) => Color::Green,
            _ => Color::White,
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&entry.container),
            Cell::new(&entry.event).fg(color),
        ]);
    }

    println!(
        "\n{} reactor, {} container(s), {} test(s)\n",
        strategy,
        config.container.count,
        plan.executable_count()
    );
    println!("{}", table);
    Ok(())
}

pub fn show_config(config: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(config)?;
    print_config(&config, &ConfigurationManager::new(config.properties.clone()));
    Ok(())
}

fn print_config(config: &RexamConfig, cm: &ConfigurationManager) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Key", "Value", "Env"]);

    let builtin = [
        ("reactor.strategy", config.reactor.strategy.to_string()),
        ("container.runtime", config.container.runtime.to_string()),
        ("container.count", config.container.count.to_string()),
        ("container.name_prefix", config.container.name_prefix.clone()),
    ];
    for (key, value) in builtin {
        table.add_row(vec![Cell::new(key), Cell::new(value), Cell::new("")]);
    }

    let mut properties = cm.resolved();
    for (key, default) in [
        (CONTAINER_HOME_KEY, CONTAINER_HOME_DEFAULT),
        (DIST_URL_KEY, DIST_URL_DEFAULT),
        (WORK_DIR_KEY, WORK_DIR_DEFAULT),
    ] {
        properties
            .entry(key.to_string())
            .or_insert_with(|| cm.get_property_or(key, default));
    }
    for (key, value) in properties {
        table.add_row(vec![
            Cell::new(&key),
            Cell::new(value),
            Cell::new(ConfigurationManager::env_name(&key)).fg(Color::DarkGrey),
        ]);
    }

    println!("{}", table);
}

pub fn show_history(limit: usize) -> Result<()> {
    history::printer::list_history(&HistoryStorage::new(), limit)?;
    Ok(())
}
