use crate::listener::types::{TestOutcome, TestResult, TestSummary};
use crate::listener::{CollectingListener, TestListener};
use crate::probe::TestDescription;
use colored::Colorize;

/// 控制台输出
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// 打印测试开始
    pub fn print_header(&self, probe: &str, strategy: &str, total: usize) {
        println!(
            "\nRunning {} tests from probe {} ({} reactor)...\n",
            total,
            probe.bold(),
            strategy
        );
    }

    /// 打印单个测试结果
    pub fn print_result(&self, result: &TestResult) {
        let (symbol, label) = match &result.outcome {
            TestOutcome::Passed => ("✓".green(), "passed".green()),
            TestOutcome::Failed(_) => ("✗".red(), "failed".red()),
            TestOutcome::Error(_) => ("!".yellow(), "error".yellow()),
        };

        let container_part = match &result.container {
            Some(name) if self.verbose => format!(" [{}]", name).dimmed().to_string(),
            _ => String::new(),
        };

        println!(
            " {} {}{} {} ({}ms)",
            symbol,
            result.description.to_string().cyan(),
            container_part,
            label,
            result.duration.as_millis()
        );

        if let Some(cause) = result.outcome.cause() {
            for line in cause.lines() {
                println!("     {}", line.red());
            }
        }
    }

    /// 打印测试摘要
    pub fn print_summary(&self, summary: &TestSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.is_success() {
            println!(
                "  {}: {} passed, {} total",
                "Tests".bold(),
                summary.passed.to_string().green(),
                summary.total
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} errors, {} total",
                "Tests".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.errors.to_string().yellow(),
                summary.total
            );
        }

        println!(
            "  {}: {:.3}s",
            "Duration".bold(),
            summary.total_duration.as_secs_f64()
        );
        println!();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// 边收集边打印的监听器
pub struct ReportingListener {
    reporter: ConsoleReporter,
    collected: CollectingListener,
}

impl ReportingListener {
    pub fn new(reporter: ConsoleReporter) -> Self {
        Self {
            reporter,
            collected: CollectingListener::new(),
        }
    }

    pub fn reporter(&self) -> &ConsoleReporter {
        &self.reporter
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.collected.results()
    }
}

impl TestListener for ReportingListener {
    fn test_started(&self, description: &TestDescription) {
        tracing::debug!(test = %description, "Test started");
    }

    fn test_finished(&self, result: &TestResult) {
        self.reporter.print_result(result);
        self.collected.test_finished(result);
    }
}
