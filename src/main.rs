//! kube-report CLI - cluster reports from kubectl

use anyhow::{Result, anyhow};
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use kube_report::commands::{self, Task, TaskContext};
use kube_report::config::{Params, Settings};
use kube_report::k8s::context::ContextGuard;
use kube_report::output::OutputFormat;
use kube_report::utils::errors::display_error_and_exit;
use kube_report::utils::{LogLevel, ReportError, enhance_error, logger, progress};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kube-report")]
#[command(author, version, about = "Cluster inventory, allocation, metrics and storage reports from kubectl", long_about = None)]
struct Cli {
    /// Task to run
    #[arg(short, long, value_enum, required_unless_present_any = ["print_config", "completion"])]
    task: Option<Task>,

    /// Output format (default: yaml, or defaults.output from the config file)
    #[arg(short, long, value_enum, ignore_case = true)]
    output: Option<OutputFormat>,

    /// Kubeconfig context to use for this run; the previous context is restored afterwards
    #[arg(short, long)]
    context: Option<String>,

    /// Path components kept when grouping NFS exports (0 = full path)
    #[arg(short = 'l', long)]
    nfs_level: Option<usize>,

    /// Log level: ERROR, WARN, INFO or DEBUG
    #[arg(short, long, value_enum, ignore_case = true)]
    debug: Option<LogLevel>,

    /// Custom parameter, repeatable: -p:namespace=NS, -p:selector=LABELS, -p:mount_options=OPTS
    #[arg(short = 'p', value_name = ":KEY=VALUE", action = ArgAction::Append, allow_hyphen_values = true)]
    params: Vec<String>,

    /// Path to kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Path to the settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print an example settings file and exit
    #[arg(long)]
    print_config: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum)]
    completion: Option<Shell>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit with 1; --help and --version are not errors
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logger::init(cli.debug);

    if let Err(err) = run(cli) {
        display_error_and_exit(enhance_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(shell) = cli.completion {
        return handle_completion_command(shell);
    }

    if cli.print_config {
        println!("{}", Settings::example_config()?);
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let params = Params::parse(&cli.params).map_err(|e| {
        ReportError::new(e.to_string())
            .suggest("Pass parameters as -p:key=value, e.g. -p:namespace=kube-system")
    })?;

    let task = cli.task.ok_or_else(|| anyhow!("--task is required"))?;
    let output = cli.output.unwrap_or(settings.defaults.output);
    let nfs_level = cli.nfs_level.unwrap_or(settings.defaults.nfs_level);
    let kubeconfig = cli.kubeconfig.as_deref();

    let _context = cli
        .context
        .as_deref()
        .map(|name| ContextGuard::switch(name, kubeconfig))
        .transpose()?;

    let ctx = TaskContext {
        settings: &settings,
        params: &params,
        kubeconfig,
        nfs_level,
    };

    // check-nfs draws its own progress bar
    let show_spinner = settings.behavior.show_progress && task != Task::CheckNfs;
    let spinner = progress::create_spinner(&format!("Running {}...", task), show_spinner);
    let result = commands::run(task, &ctx);
    spinner.finish_and_clear();

    println!("{}", result?.render(output)?);
    Ok(())
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kube-report", &mut io::stdout());
    Ok(())
}
