use anyhow::Context;
use clap::Parser;
use reposync_lib::config::{AppConfig, DEFAULT_CONFIG_FILE};
use reposync_lib::error::SyncError;
use reposync_lib::logging::init_logging;
use reposync_lib::{FileRecord, SyncObserver, SyncSession};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "reposync", version, about = "Keep a backup directory in sync with a master directory")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// 不询问直接同步
    #[arg(short, long)]
    yes: bool,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

/// 控制台进度输出
struct ConsoleReporter;

impl ConsoleReporter {
    fn percent(index: usize, total: usize) -> String {
        if total == 0 {
            return "0.00%".to_string();
        }
        format!("{:.2}%", index as f64 / total as f64 * 100.0)
    }

    fn start(file: &FileRecord, index: usize, total: usize) {
        print!(
            "{} {} of {} ({})",
            file.full_path.display(),
            index,
            total,
            Self::percent(index, total)
        );
        let _ = io::stdout().flush();
    }
}

impl SyncObserver for ConsoleReporter {
    fn before_copy(&self, file: &FileRecord, index: usize, total: usize, _success: bool) {
        Self::start(file, index, total);
    }

    fn after_copy(&self, _file: &FileRecord, _index: usize, _total: usize, success: bool) {
        println!("{}", if success { " - Copied!" } else { " - Error" });
    }

    fn before_delete(&self, file: &FileRecord, index: usize, total: usize, _success: bool) {
        Self::start(file, index, total);
    }

    fn after_delete(&self, _file: &FileRecord, _index: usize, _total: usize, success: bool) {
        println!("{}", if success { " - Deleted!" } else { " - Error" });
    }
}

fn prompt_confirm(prompt: &str) -> io::Result<bool> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// 同步前的统计提示；single 模式下删除数只是提示，run 不会删除
fn preview_lines(to_copy: usize, to_delete: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if to_copy > 0 {
        lines.push(format!("{} Files will be copied!", to_copy));
    }
    if to_delete > 0 {
        lines.push(format!("{} Files will be deleted!", to_delete));
    }
    lines
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(SyncError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            println!("*{}* Not found!", cli.config.display());
            return Ok(false);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("加载配置失败: {}", cli.config.display()))
        }
    };

    init_logging(&cli.log_dir, &config.log);

    let method = match config.sync_method() {
        Ok(method) => method,
        Err(e) => {
            tracing::error!("{}", e);
            println!("Invalid Method!");
            return Ok(false);
        }
    };

    let session = SyncSession::new(
        &config.master_repository,
        &config.backup_repository,
        method,
    )
    .with_observer(ConsoleReporter);

    println!("Working:");

    let to_copy = session.files_to_copy().await.context("扫描仓库失败")?;
    let to_delete = session.files_to_delete().await.context("扫描仓库失败")?;

    for line in preview_lines(to_copy.len(), to_delete.len()) {
        println!("{}", line);
    }

    if to_copy.is_empty() && to_delete.is_empty() {
        if !session.is_master_valid() {
            println!("Master repository is not valid!");
            return Ok(false);
        }
        if !session.is_backup_valid() {
            println!("Backup repository is not valid!");
            return Ok(false);
        }
        println!("Backup repository is up to date!");
        return Ok(true);
    }

    if !cli.yes && !prompt_confirm("Do you want to continue y/n")? {
        return Ok(true);
    }

    let outcome = session.run().await.context("同步失败")?;
    println!("{}", if outcome.success { "Success!" } else { "Error!" });
    println!("{}", outcome.message);

    Ok(outcome.success)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
