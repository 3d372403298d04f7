//! rsclearurls 命令行入口：检测命令行传入的链接并输出报告

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rsclearurls::{ConfigManager, LinkCandidate, LocalFileSource, Report, TrackingDetector};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rsclearurls", version, about = "Detect tracking parameters in links using ClearURLs rules")]
struct Cli {
    /// 待检测的链接
    #[arg(required = true)]
    urls: Vec<String>,

    /// 使用本地规则文件代替远程规则
    #[arg(long, value_name = "PATH")]
    rules_file: Option<PathBuf>,

    /// 远程规则地址
    #[arg(long, value_name = "URL")]
    rules_url: Option<String>,

    /// 拉取超时（秒）
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// 以 JSON 输出报告
    #[arg(long)]
    json: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ConfigManager::custom().http_timeout(cli.timeout);
    if let Some(url) = &cli.rules_url {
        builder = builder.rules_url(url.clone());
    }
    let config = builder.build();

    let detector = match &cli.rules_file {
        Some(path) => TrackingDetector::with_source(Arc::new(LocalFileSource::new(path)), &config),
        None => TrackingDetector::new(&config).context("failed to build HTTP client")?,
    };

    let links: Vec<LinkCandidate> = cli.urls.iter().map(LinkCandidate::new).collect();
    let report = detector.inspect(&links).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &Report) {
    if report.is_empty() {
        println!("No tracking detected.");
        return;
    }

    for entry in report.iter() {
        println!("{}", entry.url);
        for complaint in &entry.complaints {
            println!("  - {}", complaint);
        }
    }
}
