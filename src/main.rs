use clap::{Arg, Command};
use log::LevelFilter;
use scamscan::analyzer::ThreatAnalyzer;
use scamscan::config::Config;
use scamscan::pipeline::AnalysisPipeline;
use scamscan::report::{SecurityAnalysis, ThreatSeverity};
use std::io::Read;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("scamscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Pattern-based scam and phishing text analyzer")
        .long_about(
            "Scans free text for social-engineering, financial-fraud, and \
             phishing indicators, scores it 0-100, and reports matched \
             patterns, threats with mitigations, and recommendations. \
             Optionally cross-checks embedded URLs against a reputation feed.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/scamscan.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("text")
                .short('t')
                .long("text")
                .value_name("TEXT")
                .help("Analyze the given text")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Analyze the contents of a file (reads stdin when neither --text nor --file is given)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("with-intel")
                .long("with-intel")
                .help("Also check embedded URLs against the reputation feed")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit the report as JSON instead of a summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match Config::generate(generate_path) {
            Ok(()) => {
                println!("Default configuration written to: {generate_path}");
                return;
            }
            Err(e) => {
                eprintln!("Error generating configuration: {e:#}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Configuration OK: {config_path}");
        println!(
            "  custom patterns: {}",
            config.analyzer.custom_patterns.len()
        );
        println!("  reputation feed: {}", config.intel.feed_url);
        return;
    }

    let content = match read_content(&matches) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading input: {e:#}");
            process::exit(1);
        }
    };

    let analysis = if matches.get_flag("with-intel") {
        match AnalysisPipeline::new(config) {
            Ok(pipeline) => pipeline.analyze(&content).await,
            Err(e) => {
                eprintln!("Error building analysis pipeline: {e:#}");
                process::exit(1);
            }
        }
    } else {
        match ThreatAnalyzer::new(config.analyzer) {
            Ok(analyzer) => analyzer.analyze(&content),
            Err(e) => {
                eprintln!("Error building analyzer: {e:#}");
                process::exit(1);
            }
        }
    };

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                process::exit(1);
            }
        }
    } else {
        print_report(&analysis);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::load(path)
    } else {
        log::debug!("config file {path} not found, using defaults");
        Ok(Config::default())
    }
}

fn read_content(matches: &clap::ArgMatches) -> anyhow::Result<String> {
    if let Some(text) = matches.get_one::<String>("text") {
        return Ok(text.clone());
    }
    if let Some(file) = matches.get_one::<String>("file") {
        return std::fs::read_to_string(file)
            .map_err(|e| anyhow::anyhow!("failed to read {file}: {e}"));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
    Ok(buffer)
}

fn print_report(analysis: &SecurityAnalysis) {
    println!(
        "Score: {:.0}/100 ({:?})",
        analysis.overall_score, analysis.risk_level
    );

    if analysis.threats.is_empty() {
        println!("No threats detected.");
    } else {
        println!();
        println!("Threats:");
        for threat in &analysis.threats {
            let marker = match threat.severity {
                ThreatSeverity::Danger => "!!",
                ThreatSeverity::Warning => " !",
                ThreatSeverity::Info => "  ",
            };
            println!(
                "  {marker} {} (confidence {:.0}%)",
                threat.description,
                threat.confidence * 100.0
            );
            println!("       {}", threat.mitigation);
        }
    }

    if !analysis.patterns.is_empty() {
        println!();
        println!("Matched patterns:");
        for pattern in &analysis.patterns {
            println!(
                "  - {} x{} (risk {:.0})",
                pattern.label, pattern.occurrences, pattern.risk_contribution
            );
        }
    }

    println!();
    println!("Recommendations:");
    for recommendation in &analysis.recommendations {
        println!("  * {recommendation}");
    }
}
