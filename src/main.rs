use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::process;
use tokio::io::AsyncBufReadExt;

use voxchat::cli::Args;
use voxchat::command::{classify, CommandKind};
use voxchat::config::Config;
use voxchat::orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };

    if config.verbose {
        eprintln!("{}", format!("[vox] Gateway: {}", config.gateway_url).dimmed());
        eprintln!(
            "{}",
            format!("[vox] Model: {} via {}", config.model, config.api_endpoint).dimmed()
        );
        eprintln!(
            "{}",
            format!("[vox] Max turns per response: {}", config.max_turns).dimmed()
        );
    }

    println!("{}", format!("Connecting to {}...", config.gateway_url).cyan());

    // Connect failures surface as a one-shot status message, before any
    // streaming begins.
    let orchestrator = match Orchestrator::connect(&config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };

    println!(
        "{}",
        format!("Connected. {} tools available.", orchestrator.tool_count()).green()
    );
    println!(
        "{}",
        "Type a message, '/echo <text>', '/vc <command>', '/reset', or '/quit'.".dimmed()
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }
        if input == "/reset" {
            orchestrator.reset_history().await;
            println!("{}", "Conversation history cleared.".green());
            continue;
        }

        match classify(input) {
            CommandKind::Echo(text) => {
                orchestrator.speak(&text);
                println!("{}", format!("Spoke: {}", text).cyan());
            }
            CommandKind::VoiceCommand(text) => {
                let corrected = orchestrator.correct(&text).await;
                println!("{}", format!("'{}' -> '{}'", text, corrected).cyan());
            }
            CommandKind::Chat(text) => {
                let mut fragments = orchestrator.stream_response(&text, config.max_turns);
                while let Some(fragment) = fragments.recv().await {
                    print!("{}", fragment);
                    let _ = io::stdout().flush();
                }
                println!();
            }
        }
    }
}
