pub mod command;
pub mod parse;

use crate::{
    cli::Cli,
    shell::{
        command::{execute_command, Command},
        parse::parse_command,
    },
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use mini_ufs::FileSystem;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{io::stdout, path::PathBuf};

const COMMANDS: [&str; 13] = [
    "help", "cr", "de", "op", "cl", "rd", "wr", "sk", "dr", "in", "sv", "st", "exit",
];

pub fn start_shell(cli: &Cli) {
    if !cli.quiet {
        boot_banner();
    }

    let mut fs = match FileSystem::new() {
        Ok(fs) => fs,
        Err(e) => {
            println!("{} {}", "❌ Error:".red().bold(), e);
            return;
        }
    };

    if let Some(image) = &cli.image {
        match fs.load_file(image) {
            Ok(()) => println!("{} {}", "💾 disk restored from".green(), image.display()),
            Err(e) => println!("{} {}", "💾 disk initialized:".yellow(), e),
        }
    }

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".miniufs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(cli.history, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("shell history disabled: {}", e),
    }

    // 命令补全
    let completer = DefaultCompleter::new_with_wordlen(
        COMMANDS.iter().map(|c| c.to_string()).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!("{}@{}", username, hostname)),
        DefaultPromptSegment::Basic("MiniUFS".to_string()),
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniUFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 启动横幅
fn boot_banner() {
    let mut stdout = stdout();

    if let Err(e) = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print("Welcome to MiniUFS v0.1.0\n"),
        ResetColor
    ) {
        log::debug!("banner skipped: {}", e);
    }
    println!(
        "{}",
        "64 blocks × 64 bytes · 24 descriptors · 4 open files".bright_black()
    );
}
