use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use mini_ufs::{disk::BLOCK_SIZE, FileSystem};
use std::{error::Error, fs::File, io::Write, path::Path};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Create(String),
    Destroy(String),
    Open(String),
    Close(usize),
    Read(usize, usize),
    Write(usize, char, usize),
    Seek(usize, usize),
    Dir,
    Init(Option<String>),
    Save(String),
    Status,
    Exit,
}

pub fn execute_command(cmd: &Command, fs: &mut FileSystem) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Create(name) => {
            fs.create(name)?;
            println!("📝 {} created", name.green());
        }
        Command::Destroy(name) => {
            fs.destroy(name)?;
            println!("❌ {} destroyed", name.red());
        }
        Command::Open(name) => {
            let handle = fs.open(name)?;
            println!("📂 {} opened, handle {}", name.cyan(), handle.to_string().bold());
        }
        Command::Close(handle) => {
            fs.close(*handle)?;
            println!("📁 handle {} closed", handle);
        }
        Command::Read(handle, count) => {
            let bytes = fs.read(*handle, *count)?;
            if bytes.len() < *count {
                println!(
                    "{}",
                    format!("(end of file after {} bytes)", bytes.len()).bright_black()
                );
            }
            println!("📖 {}", String::from_utf8_lossy(&bytes));
        }
        Command::Write(handle, ch, count) => {
            let mut buf = [0u8; 4];
            let unit = ch.encode_utf8(&mut buf).as_bytes();
            let data = unit.repeat(*count);
            fs.write(*handle, &data)?;
            println!("✏️  {} bytes written", data.len().to_string().green());
        }
        Command::Seek(handle, position) => {
            fs.seek(*handle, *position)?;
            println!("📍 position is {}", position.to_string().cyan());
        }
        Command::Dir => {
            let names = fs.list()?;
            if names.is_empty() {
                println!("{}", "(empty)".bright_black());
            }
            for name in names {
                println!("📄  {}", name);
            }
        }
        Command::Init(None) => {
            fs.init()?;
            println!("{}", "💾 disk initialized".yellow());
        }
        Command::Init(Some(path)) => match fs.load_file(path) {
            Ok(()) => println!("{}", "💾 disk restored".green()),
            Err(e) => println!(
                "{} {}",
                "💾 disk initialized".yellow(),
                format!("({})", e).bright_black()
            ),
        },
        Command::Save(path) => save_image(fs, path)?,
        Command::Status => {
            let usage = fs.usage()?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {}\n",
                "📊 Disk Info".bright_yellow().bold(),
                "Free blocks".blue(),
                usage.free_blocks,
                "Free descriptors".blue(),
                usage.free_descriptors,
                "Open files".blue(),
                usage.open_files
            );
        }
        Command::Exit => println!("{}", "👋 Exiting MiniUFS shell...".yellow().bold()),
    }

    Ok(())
}

// 镜像写入宿主机文件；覆盖已有文件前先确认
fn save_image(fs: &mut FileSystem, path: &str) -> Result<(), Box<dyn Error>> {
    if Path::new(path).exists()
        && !Confirm::new()
            .with_prompt(format!("{} exists, overwrite?", path))
            .default(true)
            .interact()?
    {
        println!("{}", "save cancelled".bright_black());
        return Ok(());
    }

    let image = fs.save_image()?;
    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.green/black}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );

    let mut file = File::create(path)?;
    for block in image.chunks(BLOCK_SIZE) {
        file.write_all(block)?;
        pb.inc(block.len() as u64);
    }
    file.sync_all()?;
    pb.finish_with_message("✅ disk saved");
    Ok(())
}

fn print_help() {
    println!("{}", "📘 MiniUFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  cr <name>            Create file (name up to 4 bytes)
  de <name>            Destroy file
  op <name>            Open file, prints its handle
  cl <h>               Close handle
  rd <h> <count>       Read up to <count> bytes
  wr <h> <char> <n>    Write <char> repeated <n> times
  sk <h> <pos>         Move handle position
  dr                   List directory
  in [file]            Initialize disk, or restore it from <file>
  sv <file>            Save disk image to <file>
  st                   Show free blocks / descriptors
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}
