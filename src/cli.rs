use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mini-ufs", about = "Interactive shell over an in-memory UNIX-style file system")]
pub struct Cli {
    /// Disk image restored at startup
    #[arg(long, short)]
    pub image: Option<PathBuf>,

    /// Skip the boot banner
    #[arg(long, short)]
    pub quiet: bool,

    /// Number of shell history lines kept on disk
    #[arg(long, default_value_t = 100)]
    pub history: usize,
}
