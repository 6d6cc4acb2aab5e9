//! mini-ufs：一个运行在内存虚拟块设备上的经典 UNIX 风格文件系统。
//!
//! 磁盘布局（64 块 × 64 字节）：
//! - 块 0：块位图
//! - 块 1..=6：描述符表，每块 4 个描述符
//! - 块 7..：数据块
//!
//! 目录本身是 0 号文件，目录项通过打开文件表像普通文件一样读写。

pub mod disk;
pub mod fs;

pub use disk::{BlockDevice, RamDisk};
pub use fs::{
    descriptor::Descriptor,
    error::{ErrorKind, FileSystemError, Result},
    FileName, FileSystem, Usage,
};
