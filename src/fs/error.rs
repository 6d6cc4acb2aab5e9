use std::fmt;

/// 错误分类，调用方据此区分失败原因，而不必匹配具体变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,  // 参数非法，未触碰持久状态
    Capacity,    // 资源不足，状态保持不变
    NotFound,    // 名字或句柄不存在
    ImageFormat, // 镜像格式错误，已回退为空文件系统
    Io,          // 宿主机文件读写失败
}

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    Io(std::io::Error),                                // 宿主机 I/O 错误
    Encoding(bincode::Error),                          // 记录编解码失败
    BlockOutOfRange(usize),                            // 块号越界
    InvalidDescriptor(usize),                          // 描述符号越界
    InvalidName(String),                               // 文件名非法
    InvalidHandle(usize),                              // 句柄越界或不可用
    SeekOutOfRange { position: usize, length: usize }, // seek 超过文件长度
    PositionPastEnd { position: usize, length: usize }, // 读位置已越过文件末尾
    NoFreeDescriptor,                                  // 描述符已满
    OpenFileTableFull,                                 // 打开文件表已满
    DiskFull { needed: usize, free: usize },           // 数据块不足
    FileTooLarge { requested: usize },                 // 超过 3 块上限
    DirectoryFull,                                     // 目录文件已满
    AlreadyExists(String),                             // 文件已存在
    NotFound(String),                                  // 文件不存在
    HandleNotOpen(usize),                              // 句柄未打开
    BadImageSize { expected: usize, actual: usize },   // 镜像长度不对
    Corrupted(String),                                 // 镜像内容损坏
}

impl FileSystemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidName(_)
            | Self::InvalidHandle(_)
            | Self::InvalidDescriptor(_)
            | Self::BlockOutOfRange(_)
            | Self::SeekOutOfRange { .. }
            | Self::PositionPastEnd { .. }
            | Self::AlreadyExists(_) => ErrorKind::Validation,
            Self::NoFreeDescriptor
            | Self::OpenFileTableFull
            | Self::DiskFull { .. }
            | Self::FileTooLarge { .. }
            | Self::DirectoryFull => ErrorKind::Capacity,
            Self::NotFound(_) | Self::HandleNotOpen(_) => ErrorKind::NotFound,
            Self::Encoding(_) | Self::BadImageSize { .. } | Self::Corrupted(_) => {
                ErrorKind::ImageFormat
            }
        }
    }
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::Io(e)
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::Encoding(e)
    }
}

// 实现 Display trait，用于打印错误信息
impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Host I/O error: {}", e),
            Self::Encoding(e) => write!(f, "Record encoding error: {}", e),
            Self::BlockOutOfRange(id) => write!(f, "Block index out of range: {}", id),
            Self::InvalidDescriptor(idx) => write!(f, "Descriptor index out of range: {}", idx),
            Self::InvalidName(name) => write!(f, "Invalid file name: {:?}", name),
            Self::InvalidHandle(h) => write!(f, "Invalid handle: {}", h),
            Self::SeekOutOfRange { position, length } => write!(
                f,
                "Seek position {} is beyond end of file (length {})",
                position, length
            ),
            Self::PositionPastEnd { position, length } => write!(
                f,
                "Position {} is past end of file (length {})",
                position, length
            ),
            Self::NoFreeDescriptor => write!(f, "No free file descriptor available"),
            Self::OpenFileTableFull => write!(f, "Open file table is full"),
            Self::DiskFull { needed, free } => write!(
                f,
                "Disk space is full: {} block(s) needed, {} free",
                needed, free
            ),
            Self::FileTooLarge { requested } => {
                write!(f, "File would grow to {} bytes, exceeding the maximum", requested)
            }
            Self::DirectoryFull => write!(f, "Directory is full"),
            Self::AlreadyExists(name) => write!(f, "File already exists: {}", name),
            Self::NotFound(name) => write!(f, "File not found: {}", name),
            Self::HandleNotOpen(h) => write!(f, "Handle is not open: {}", h),
            Self::BadImageSize { expected, actual } => write!(
                f,
                "Disk image must be {} bytes, got {}",
                expected, actual
            ),
            Self::Corrupted(desc) => write!(f, "File system corrupted: {}", desc),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encoding(e) => Some(&**e),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
