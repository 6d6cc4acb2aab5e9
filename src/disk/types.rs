/// 每个逻辑块（Block）的大小：64 字节
/// 文件系统以“块”为最小读写单位。
pub const BLOCK_SIZE: usize = 64;

/// 磁盘中包含的块总数
pub const BLOCK_COUNT: usize = 64;

/// 磁盘镜像总大小（单位：字节），即 save_image 输出的长度
pub const IMAGE_SIZE: usize = BLOCK_SIZE * BLOCK_COUNT;

/// 定义一个逻辑块类型（每块 64 字节的字节数组）
/// 所有磁盘读写都以 Block 为单位进行。
pub type Block = [u8; BLOCK_SIZE];
