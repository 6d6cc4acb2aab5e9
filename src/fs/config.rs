use crate::disk::{BLOCK_COUNT, BLOCK_SIZE};

pub const BITMAP_BLOCK_ID: usize = 0;
pub const DESCRIPTOR_TABLE_START_BLOCK_ID: usize = 1;

// 每个描述符 4 个 i32 = 16 字节，一个 64B 块可以存 4 个描述符
pub const DESCRIPTOR_SIZE: usize = 16;
pub const DESCRIPTORS_PER_BLOCK: usize = BLOCK_SIZE / DESCRIPTOR_SIZE;

// 描述符表占用块 1..=6
pub const DESCRIPTOR_TABLE_BLOCKS: usize = 6;
pub const DESCRIPTOR_COUNT: usize = DESCRIPTOR_TABLE_BLOCKS * DESCRIPTORS_PER_BLOCK;

// 数据区的起始块号（K）
pub const DATA_START: usize = DESCRIPTOR_TABLE_START_BLOCK_ID + DESCRIPTOR_TABLE_BLOCKS;
pub const DATA_BLOCK_COUNT: usize = BLOCK_COUNT - DATA_START;

// 每个文件最多 3 个数据块
pub const MAX_FILE_BLOCKS: usize = 3;
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

pub const OFT_SIZE: usize = 4;

// 目录项：4 字节文件名 + 4 字节描述符号
pub const NAME_LEN: usize = 4;
pub const DIR_ENTRY_SIZE: usize = 8;

// 目录本身就是 0 号文件，并且总是占用 0 号打开文件表项
pub const DIRECTORY_DESCRIPTOR: usize = 0;
pub const DIRECTORY_HANDLE: usize = 0;
