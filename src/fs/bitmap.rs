use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_COUNT, BLOCK_SIZE},
    fs::{
        config::{BITMAP_BLOCK_ID, DATA_START},
        error::Result,
    },
};

/// 块位图，整块存放在 0 号块中，每个 bit 表示一个块是否被使用。
/// 第 i 块对应第 i/8 字节的第 i%8 位（低位在前）。
#[derive(Debug, Clone)]
pub struct BlockBitmap {
    bits: Block,
}

impl BlockBitmap {
    /// 格式化时的位图：位图块与描述符表块永久占用
    pub fn formatted() -> Self {
        let mut bitmap = Self {
            bits: [0; BLOCK_SIZE],
        };
        for block_id in 0..DATA_START {
            bitmap.set(block_id, true);
        }
        bitmap
    }

    // 从磁盘加载位图
    pub fn load<D: BlockDevice>(disk: &D) -> Result<Self> {
        let mut bits = [0; BLOCK_SIZE];
        disk.read_block(BITMAP_BLOCK_ID, &mut bits)?;
        Ok(Self { bits })
    }

    // 将位图写回磁盘
    pub fn sync<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        disk.write_block(BITMAP_BLOCK_ID, &self.bits)
    }

    pub fn is_used(&self, block_id: usize) -> bool {
        let byte_index = block_id / 8;
        let bit_index = block_id % 8;
        self.bits[byte_index] & (1 << bit_index) != 0
    }

    fn set(&mut self, block_id: usize, used: bool) {
        let byte_index = block_id / 8;
        let bit_index = block_id % 8;
        if used {
            self.bits[byte_index] |= 1 << bit_index;
        } else {
            self.bits[byte_index] &= !(1 << bit_index);
        }
    }

    /// 从数据区开头线性扫描，返回前 n 个空闲块号（升序）。
    /// 不足 n 个时返回 None，位图本身不被修改。
    /// 扫描从 DATA_START 开始，0 号块永远不会被分配出去，
    /// 所以 0 可以安全地作为“描述符未使用”的标记。
    pub fn find_free(&self, n: usize) -> Option<Vec<usize>> {
        let found: Vec<usize> = (DATA_START..BLOCK_COUNT)
            .filter(|&block_id| !self.is_used(block_id))
            .take(n)
            .collect();
        (found.len() == n).then_some(found)
    }

    pub fn mark(&mut self, block_ids: &[usize], used: bool) {
        for &block_id in block_ids {
            debug_assert!(block_id >= DATA_START, "reserved block {block_id}");
            self.set(block_id, used);
        }
        debug!("bitmap: mark {:?} used={}", block_ids, used);
    }

    pub fn free_count(&self) -> usize {
        (DATA_START..BLOCK_COUNT)
            .filter(|&block_id| !self.is_used(block_id))
            .count()
    }

    /// 保留块（位图块与描述符表块）是否都已置位
    pub fn reserved_intact(&self) -> bool {
        (0..DATA_START).all(|block_id| self.is_used(block_id))
    }
}
