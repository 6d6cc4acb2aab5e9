use crate::{disk::types::Block, fs::error::Result};

/// 虚拟块设备：固定数量、固定大小的块，只支持整块读写，
/// 以及整盘镜像的导入导出。
pub trait BlockDevice {
    fn num_blocks(&self) -> usize;
    fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<()>;
    fn write_block(&mut self, block_id: usize, buf: &Block) -> Result<()>;

    /// 整盘清零
    fn clear(&mut self);

    /// 用一段字节替换整个磁盘，长度必须恰好等于块数 × 块大小
    fn load_image(&mut self, image: &[u8]) -> Result<()>;

    /// 按块号顺序原样导出整个磁盘（块 0 在前）
    fn save_image(&self) -> Vec<u8>;
}
