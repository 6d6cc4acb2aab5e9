use crate::{
    disk::{
        block_device::BlockDevice,
        types::{Block, BLOCK_COUNT, BLOCK_SIZE, IMAGE_SIZE},
    },
    fs::error::{FileSystemError, Result},
};

/// 内存中的虚拟磁盘，L 个 B 字节的块
#[derive(Debug, Clone)]
pub struct RamDisk {
    blocks: Vec<Block>,
}

impl RamDisk {
    pub fn new() -> Self {
        Self {
            blocks: vec![[0; BLOCK_SIZE]; BLOCK_COUNT],
        }
    }

    fn check(&self, block_id: usize) -> Result<()> {
        if block_id >= self.blocks.len() {
            return Err(FileSystemError::BlockOutOfRange(block_id));
        }
        Ok(())
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<()> {
        self.check(block_id)?;
        buf.copy_from_slice(&self.blocks[block_id]);
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &Block) -> Result<()> {
        self.check(block_id)?;
        self.blocks[block_id].copy_from_slice(buf);
        Ok(())
    }

    fn clear(&mut self) {
        for block in self.blocks.iter_mut() {
            block.fill(0);
        }
    }

    fn load_image(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != IMAGE_SIZE {
            return Err(FileSystemError::BadImageSize {
                expected: IMAGE_SIZE,
                actual: image.len(),
            });
        }

        // 长度校验通过后才覆盖，失败时原磁盘内容不变
        for (block, chunk) in self.blocks.iter_mut().zip(image.chunks_exact(BLOCK_SIZE)) {
            block.copy_from_slice(chunk);
        }
        Ok(())
    }

    fn save_image(&self) -> Vec<u8> {
        let mut image = Vec::with_capacity(IMAGE_SIZE);
        for block in &self.blocks {
            image.extend_from_slice(block);
        }
        image
    }
}
