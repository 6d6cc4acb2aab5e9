//! 打开文件表（OFT）与按块缓冲的读写协议。
//!
//! 每个表项只缓冲一个块：缓冲区内容总是等于 `position / BLOCK_SIZE`
//! 对应数据块在磁盘上的内容（该块已分配时）。跨越块边界时，
//! 先把旧块写回，再装入新块，缓冲区不会同时代表两个块。

use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        bitmap::BlockBitmap,
        config::{MAX_FILE_SIZE, OFT_SIZE},
        descriptor::{self, Descriptor},
        error::{FileSystemError, Result},
    },
};

#[derive(Debug, Clone)]
pub struct OftEntry {
    buffer: Block,     // 当前块的内存副本
    position: usize,   // 文件内字节偏移
    descriptor: usize, // 对应的描述符号
}

impl OftEntry {
    /// 打开文件：位置置 0，非空文件装入第一块，空文件保持全零缓冲
    pub fn open<D: BlockDevice>(disk: &D, descriptor: usize, desc: &Descriptor) -> Result<Self> {
        let mut entry = Self {
            buffer: [0; BLOCK_SIZE],
            position: 0,
            descriptor,
        };
        if desc.length > 0 {
            entry.load(disk, desc)?;
        }
        Ok(entry)
    }

    pub fn descriptor(&self) -> usize {
        self.descriptor
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn current_block(&self) -> usize {
        self.position / BLOCK_SIZE
    }

    // 当前块已分配才写回
    fn flush<D: BlockDevice>(&self, disk: &mut D, desc: &Descriptor) -> Result<()> {
        if let Some(block_id) = desc.block(self.current_block()) {
            debug!("oft: flush descriptor {} -> block {}", self.descriptor, block_id);
            disk.write_block(block_id, &self.buffer)?;
        }
        Ok(())
    }

    // 当前块已分配才装入，否则缓冲区内容无意义（长度限制保证不会被读到）
    fn load<D: BlockDevice>(&mut self, disk: &D, desc: &Descriptor) -> Result<()> {
        if let Some(block_id) = desc.block(self.current_block()) {
            debug!("oft: load block {} -> descriptor {}", block_id, self.descriptor);
            disk.read_block(block_id, &mut self.buffer)?;
        }
        Ok(())
    }

    // 位置前进 step 字节；若恰好走到块尾，先写回旧块再装入下一块
    fn advance<D: BlockDevice>(&mut self, disk: &mut D, desc: &Descriptor, step: usize) -> Result<()> {
        if (self.position % BLOCK_SIZE) + step == BLOCK_SIZE {
            self.flush(disk, desc)?;
            self.position += step;
            self.load(disk, desc)
        } else {
            self.position += step;
            Ok(())
        }
    }

    pub fn seek<D: BlockDevice>(&mut self, disk: &mut D, desc: &Descriptor, position: usize) -> Result<()> {
        if position > desc.length {
            return Err(FileSystemError::SeekOutOfRange {
                position,
                length: desc.length,
            });
        }

        if position / BLOCK_SIZE != self.current_block() {
            self.flush(disk, desc)?;
            self.position = position;
            self.load(disk, desc)?;
        } else {
            self.position = position;
        }
        Ok(())
    }

    /// 读取至多 count 字节，到文件末尾时返回的字节数少于 count
    pub fn read<D: BlockDevice>(&mut self, disk: &mut D, desc: &Descriptor, count: usize) -> Result<Vec<u8>> {
        if self.position > desc.length {
            return Err(FileSystemError::PositionPastEnd {
                position: self.position,
                length: desc.length,
            });
        }

        let count = count.min(desc.length - self.position);
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let offset = self.position % BLOCK_SIZE;
            let step = (BLOCK_SIZE - offset).min(count - out.len());
            out.extend_from_slice(&self.buffer[offset..offset + step]);
            self.advance(disk, desc, step)?;
        }
        Ok(out)
    }

    /// 在当前位置写入 data，必要时先为文件扩充数据块。
    /// 块不足时直接失败，位图与描述符都不会被修改。
    pub fn write<D: BlockDevice>(&mut self, disk: &mut D, desc: &mut Descriptor, data: &[u8]) -> Result<()> {
        let end = self.position + data.len();
        if end > MAX_FILE_SIZE {
            return Err(FileSystemError::FileTooLarge { requested: end });
        }

        if end > desc.length {
            let mut grown = *desc;
            let needed = end.div_ceil(BLOCK_SIZE).saturating_sub(desc.allocated());
            if needed > 0 {
                let mut bitmap = BlockBitmap::load(disk)?;
                let block_ids = bitmap.find_free(needed).ok_or(FileSystemError::DiskFull {
                    needed,
                    free: bitmap.free_count(),
                })?;
                grown.add_blocks(&block_ids)?;

                bitmap.mark(&block_ids, true);
                bitmap.sync(disk)?;
                for &block_id in &block_ids {
                    disk.write_block(block_id, &[0; BLOCK_SIZE])?;
                }

                // 当前位置落在新分配的块上，缓冲区与清零后的新块保持一致
                if self.current_block() >= desc.allocated() {
                    self.buffer = [0; BLOCK_SIZE];
                }
            }

            grown.length = end;
            descriptor::write_descriptor(disk, self.descriptor, &grown)?;
            *desc = grown;
        }

        let mut written = 0;
        while written < data.len() {
            let offset = self.position % BLOCK_SIZE;
            let step = (BLOCK_SIZE - offset).min(data.len() - written);
            self.buffer[offset..offset + step].copy_from_slice(&data[written..written + step]);
            written += step;
            self.advance(disk, desc, step)?;
        }
        Ok(())
    }

    /// 写回缓冲区；位置超过已记录的长度时补写长度
    pub fn close<D: BlockDevice>(&self, disk: &mut D, desc: &mut Descriptor) -> Result<()> {
        self.flush(disk, desc)?;
        if self.position > desc.length {
            desc.length = self.position;
            descriptor::write_descriptor(disk, self.descriptor, desc)?;
        }
        Ok(())
    }
}

/// 固定容量的打开文件表，句柄即表项下标
#[derive(Debug, Default)]
pub struct OpenFileTable {
    entries: [Option<OftEntry>; OFT_SIZE],
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries = Default::default();
    }

    /// 已打开该描述符时返回其句柄
    pub fn find(&self, descriptor: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.descriptor == descriptor))
    }

    /// 放入第一个空闲表项，表满时失败
    pub fn insert(&mut self, entry: OftEntry) -> Result<usize> {
        let handle = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(FileSystemError::OpenFileTableFull)?;
        self.entries[handle] = Some(entry);
        Ok(handle)
    }

    /// 放入指定表项（目录固定占用 0 号）
    pub fn install(&mut self, handle: usize, entry: OftEntry) {
        self.entries[handle] = Some(entry);
    }

    pub fn get(&self, handle: usize) -> Result<&OftEntry> {
        self.entries
            .get(handle)
            .ok_or(FileSystemError::InvalidHandle(handle))?
            .as_ref()
            .ok_or(FileSystemError::HandleNotOpen(handle))
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut OftEntry> {
        self.entries
            .get_mut(handle)
            .ok_or(FileSystemError::InvalidHandle(handle))?
            .as_mut()
            .ok_or(FileSystemError::HandleNotOpen(handle))
    }

    pub fn remove(&mut self, handle: usize) -> Option<OftEntry> {
        self.entries.get_mut(handle).and_then(Option::take)
    }

    pub fn handles(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(handle, e)| e.as_ref().map(|_| handle))
            .collect()
    }
}
