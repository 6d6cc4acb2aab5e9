use std::{collections::HashSet, path::Path};

use log::{info, warn};

use crate::{
    disk::{BlockDevice, RamDisk, BLOCK_SIZE, IMAGE_SIZE},
    fs::{
        bitmap::BlockBitmap,
        config::{
            DESCRIPTOR_COUNT, DIRECTORY_DESCRIPTOR, DIRECTORY_HANDLE, DIR_ENTRY_SIZE, OFT_SIZE,
        },
        descriptor::{Descriptor, DescriptorSlot},
        error::{FileSystemError, Result},
        oft::{OftEntry, OpenFileTable},
    },
};

pub use directory::FileName;

pub mod bitmap;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod oft;

/// 空间使用情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub free_blocks: usize,
    pub free_descriptors: usize,
    pub open_files: usize, // 不含目录自身
}

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = RamDisk> {
    disk: D,            // 底层块设备
    oft: OpenFileTable, // 打开文件表，0 号固定为目录
}

impl FileSystem<RamDisk> {
    /// 在新的内存磁盘上初始化一个空文件系统
    pub fn new() -> Result<Self> {
        Self::with_device(RamDisk::new())
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn with_device(disk: D) -> Result<Self> {
        if disk.num_blocks() * BLOCK_SIZE != IMAGE_SIZE {
            return Err(FileSystemError::BadImageSize {
                expected: IMAGE_SIZE,
                actual: disk.num_blocks() * BLOCK_SIZE,
            });
        }

        let mut fs = Self {
            disk,
            oft: OpenFileTable::new(),
        };
        fs.init()?;
        Ok(fs)
    }

    /// 格式化：清空磁盘，写入位图与目录描述符，打开目录
    pub fn init(&mut self) -> Result<()> {
        self.disk.clear();
        self.oft.clear();

        BlockBitmap::formatted().sync(&mut self.disk)?;
        descriptor::write_descriptor(&mut self.disk, DIRECTORY_DESCRIPTOR, &Descriptor::empty())?;
        self.open_directory()?;

        info!("file system initialized");
        Ok(())
    }

    fn open_directory(&mut self) -> Result<()> {
        let desc = descriptor::read_descriptor(&self.disk, DIRECTORY_DESCRIPTOR)?;
        let entry = OftEntry::open(&self.disk, DIRECTORY_DESCRIPTOR, &desc)?;
        self.oft.install(DIRECTORY_HANDLE, entry);
        Ok(())
    }

    /// 用镜像替换整个磁盘。镜像非法时回退为新初始化的空文件系统，并返回原因
    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        match self.restore(image) {
            Ok(()) => {
                info!("disk restored from {} byte image", image.len());
                Ok(())
            }
            Err(e) => {
                warn!("rejecting disk image ({}), initializing a fresh disk", e);
                self.init()?;
                Err(e)
            }
        }
    }

    fn restore(&mut self, image: &[u8]) -> Result<()> {
        self.oft.clear();
        self.disk.load_image(image)?;
        self.verify_layout()?;
        self.open_directory()?;
        self.verify_directory()
    }

    // 位图保留位、描述符字段、块引用的一致性
    fn verify_layout(&self) -> Result<()> {
        let bitmap = BlockBitmap::load(&self.disk)?;
        if !bitmap.reserved_intact() {
            return Err(FileSystemError::Corrupted(
                "metadata blocks are not marked in the bitmap".to_string(),
            ));
        }

        let mut referenced = HashSet::new();
        for index in 0..DESCRIPTOR_COUNT {
            let desc = match descriptor::read_slot(&self.disk, index)? {
                DescriptorSlot::Free if index == DIRECTORY_DESCRIPTOR => {
                    return Err(FileSystemError::Corrupted(
                        "directory descriptor is free".to_string(),
                    ))
                }
                DescriptorSlot::Free => continue,
                DescriptorSlot::Used(desc) => desc,
            };

            // 已分配的块必须是连续前缀，且块数恰好覆盖文件长度
            let gap = desc.blocks.windows(2).any(|w| w[0].is_none() && w[1].is_some());
            if gap || desc.allocated() != desc.length.div_ceil(BLOCK_SIZE) {
                return Err(FileSystemError::Corrupted(format!(
                    "descriptor {}: length {} does not match blocks {:?}",
                    index, desc.length, desc.blocks
                )));
            }
            for block_id in desc.data_blocks() {
                if !bitmap.is_used(block_id) || !referenced.insert(block_id) {
                    return Err(FileSystemError::Corrupted(format!(
                        "descriptor {}: block {} is unmarked or shared",
                        index, block_id
                    )));
                }
            }
        }
        Ok(())
    }

    // 目录长度按记录对齐；每条记录有名字、指向正在使用的描述符，且名字与描述符都不重复
    fn verify_directory(&mut self) -> Result<()> {
        let dir = descriptor::read_descriptor(&self.disk, DIRECTORY_DESCRIPTOR)?;
        if dir.length % DIR_ENTRY_SIZE != 0 {
            return Err(FileSystemError::Corrupted(format!(
                "directory length {} is not a multiple of {}",
                dir.length, DIR_ENTRY_SIZE
            )));
        }

        let mut names = HashSet::new();
        let mut indices = HashSet::new();
        for (name, index) in self.listed_entries()? {
            let in_use = match index {
                Some(index) => {
                    index != DIRECTORY_DESCRIPTOR
                        && index < DESCRIPTOR_COUNT
                        && descriptor::read_slot(&self.disk, index)? != DescriptorSlot::Free
                }
                None => false,
            };
            if !in_use {
                return Err(FileSystemError::Corrupted(format!(
                    "directory entry {:?} points at descriptor {:?}",
                    name, index
                )));
            }
            if name.is_empty() || !names.insert(name.clone()) || !indices.insert(index) {
                return Err(FileSystemError::Corrupted(format!(
                    "directory entry {:?} is unnamed or duplicated",
                    name
                )));
            }
        }
        Ok(())
    }

    /// 关闭所有文件（缓冲写回磁盘）后导出整盘镜像，目录随后重新打开
    pub fn save_image(&mut self) -> Result<Vec<u8>> {
        // 某个句柄写回失败也要继续关闭其余句柄，并把目录重新打开
        let mut first_error = None;
        for handle in self.oft.handles() {
            if let Err(e) = self.close_handle(handle) {
                warn!("cannot close handle {} before saving: {}", handle, e);
                first_error.get_or_insert(e);
            }
        }
        if self.oft.get(DIRECTORY_HANDLE).is_err() {
            self.open_directory()?;
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        info!("disk image saved");
        Ok(self.disk.save_image())
    }

    /// 从宿主机文件恢复磁盘；文件不存在或内容非法时得到一个空文件系统
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        match std::fs::read(path.as_ref()) {
            Ok(image) => self.load_image(&image),
            Err(e) => {
                warn!("cannot read {}: {}, initializing a fresh disk", path.as_ref().display(), e);
                self.init()?;
                Err(e.into())
            }
        }
    }

    pub fn save_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let image = self.save_image()?;
        std::fs::write(path, image)?;
        Ok(())
    }

    /// 打开文件；同一文件已打开时返回原有句柄
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let file_name = FileName::parse(name)?;
        let (index, _) = self
            .lookup(&file_name)?
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        if let Some(handle) = self.oft.find(index) {
            return Ok(handle);
        }

        let desc = descriptor::read_descriptor(&self.disk, index)?;
        let entry = OftEntry::open(&self.disk, index, &desc)?;
        let handle = self.oft.insert(entry)?;
        info!("open {:?} -> handle {}", name, handle);
        Ok(handle)
    }

    pub fn close(&mut self, handle: usize) -> Result<()> {
        check_user_handle(handle)?;
        self.close_handle(handle)?;
        info!("close handle {}", handle);
        Ok(())
    }

    pub fn seek(&mut self, handle: usize, position: usize) -> Result<()> {
        check_user_handle(handle)?;
        self.seek_handle(handle, position)
    }

    /// 读取至多 count 字节
    pub fn read(&mut self, handle: usize, count: usize) -> Result<Vec<u8>> {
        check_user_handle(handle)?;
        self.read_handle(handle, count)
    }

    pub fn write(&mut self, handle: usize, data: &[u8]) -> Result<()> {
        check_user_handle(handle)?;
        self.write_handle(handle, data)
    }

    // 以下几个不区分目录与普通文件，目录服务直接使用 0 号句柄

    pub(crate) fn seek_handle(&mut self, handle: usize, position: usize) -> Result<()> {
        let entry = self.oft.get_mut(handle)?;
        let desc = descriptor::read_descriptor(&self.disk, entry.descriptor())?;
        entry.seek(&mut self.disk, &desc, position)
    }

    pub(crate) fn read_handle(&mut self, handle: usize, count: usize) -> Result<Vec<u8>> {
        let entry = self.oft.get_mut(handle)?;
        let desc = descriptor::read_descriptor(&self.disk, entry.descriptor())?;
        entry.read(&mut self.disk, &desc, count)
    }

    pub(crate) fn write_handle(&mut self, handle: usize, data: &[u8]) -> Result<()> {
        let entry = self.oft.get_mut(handle)?;
        let mut desc = descriptor::read_descriptor(&self.disk, entry.descriptor())?;
        entry.write(&mut self.disk, &mut desc, data)
    }

    fn close_handle(&mut self, handle: usize) -> Result<()> {
        let entry = self.oft.get(handle)?;
        let mut desc = descriptor::read_descriptor(&self.disk, entry.descriptor())?;
        entry.close(&mut self.disk, &mut desc)?;
        self.oft.remove(handle);
        Ok(())
    }

    /// 查看文件的描述符（长度与数据块）
    pub fn stat(&mut self, name: &str) -> Result<Descriptor> {
        let file_name = FileName::parse(name)?;
        let (index, _) = self
            .lookup(&file_name)?
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        descriptor::read_descriptor(&self.disk, index)
    }

    pub fn position(&self, handle: usize) -> Result<usize> {
        check_user_handle(handle)?;
        Ok(self.oft.get(handle)?.position())
    }

    pub fn is_block_used(&self, block_id: usize) -> Result<bool> {
        if block_id >= self.disk.num_blocks() {
            return Err(FileSystemError::BlockOutOfRange(block_id));
        }
        Ok(BlockBitmap::load(&self.disk)?.is_used(block_id))
    }

    pub fn usage(&self) -> Result<Usage> {
        let free_blocks = BlockBitmap::load(&self.disk)?.free_count();
        let mut free_descriptors = 0;
        for index in 0..DESCRIPTOR_COUNT {
            if descriptor::read_slot(&self.disk, index)? == DescriptorSlot::Free {
                free_descriptors += 1;
            }
        }
        let open_files = self
            .oft
            .handles()
            .into_iter()
            .filter(|&h| h != DIRECTORY_HANDLE)
            .count();

        Ok(Usage {
            free_blocks,
            free_descriptors,
            open_files,
        })
    }
}

// 0 号句柄属于目录，不对外开放
fn check_user_handle(handle: usize) -> Result<()> {
    if handle == DIRECTORY_HANDLE || handle >= OFT_SIZE {
        return Err(FileSystemError::InvalidHandle(handle));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::disk::Block;

    // 指定块写入失败的内存磁盘
    #[derive(Debug, Default)]
    struct FlakyDisk {
        inner: RamDisk,
        broken: Option<usize>,
    }

    impl BlockDevice for FlakyDisk {
        fn num_blocks(&self) -> usize {
            self.inner.num_blocks()
        }

        fn read_block(&self, block_id: usize, buf: &mut Block) -> Result<()> {
            self.inner.read_block(block_id, buf)
        }

        fn write_block(&mut self, block_id: usize, buf: &Block) -> Result<()> {
            if self.broken == Some(block_id) {
                return Err(io::Error::new(io::ErrorKind::Other, "write failed").into());
            }
            self.inner.write_block(block_id, buf)
        }

        fn clear(&mut self) {
            self.inner.clear()
        }

        fn load_image(&mut self, image: &[u8]) -> Result<()> {
            self.inner.load_image(image)
        }

        fn save_image(&self) -> Vec<u8> {
            self.inner.save_image()
        }
    }

    #[test]
    fn failed_flush_during_save_keeps_directory_open() {
        let mut fs = FileSystem::with_device(FlakyDisk::default()).unwrap();
        fs.create("ab").unwrap();
        fs.create("cd").unwrap();
        let h = fs.open("ab").unwrap();
        fs.write(h, b"pending").unwrap();
        let block = fs.stat("ab").unwrap().block(0).unwrap();

        fs.disk.broken = Some(block);
        let err = fs.save_image().unwrap_err();
        assert_eq!(err.kind(), crate::fs::error::ErrorKind::Io);

        // 目录句柄仍可用，失败的句柄保留在表中
        assert_eq!(fs.list().unwrap(), vec!["ab", "cd"]);
        assert_eq!(fs.position(h).unwrap(), 7);

        fs.disk.broken = None;
        let image = fs.save_image().unwrap();
        let mut restored = FileSystem::new().unwrap();
        restored.load_image(&image).unwrap();
        let h = restored.open("ab").unwrap();
        assert_eq!(restored.read(h, 16).unwrap(), b"pending");
    }
}
