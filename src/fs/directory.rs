use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    disk::BlockDevice,
    fs::{
        bitmap::BlockBitmap,
        codec,
        config::{DIRECTORY_DESCRIPTOR, DIRECTORY_HANDLE, DIR_ENTRY_SIZE, NAME_LEN},
        descriptor::{self, Descriptor, DescriptorSlot},
        error::{FileSystemError, Result},
        FileSystem,
    },
};

/// 定长文件名：最多 4 字节，不足部分补 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileName([u8; NAME_LEN]);

impl FileName {
    pub fn parse(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        let valid = !bytes.is_empty()
            && bytes.len() <= NAME_LEN
            && bytes.iter().all(|&b| b != 0 && !b.is_ascii_whitespace());
        if !valid {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }

        let mut padded = [0; NAME_LEN];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(padded))
    }

    // 去掉末尾的 0 / 空格填充
    fn trimmed(raw: &[u8]) -> &[u8] {
        let end = raw
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        &raw[..end]
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(Self::trimmed(&self.0)).into_owned()
    }
}

/// 目录项：4 字节文件名 + 4 字节大端描述符号，全 0 表示空项
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
struct DirEntry {
    name: [u8; NAME_LEN],
    descriptor: i32,
}

impl DirEntry {
    fn new(name: &FileName, descriptor: usize) -> Self {
        Self {
            name: name.0,
            descriptor: descriptor as i32,
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn matches(&self, name: &FileName) -> bool {
        FileName::trimmed(&self.name) == FileName::trimmed(&name.0)
    }

    fn name(&self) -> String {
        FileName(self.name).as_string()
    }
}

// 目录服务：目录就是 0 号文件，所有读写都经过 0 号打开文件表项
impl<D: BlockDevice> FileSystem<D> {
    // 从目录文件当前位置读出下一条记录，读到末尾返回 None
    fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        let bytes = self.read_handle(DIRECTORY_HANDLE, DIR_ENTRY_SIZE)?;
        if bytes.len() < DIR_ENTRY_SIZE {
            return Ok(None);
        }
        codec::decode(&bytes).map(Some)
    }

    /// 查找文件名，返回 (描述符号, 目录项在目录文件中的字节偏移)
    pub(crate) fn lookup(&mut self, name: &FileName) -> Result<Option<(usize, usize)>> {
        self.seek_handle(DIRECTORY_HANDLE, 0)?;
        let mut offset = 0;
        while let Some(entry) = self.next_entry()? {
            if !entry.is_empty() && entry.matches(name) {
                return Ok(Some((entry.descriptor as usize, offset)));
            }
            offset += DIR_ENTRY_SIZE;
        }
        Ok(None)
    }

    /// 创建空文件，目录项总是追加到目录文件末尾
    pub fn create(&mut self, name: &str) -> Result<()> {
        let file_name = FileName::parse(name)?;
        let index = descriptor::find_free(&self.disk)?.ok_or(FileSystemError::NoFreeDescriptor)?;
        if self.lookup(&file_name)?.is_some() {
            return Err(FileSystemError::AlreadyExists(name.to_string()));
        }

        let dir_length = descriptor::read_descriptor(&self.disk, DIRECTORY_DESCRIPTOR)?.length;
        self.seek_handle(DIRECTORY_HANDLE, dir_length)?;
        let record = codec::encode(&DirEntry::new(&file_name, index))?;
        self.write_handle(DIRECTORY_HANDLE, &record)
            .map_err(|e| match e {
                FileSystemError::FileTooLarge { .. } => FileSystemError::DirectoryFull,
                other => other,
            })?;

        descriptor::write_descriptor(&mut self.disk, index, &Descriptor::empty())?;
        info!("create {:?} -> descriptor {}", name, index);
        Ok(())
    }

    /// 删除文件。文件若正被打开，其句柄直接丢弃，缓冲区中未写回的数据随之丢失
    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let file_name = FileName::parse(name)?;
        let (index, offset) = self
            .lookup(&file_name)?
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;

        self.seek_handle(DIRECTORY_HANDLE, offset)?;
        self.write_handle(DIRECTORY_HANDLE, &[0; DIR_ENTRY_SIZE])?;

        if let Some(handle) = self.oft.find(index) {
            self.oft.remove(handle);
        }

        let desc = descriptor::read_descriptor(&self.disk, index)?;
        let blocks: Vec<usize> = desc.data_blocks().collect();
        let mut bitmap = BlockBitmap::load(&self.disk)?;
        bitmap.mark(&blocks, false);
        bitmap.sync(&mut self.disk)?;
        descriptor::write_slot(&mut self.disk, index, DescriptorSlot::Free)?;

        info!("destroy {:?}: descriptor {}, freed {:?}", name, index, blocks);
        Ok(())
    }

    /// 按目录顺序列出所有文件名
    pub fn list(&mut self) -> Result<Vec<String>> {
        self.seek_handle(DIRECTORY_HANDLE, 0)?;
        let mut names = Vec::new();
        while let Some(entry) = self.next_entry()? {
            if !entry.is_empty() {
                names.push(entry.name());
            }
        }
        Ok(names)
    }

    /// 目录中所有非空项的（文件名, 描述符号）；负的描述符号记为 None
    pub(crate) fn listed_entries(&mut self) -> Result<Vec<(String, Option<usize>)>> {
        self.seek_handle(DIRECTORY_HANDLE, 0)?;
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            if !entry.is_empty() {
                entries.push((entry.name(), usize::try_from(entry.descriptor).ok()));
            }
        }
        Ok(entries)
    }
}
