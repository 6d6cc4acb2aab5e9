use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BLOCK_COUNT, BLOCK_SIZE},
    fs::{
        codec,
        config::{
            DATA_START, DESCRIPTORS_PER_BLOCK, DESCRIPTOR_COUNT, DESCRIPTOR_SIZE,
            DESCRIPTOR_TABLE_START_BLOCK_ID, MAX_FILE_BLOCKS, MAX_FILE_SIZE,
        },
        error::{FileSystemError, Result},
    },
};

// 块字段中的两个哨兵值
const UNALLOCATED: i32 = -1; // 该槽位尚未分配数据块
const UNUSED: i32 = 0; // 三个块字段全为 0 表示描述符本身空闲

/// 磁盘上的描述符：4 个大端 i32 {length, block0, block1, block2}
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
struct RawDescriptor {
    length: i32,
    blocks: [i32; MAX_FILE_BLOCKS],
}

/// 一个正在使用的文件描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub length: usize,                          // 文件长度（字节）
    pub blocks: [Option<usize>; MAX_FILE_BLOCKS], // 数据块号，None 表示尚未分配
}

/// 描述符槽位，显式区分“空闲”与“已使用”，不依赖块号 0 的巧合含义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSlot {
    Free,
    Used(Descriptor),
}

impl Descriptor {
    /// 新建文件：长度 0，没有任何数据块
    pub fn empty() -> Self {
        Self {
            length: 0,
            blocks: [None; MAX_FILE_BLOCKS],
        }
    }

    /// 文件第 index 个逻辑块对应的物理块号，超出 3 块也返回 None
    pub fn block(&self, index: usize) -> Option<usize> {
        self.blocks.get(index).copied().flatten()
    }

    pub fn allocated(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    pub fn data_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().filter_map(|b| *b)
    }

    /// 追加新分配的块到第一个空槽位
    pub fn add_blocks(&mut self, block_ids: &[usize]) -> Result<()> {
        for &block_id in block_ids {
            let slot = self
                .blocks
                .iter_mut()
                .find(|b| b.is_none())
                .ok_or(FileSystemError::FileTooLarge {
                    requested: (MAX_FILE_BLOCKS + 1) * BLOCK_SIZE,
                })?;
            *slot = Some(block_id);
        }
        Ok(())
    }
}

impl DescriptorSlot {
    fn to_raw(self) -> RawDescriptor {
        match self {
            Self::Free => RawDescriptor {
                length: 0,
                blocks: [UNUSED; MAX_FILE_BLOCKS],
            },
            Self::Used(desc) => {
                let mut blocks = [UNALLOCATED; MAX_FILE_BLOCKS];
                for (raw, block) in blocks.iter_mut().zip(desc.blocks) {
                    if let Some(block_id) = block {
                        *raw = block_id as i32;
                    }
                }
                RawDescriptor {
                    length: desc.length as i32,
                    blocks,
                }
            }
        }
    }

    fn from_raw(index: usize, raw: RawDescriptor) -> Result<Self> {
        if raw.blocks == [UNUSED; MAX_FILE_BLOCKS] {
            return Ok(Self::Free);
        }

        let corrupted = |what: &str| {
            FileSystemError::Corrupted(format!("descriptor {}: {} ({:?})", index, what, raw))
        };

        if raw.length < 0 || raw.length as usize > MAX_FILE_SIZE {
            return Err(corrupted("length out of range"));
        }

        let mut blocks = [None; MAX_FILE_BLOCKS];
        for (block, &value) in blocks.iter_mut().zip(raw.blocks.iter()) {
            *block = match value {
                UNALLOCATED => None,
                v if (DATA_START as i32..BLOCK_COUNT as i32).contains(&v) => Some(v as usize),
                _ => return Err(corrupted("block index outside data area")),
            };
        }

        Ok(Self::Used(Descriptor {
            length: raw.length as usize,
            blocks,
        }))
    }

    pub fn used(self) -> Option<Descriptor> {
        match self {
            Self::Free => None,
            Self::Used(desc) => Some(desc),
        }
    }
}

// 描述符号 -> (所在块号, 块内偏移)
fn locate(index: usize) -> Result<(usize, usize)> {
    if index >= DESCRIPTOR_COUNT {
        return Err(FileSystemError::InvalidDescriptor(index));
    }
    let block_id = DESCRIPTOR_TABLE_START_BLOCK_ID + index / DESCRIPTORS_PER_BLOCK;
    let offset = (index % DESCRIPTORS_PER_BLOCK) * DESCRIPTOR_SIZE;
    Ok((block_id, offset))
}

pub fn read_slot<D: BlockDevice>(disk: &D, index: usize) -> Result<DescriptorSlot> {
    let (block_id, offset) = locate(index)?;
    let mut block = [0u8; BLOCK_SIZE];
    disk.read_block(block_id, &mut block)?;

    let raw: RawDescriptor = codec::decode(&block[offset..offset + DESCRIPTOR_SIZE])?;
    DescriptorSlot::from_raw(index, raw)
}

/// 读取一个必须处于使用状态的描述符
pub fn read_descriptor<D: BlockDevice>(disk: &D, index: usize) -> Result<Descriptor> {
    read_slot(disk, index)?.used().ok_or_else(|| {
        FileSystemError::Corrupted(format!("descriptor {} is not in use", index))
    })
}

// 读-改-写所在的整块，同块的其他 3 个描述符保持不变
pub fn write_slot<D: BlockDevice>(disk: &mut D, index: usize, slot: DescriptorSlot) -> Result<()> {
    let (block_id, offset) = locate(index)?;
    let mut block = [0u8; BLOCK_SIZE];
    disk.read_block(block_id, &mut block)?;

    let bytes = codec::encode(&slot.to_raw())?;
    block[offset..offset + DESCRIPTOR_SIZE].copy_from_slice(&bytes);
    disk.write_block(block_id, &block)
}

pub fn write_descriptor<D: BlockDevice>(disk: &mut D, index: usize, desc: &Descriptor) -> Result<()> {
    write_slot(disk, index, DescriptorSlot::Used(*desc))
}

/// 线性扫描，返回第一个空闲描述符号。0 号描述符属于目录，从 1 开始找
pub fn find_free<D: BlockDevice>(disk: &D) -> Result<Option<usize>> {
    for index in 1..DESCRIPTOR_COUNT {
        if read_slot(disk, index)? == DescriptorSlot::Free {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::RamDisk;

    #[test]
    fn fresh_disk_has_only_free_slots() {
        let disk = RamDisk::new();
        for index in 0..DESCRIPTOR_COUNT {
            assert_eq!(read_slot(&disk, index).unwrap(), DescriptorSlot::Free);
        }
        assert_eq!(find_free(&disk).unwrap(), Some(1));
    }

    #[test]
    fn on_disk_layout_is_four_big_endian_ints() {
        let mut disk = RamDisk::new();
        let desc = Descriptor {
            length: 70,
            blocks: [Some(7), Some(8), None],
        };
        // 5 号描述符：第 2 个描述符块（块 2）中的第 1 个槽位
        write_descriptor(&mut disk, 5, &desc).unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        disk.read_block(2, &mut block).unwrap();
        assert_eq!(
            &block[16..32],
            &[0, 0, 0, 70, 0, 0, 0, 7, 0, 0, 0, 8, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert!(block[..16].iter().all(|&b| b == 0));
        assert_eq!(read_descriptor(&disk, 5).unwrap(), desc);
    }

    #[test]
    fn neighbours_in_the_same_block_are_preserved() {
        let mut disk = RamDisk::new();
        write_descriptor(&mut disk, 4, &Descriptor::empty()).unwrap();
        write_descriptor(&mut disk, 7, &Descriptor::empty()).unwrap();
        write_slot(&mut disk, 4, DescriptorSlot::Free).unwrap();

        assert_eq!(read_slot(&disk, 4).unwrap(), DescriptorSlot::Free);
        assert_eq!(
            read_slot(&disk, 7).unwrap(),
            DescriptorSlot::Used(Descriptor::empty())
        );
    }

    #[test]
    fn find_free_skips_used_descriptors() {
        let mut disk = RamDisk::new();
        for index in 1..4 {
            write_descriptor(&mut disk, index, &Descriptor::empty()).unwrap();
        }
        assert_eq!(find_free(&disk).unwrap(), Some(4));

        for index in 4..DESCRIPTOR_COUNT {
            write_descriptor(&mut disk, index, &Descriptor::empty()).unwrap();
        }
        assert_eq!(find_free(&disk).unwrap(), None);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let disk = RamDisk::new();
        assert!(matches!(
            read_slot(&disk, DESCRIPTOR_COUNT),
            Err(FileSystemError::InvalidDescriptor(DESCRIPTOR_COUNT))
        ));
    }

    #[test]
    fn block_index_in_metadata_area_is_corruption() {
        let mut disk = RamDisk::new();
        let mut block = [0u8; BLOCK_SIZE];
        // length = 0, blocks = {3, -1, -1}
        block[4..8].copy_from_slice(&3i32.to_be_bytes());
        block[8..16].fill(0xFF);
        disk.write_block(1, &block).unwrap();

        assert!(matches!(
            read_slot(&disk, 0),
            Err(FileSystemError::Corrupted(_))
        ));
    }

    #[test]
    fn add_blocks_fills_empty_slots_in_order() {
        let mut desc = Descriptor::empty();
        desc.add_blocks(&[9]).unwrap();
        desc.add_blocks(&[12, 10]).unwrap();
        assert_eq!(desc.blocks, [Some(9), Some(12), Some(10)]);
        assert_eq!(desc.allocated(), 3);
        assert_eq!(desc.block(3), None);
        assert!(desc.add_blocks(&[11]).is_err());
    }
}
