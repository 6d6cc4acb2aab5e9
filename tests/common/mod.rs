//! 集成测试的公共工具
#![allow(dead_code)]

use std::collections::HashSet;

use mini_ufs::{disk::BLOCK_SIZE, fs::config::MAX_FILE_SIZE, FileSystem};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 新初始化的文件系统
pub fn fresh() -> FileSystem {
    init_logger();
    FileSystem::new().unwrap()
}

/// 创建文件并写入内容，写完即关闭
pub fn create_with(fs: &mut FileSystem, name: &str, data: &[u8]) {
    fs.create(name).unwrap();
    let h = fs.open(name).unwrap();
    fs.write(h, data).unwrap();
    fs.close(h).unwrap();
}

/// 打开、从头读完、关闭
pub fn read_all(fs: &mut FileSystem, name: &str) -> Vec<u8> {
    let h = fs.open(name).unwrap();
    let data = fs.read(h, MAX_FILE_SIZE).unwrap();
    fs.close(h).unwrap();
    data
}

/// 目录中每个文件引用的块都已在位图中置位，且没有两个文件共用同一块
pub fn assert_consistent(fs: &mut FileSystem) {
    let mut seen = HashSet::new();
    for name in fs.list().unwrap() {
        let desc = fs.stat(&name).unwrap();
        assert!(desc.length <= desc.allocated() * BLOCK_SIZE, "{name}: {desc:?}");
        for block in desc.data_blocks() {
            assert!(fs.is_block_used(block).unwrap(), "{name}: block {block} unmarked");
            assert!(seen.insert(block), "{name}: block {block} shared");
        }
    }
}
