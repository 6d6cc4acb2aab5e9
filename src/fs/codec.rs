//! 磁盘记录的编解码。
//!
//! 描述符与目录项都以大端、定长整数的形式存放，
//! bincode 按字段顺序直接拼接，定长数组不带长度前缀，
//! 因此结构体的内存布局即磁盘布局。

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::fs::error::Result;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(value)?)
}

/// 从切片开头解出一条记录，调用方负责给出恰好一条记录长度的切片
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}
