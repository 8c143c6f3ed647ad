//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、光盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。

#![no_std]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

use spin::Mutex;

/// 块设备驱动特质
///
/// `buf` 的长度即块大小，`block_id` 为从设备起始处计数的块号。
pub trait BlockDevice: Debug + Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);
}

/// 内存中的块设备：一段按块编址的连续数组
#[derive(Debug)]
pub struct MemDevice {
    block_size: usize,
    data: Mutex<Vec<u8>>,
}

impl MemDevice {
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            block_size,
            data: Mutex::new(vec![0; block_size * blocks]),
        }
    }

    #[inline]
    pub fn blocks(&self) -> usize {
        self.data.lock().len() / self.block_size
    }

    /// 直接改写某块的原始字节，绕过文件系统（用于构造损坏的磁盘）
    pub fn poke(&self, block_id: usize, offset: usize, bytes: &[u8]) {
        let start = block_id * self.block_size + offset;
        assert!(offset + bytes.len() <= self.block_size);
        self.data.lock()[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockDevice for MemDevice {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        assert!(buf.len() <= self.block_size, "not a complete block!");
        let start = block_id * self.block_size;
        buf.copy_from_slice(&self.data.lock()[start..start + buf.len()]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        assert!(buf.len() <= self.block_size, "not a complete block!");
        let start = block_id * self.block_size;
        self.data.lock()[start..start + buf.len()].copy_from_slice(buf);
    }
}
