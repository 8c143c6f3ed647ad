#![allow(dead_code)]

use std::sync::Arc;

use block_dev::MemDevice;
use osfs::{BLOCK_SIZE, OsFileSystem};

/// 600 块：超级块、1 块 inode 位图、512 块 inode 区、1 块数据位图，余下 85 个数据块
pub const BLOCKS: u32 = 600;
/// inode 区的起始块
pub const INODE_AREA: usize = 2;
/// 数据区的起始块
pub const DATA_AREA: u32 = 515;

pub fn device(blocks: u32) -> Arc<MemDevice> {
    Arc::new(MemDevice::new(BLOCK_SIZE, blocks as usize))
}

pub fn mkfs(dev: &Arc<MemDevice>) -> OsFileSystem {
    OsFileSystem::format(dev.clone(), dev.blocks() as u32, 1).unwrap()
}

pub fn reopen(dev: &Arc<MemDevice>) -> OsFileSystem {
    OsFileSystem::open(dev.clone()).unwrap()
}

/// 逐字节不同的测试数据
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// 把 inode 的格式标记改回未标记状态
pub fn clear_format_tag(dev: &MemDevice, inode: u32) {
    let block = INODE_AREA + inode as usize / 16;
    let offset = inode as usize % 16 * 64 + 4;
    dev.poke(block, offset, &[0; 4]);
}
