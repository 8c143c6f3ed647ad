//! # 磁盘块管理器层
//!
//! 构建出磁盘的布局并使用，数据块与 inode 的分配回收都经过位图。

use alloc::sync::Arc;
use core::ops::Range;

use block_dev::BlockDevice;

use crate::block_cache::BlockCacheManager;
use crate::error::{Error, Result};
use crate::inode::InodeId;
use crate::layout::*;
use crate::{BLOCK_BITS, BLOCK_SIZE};

const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// 时间源，返回自纪元起的秒数
pub type Clock = fn() -> u64;

#[derive(Debug)]
pub struct OsFileSystem {
    pub(crate) cache: BlockCacheManager,
    inode_bitmap: Bitmap,
    data_bitmap: Bitmap,
    inode_area_start_block: u32,
    data_area_start_block: u32,
    clock: Clock,
}

impl OsFileSystem {
    /// 在块设备上建立新的文件系统，原有内容全部清零
    pub fn format(
        block_device: Arc<dyn BlockDevice>,
        total_blocks: u32,
        inode_bitmap_blocks: u32,
    ) -> Result<Self> {
        let inode_area_cap = inode_bitmap_blocks as usize * BLOCK_BITS;
        let inode_area_blocks = inode_area_cap.div_ceil(INODES_PER_BLOCK) as u32;
        let inode_total_blocks = inode_bitmap_blocks + inode_area_blocks;

        // 数据区至少要有一个位图块和一个数据块
        let data_total_blocks = total_blocks
            .checked_sub(1 + inode_total_blocks)
            .filter(|&blocks| blocks > 1)
            .ok_or(Error::InvalidArgument)?;
        let data_bitmap_blocks = (data_total_blocks + BLOCK_BITS as u32) / (BLOCK_BITS as u32 + 1);
        let data_area_blocks = data_total_blocks - data_bitmap_blocks;

        let mut cache = BlockCacheManager::new(block_device);
        for i in 0..total_blocks {
            cache.get(i as usize).lock().zeroize();
        }

        let super_block = SuperBlock::new(
            total_blocks,
            inode_bitmap_blocks,
            inode_area_blocks,
            data_bitmap_blocks,
            data_area_blocks,
        );
        cache.get(0).lock().write(0, &super_block);
        cache.sync_all();

        log::info!(
            "format: {total_blocks} blocks, {} inodes, {data_area_blocks} data blocks",
            inode_area_blocks as usize * INODES_PER_BLOCK
        );
        Ok(Self::with_layout(cache, &super_block))
    }

    pub fn open(block_device: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut cache = BlockCacheManager::new(block_device);
        let super_block: SuperBlock = cache.get(0).lock().read(0);
        if !super_block.is_valid() {
            log::error!("bad super block magic");
            return Err(Error::Corrupted);
        }

        log::info!(
            "open: {} blocks, {} data blocks",
            super_block.total_blocks,
            super_block.data_area_blocks
        );
        Ok(Self::with_layout(cache, &super_block))
    }

    /// 替换时间源，用于 mtime/ctime
    #[inline]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[inline]
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// 把所有脏块写回块设备
    #[inline]
    pub fn sync(&self) {
        self.cache.sync_all();
    }

    /// 在数据区分配新的块并返回其ID
    pub fn alloc_data(&mut self) -> Result<u32> {
        let id = self
            .data_bitmap
            .alloc(&mut self.cache)
            .ok_or(Error::OutOfSpace)?;
        Ok(self.data_area_start_block + id)
    }

    /// 回收数据块并清零，重复回收会被忽略
    pub fn dealloc_data(&mut self, block_id: u32) {
        let Some(id) = block_id.checked_sub(self.data_area_start_block) else {
            log::error!("block {block_id} is outside the data area");
            return;
        };
        if !self.data_bitmap.is_set(&mut self.cache, id) {
            log::warn!("block {block_id} is already free");
            return;
        }

        self.cache.get(block_id as usize).lock().zeroize();
        self.data_bitmap.dealloc(&mut self.cache, id);
    }

    /// 数据区的空闲块数
    pub fn free_data_blocks(&mut self) -> usize {
        let cap = self.data_bitmap.capacity() as u32;
        (0..cap)
            .filter(|&id| !self.data_bitmap.is_set(&mut self.cache, id))
            .count()
    }
}

impl OsFileSystem {
    fn with_layout(cache: BlockCacheManager, super_block: &SuperBlock) -> Self {
        let inode_total_blocks = super_block.inode_bitmap_blocks + super_block.inode_area_blocks;

        Self {
            cache,
            inode_bitmap: Bitmap::new(
                1,
                super_block.inode_bitmap_blocks as usize,
                super_block.inode_area_blocks as usize * INODES_PER_BLOCK,
            ),
            data_bitmap: Bitmap::new(
                1 + inode_total_blocks as usize,
                super_block.data_bitmap_blocks as usize,
                super_block.data_area_blocks as usize,
            ),
            inode_area_start_block: 1 + super_block.inode_bitmap_blocks,
            data_area_start_block: 1 + inode_total_blocks + super_block.data_bitmap_blocks,
            clock: || 0,
        }
    }

    /// 在磁盘上分配新的 inode 并返回其ID
    pub(crate) fn alloc_inode(&mut self) -> Result<u32> {
        self.inode_bitmap
            .alloc(&mut self.cache)
            .ok_or(Error::OutOfSpace)
    }

    pub(crate) fn dealloc_inode(&mut self, id: u32) {
        self.inode_bitmap.dealloc(&mut self.cache, id);
    }

    /// 通过ID获取 inode 在磁盘上的位置：**块ID**以及**块内偏移**
    fn disk_inode_pos(&self, inode_id: u32) -> (u32, usize) {
        let block_id = self.inode_area_start_block + inode_id / INODES_PER_BLOCK as u32;
        let block_offset = inode_id as usize % INODES_PER_BLOCK * INODE_SIZE;

        (block_id, block_offset)
    }

    pub(crate) fn read_inode(&mut self, ino: InodeId) -> Result<DiskInode> {
        let id = u32::from(ino);
        if !self.inode_bitmap.is_set(&mut self.cache, id) {
            return Err(Error::NoInode);
        }

        let (block_id, block_offset) = self.disk_inode_pos(id);
        Ok(self.cache.get(block_id as usize).lock().read(block_offset))
    }

    pub(crate) fn write_inode(&mut self, disk_inode: &DiskInode) {
        let (block_id, block_offset) = self.disk_inode_pos(disk_inode.id);
        self.cache
            .get(block_id as usize)
            .lock()
            .write(block_offset, disk_inode);
    }

    /// 数据区的块号范围
    pub(crate) fn data_area(&self) -> Range<u32> {
        self.data_area_start_block..self.data_area_start_block + self.data_bitmap.capacity() as u32
    }

    /// 解析元数据块中的区段表。
    /// 头部无效，或有区段越出数据区时返回空。
    pub(crate) fn read_table(&mut self, block_id: u32) -> Option<ExtentTable> {
        let table = self
            .cache
            .get(block_id as usize)
            .lock()
            .map(ExtentTable::parse)?;

        let area = self.data_area();
        if let Some(extent) = table.extents().iter().find(|extent| !extent.is_within(&area)) {
            log::error!("block {block_id}: extent {extent:?} lies outside the data area {area:?}");
            return None;
        }

        Some(table)
    }

    pub(crate) fn write_table(&mut self, block_id: u32, table: &ExtentTable) {
        self.cache
            .get(block_id as usize)
            .lock()
            .map_mut(|block| table.write_to(block));
    }
}
