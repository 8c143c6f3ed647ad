//! 区段表
//!
//! 区段 `(start, len)` 表示从物理块 `start` 开始的 `len` 个连续块。
//! 表中区段按其覆盖的逻辑块顺序排列：第 i 个区段覆盖逻辑块
//! `[S_i, S_i + len_i)`，其中 `S_0 = 0`，`S_{i+1} = S_i + len_i`，
//! 中间没有空洞。

use core::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use super::OnDisk;
use crate::error::{Error, Result};
use crate::{DataBlock, EXTENT_MAGIC, MAX_EXTENTS};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// 起始物理块
    pub start: u32,
    /// 连续块数
    pub len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentHeader {
    pub magic: u32,
    pub count: u32,
}

/// 元数据块内完整的区段表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentTable {
    header: ExtentHeader,
    extents: [Extent; MAX_EXTENTS],
}

/// 追加一个块的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// 与最后一个区段物理相邻，并入其中
    Merged,
    /// 新开一个区段
    Opened,
}

const _: () = assert!(ExtentHeader::SIZE + MAX_EXTENTS * Extent::SIZE <= crate::BLOCK_SIZE);

impl Extent {
    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// 紧随区段之后的物理块
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.len
    }

    #[inline]
    pub fn blocks(&self) -> Range<u32> {
        self.start..self.end()
    }

    /// 区段非空且完整落在 `area` 之内
    pub fn is_within(&self, area: &Range<u32>) -> bool {
        self.len > 0
            && area.start <= self.start
            && self
                .start
                .checked_add(self.len)
                .is_some_and(|end| end <= area.end)
    }
}

impl ExtentHeader {
    pub const EMPTY: Self = Self {
        magic: EXTENT_MAGIC,
        count: 0,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == EXTENT_MAGIC && self.count as usize <= MAX_EXTENTS
    }
}

impl Default for ExtentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtentTable {
    /// 打好标记的空表
    pub const fn new() -> Self {
        Self {
            header: ExtentHeader::EMPTY,
            extents: [Extent::new(0, 0); MAX_EXTENTS],
        }
    }

    /// 从元数据块解析区段表；头部无效时返回空
    pub fn parse(block: &DataBlock) -> Option<Self> {
        let header = ExtentHeader::decode(&block[..ExtentHeader::SIZE]);
        if !header.is_valid() {
            return None;
        }

        let mut table = Self {
            header,
            extents: [Extent::default(); MAX_EXTENTS],
        };
        for (i, extent) in table.extents[..header.count as usize].iter_mut().enumerate() {
            let offset = ExtentHeader::SIZE + i * Extent::SIZE;
            *extent = Extent::decode(&block[offset..offset + Extent::SIZE]);
        }

        Some(table)
    }

    /// 整块写出，未用部分补零
    pub fn write_to(&self, block: &mut DataBlock) {
        block.fill(0);
        self.header.encode(&mut block[..ExtentHeader::SIZE]);
        for (i, extent) in self.extents().iter().enumerate() {
            let offset = ExtentHeader::SIZE + i * Extent::SIZE;
            extent.encode(&mut block[offset..offset + Extent::SIZE]);
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.header.count as usize
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count() >= MAX_EXTENTS
    }

    /// 有效的区段
    pub fn extents(&self) -> &[Extent] {
        self.extents.get(..self.count()).unwrap_or_default()
    }

    /// 已映射的数据块总数
    pub fn total_blocks(&self) -> u32 {
        self.extents().iter().map(|extent| extent.len).sum()
    }

    /// 按逻辑顺序列出所有数据块
    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.extents().iter().flat_map(Extent::blocks)
    }

    /// 逻辑块所在区段的下标，以及它在区段内的偏移
    pub fn locate(&self, logical: u32) -> Result<(usize, u32)> {
        let extents = self.extents.get(..self.count()).ok_or(Error::Io)?;

        let mut remaining = logical;
        for (i, extent) in extents.iter().enumerate() {
            if remaining < extent.len {
                return Ok((i, remaining));
            }
            remaining -= extent.len;
        }

        Err(Error::NotFound)
    }

    /// 逻辑块到物理块的映射
    pub fn lookup(&self, logical: u32) -> Result<u32> {
        self.locate(logical)
            .map(|(i, offset)| self.extents[i].start + offset)
    }

    /// 把物理块 `block` 追加为下一个逻辑块。
    ///
    /// 表满且无法并入最后一个区段时返回 [`Error::OutOfSpace`]，表保持不变。
    pub fn try_append(&mut self, block: u32) -> Result<Append> {
        let count = self.count();
        if count > MAX_EXTENTS {
            return Err(Error::OutOfSpace);
        }

        if let Some(last) = self.extents[..count].last_mut() {
            if last.end() == block {
                last.len += 1;
                return Ok(Append::Merged);
            }
        }

        if count == MAX_EXTENTS {
            return Err(Error::OutOfSpace);
        }

        self.extents[count] = Extent::new(block, 1);
        self.header.count += 1;
        Ok(Append::Opened)
    }
}

impl OnDisk for Extent {
    const SIZE: usize = 8;

    fn decode(buf: &[u8]) -> Self {
        Self {
            start: LittleEndian::read_u32(&buf[0..4]),
            len: LittleEndian::read_u32(&buf[4..8]),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.start);
        LittleEndian::write_u32(&mut buf[4..8], self.len);
    }
}

impl OnDisk for ExtentHeader {
    const SIZE: usize = 8;

    fn decode(buf: &[u8]) -> Self {
        Self {
            magic: LittleEndian::read_u32(&buf[0..4]),
            count: LittleEndian::read_u32(&buf[4..8]),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.magic);
        LittleEndian::write_u32(&mut buf[4..8], self.count);
    }
}
