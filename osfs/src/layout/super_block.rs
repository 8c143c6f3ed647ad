use byteorder::{ByteOrder, LittleEndian};

use super::OnDisk;
use crate::MAGIC;

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u32,
    /// 文件系统占据块数
    pub total_blocks: u32,
    pub inode_bitmap_blocks: u32,
    pub inode_area_blocks: u32,
    pub data_bitmap_blocks: u32,
    pub data_area_blocks: u32,
}

impl SuperBlock {
    #[inline]
    pub fn new(
        total_blocks: u32,
        inode_bitmap_blocks: u32,
        inode_area_blocks: u32,
        data_bitmap_blocks: u32,
        data_area_blocks: u32,
    ) -> Self {
        Self {
            magic: MAGIC,
            total_blocks,
            inode_bitmap_blocks,
            inode_area_blocks,
            data_bitmap_blocks,
            data_area_blocks,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }
}

impl OnDisk for SuperBlock {
    const SIZE: usize = 24;

    fn decode(buf: &[u8]) -> Self {
        Self {
            magic: LittleEndian::read_u32(&buf[0..4]),
            total_blocks: LittleEndian::read_u32(&buf[4..8]),
            inode_bitmap_blocks: LittleEndian::read_u32(&buf[8..12]),
            inode_area_blocks: LittleEndian::read_u32(&buf[12..16]),
            data_bitmap_blocks: LittleEndian::read_u32(&buf[16..20]),
            data_area_blocks: LittleEndian::read_u32(&buf[20..24]),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.magic);
        LittleEndian::write_u32(&mut buf[4..8], self.total_blocks);
        LittleEndian::write_u32(&mut buf[8..12], self.inode_bitmap_blocks);
        LittleEndian::write_u32(&mut buf[12..16], self.inode_area_blocks);
        LittleEndian::write_u32(&mut buf[16..20], self.data_bitmap_blocks);
        LittleEndian::write_u32(&mut buf[20..24], self.data_area_blocks);
    }
}
