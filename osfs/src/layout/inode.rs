use byteorder::{ByteOrder, LittleEndian};

use super::OnDisk;

/// 磁盘上 inode 的大小，含保留字节
pub const INODE_SIZE: usize = 64;

/// 文件数据的组织格式
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FileFormat {
    /// 旧版本写出的文件没有格式标记，首次加载时根据元数据块判定
    #[default]
    Untagged = 0,
    /// 元数据块存放区段表
    Extent = 1,
    /// 元数据块即唯一的数据块
    Legacy = 2,
}

impl From<u32> for FileFormat {
    fn from(raw: u32) -> Self {
        match raw {
            1 => Self::Extent,
            2 => Self::Legacy,
            _ => Self::Untagged,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiskInode {
    /// ID
    pub id: u32,
    pub format: FileFormat,
    /// 区段表所在块；旧格式下为数据块。为0表示尚未分配
    pub metadata_block: u32,
    /// 占用的块数，包含元数据块
    pub allocated_blocks: u32,
    /// 文件大小(字节)
    pub size: u64,
    pub mtime: u64,
    pub ctime: u64,
}

impl DiskInode {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// 是否已拥有元数据块
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.allocated_blocks > 0 && self.metadata_block != 0
    }

    #[inline]
    pub fn touch(&mut self, now: u64) {
        self.mtime = now;
        self.ctime = now;
    }
}

impl OnDisk for DiskInode {
    const SIZE: usize = INODE_SIZE;

    fn decode(buf: &[u8]) -> Self {
        Self {
            id: LittleEndian::read_u32(&buf[0..4]),
            format: LittleEndian::read_u32(&buf[4..8]).into(),
            metadata_block: LittleEndian::read_u32(&buf[8..12]),
            allocated_blocks: LittleEndian::read_u32(&buf[12..16]),
            size: LittleEndian::read_u64(&buf[16..24]),
            mtime: LittleEndian::read_u64(&buf[24..32]),
            ctime: LittleEndian::read_u64(&buf[32..40]),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.id);
        LittleEndian::write_u32(&mut buf[4..8], self.format as u32);
        LittleEndian::write_u32(&mut buf[8..12], self.metadata_block);
        LittleEndian::write_u32(&mut buf[12..16], self.allocated_blocks);
        LittleEndian::write_u64(&mut buf[16..24], self.size);
        LittleEndian::write_u64(&mut buf[24..32], self.mtime);
        LittleEndian::write_u64(&mut buf[32..40], self.ctime);
        buf[40..].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BLOCK_SIZE;

    #[test]
    fn inodes_tile_a_block() {
        assert_eq!(0, BLOCK_SIZE % INODE_SIZE);
    }

    #[test]
    fn unknown_format_reads_as_untagged() {
        let mut buf = [0u8; INODE_SIZE];
        let inode = DiskInode {
            id: 3,
            format: FileFormat::Legacy,
            metadata_block: 700,
            allocated_blocks: 1,
            size: 12,
            mtime: 5,
            ctime: 6,
        };
        inode.encode(&mut buf);
        assert_eq!(inode, DiskInode::decode(&buf));

        LittleEndian::write_u32(&mut buf[4..8], 0xdead);
        assert_eq!(FileFormat::Untagged, DiskInode::decode(&buf).format);
    }
}
