//! # 磁盘数据结构层
//!
//! osfs 的磁盘布局：
//! 超级块 | 索引节点位图 | 索引节点区域 | 数据块位图 | 数据块区域
//!
//! 每个文件的区段表独占一个数据块（元数据块）：
//! 区段头 | 区段 * MAX_EXTENTS | 补零至块尾

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, FileFormat, INODE_SIZE};

mod extent;
pub use extent::{Append, Extent, ExtentTable};

/// 磁盘上的定长记录，一律小端序
pub trait OnDisk: Sized {
    /// 记录占用的字节数
    const SIZE: usize;

    /// `buf` 的长度恰为 [`OnDisk::SIZE`]
    fn decode(buf: &[u8]) -> Self;

    /// `buf` 的长度恰为 [`OnDisk::SIZE`]
    fn encode(&self, buf: &mut [u8]);
}
