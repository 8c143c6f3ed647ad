#![no_std]

extern crate alloc;

/* osfs 的整体架构，自上而下 */

// 打开文件层：会话内的读写游标
mod file;

// 传输层：把读写请求拆成逐块的拷贝
mod transfer;

// 区段表管理：建表与追加块
mod extent;

// 旧格式文件的单块读写
mod legacy;

// 索引节点层：文件的创建、删除与分配状态的加载
mod inode;

// 磁盘块管理器层
mod efs;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;

// 块缓存层：内存上的磁盘块数据缓存
mod block_cache;

mod error;

pub use self::{
    efs::{Clock, OsFileSystem},
    error::{Error, Result},
    file::{OpenFlag, OsFile},
    inode::{InodeId, Stat},
    layout::{Extent, FileFormat},
};

pub const MAGIC: u32 = 0x6f73_6673;
/// 区段表头部的有效标记
pub const EXTENT_MAGIC: u32 = 0x4558_544e;
/// 一个元数据块最多记录的区段数
pub const MAX_EXTENTS: usize = 16;
pub const BLOCK_SIZE: usize = 1024;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

pub type DataBlock = [u8; BLOCK_SIZE];
