//! # 索引节点层
//!
//! 文件的创建、删除，以及加载时对数据组织方式的判定。
//! 判定结果写回 [`DiskInode::format`]，此后不再根据块内容猜测。

use alloc::vec::Vec;
use core::fmt;

use derive_more::{From, Into};

use crate::BLOCK_SIZE;
use crate::efs::OsFileSystem;
use crate::error::{Error, Result};
use crate::layout::{DiskInode, Extent, ExtentTable, FileFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct InodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub inode: InodeId,
    pub format: FileFormat,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks, including the extent table block
    pub blocks: u64,
    /// File size
    pub size: u64,
    pub mtime: u64,
    pub ctime: u64,
}

/// 文件数据块的分配状态
#[derive(Debug)]
pub(crate) enum AllocState {
    /// 尚未写入过，没有任何块
    Unallocated,
    ExtentTable(ExtentTable),
    /// 只有一个数据块的旧格式文件
    Legacy,
}

/// 加载到内存的 inode
#[derive(Debug)]
pub(crate) struct Inode {
    pub disk: DiskInode,
    pub state: AllocState,
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OsFileSystem {
    /// 创建空文件，首次写入时才分配区段表
    pub fn create_file(&mut self) -> Result<InodeId> {
        let id = self.alloc_inode()?;
        self.write_inode(&DiskInode::new(id));
        self.sync();

        log::debug!("create inode {id}");
        Ok(id.into())
    }

    /// 按区段格式出现之前的布局创建文件：
    /// 预先占有一个数据块，不带格式标记，也没有区段表。
    pub fn create_legacy_file(&mut self) -> Result<InodeId> {
        let id = self.alloc_inode()?;
        let block = match self.alloc_data() {
            Ok(block) => block,
            Err(err) => {
                self.dealloc_inode(id);
                return Err(err);
            }
        };

        self.write_inode(&DiskInode {
            metadata_block: block,
            allocated_blocks: 1,
            ..DiskInode::new(id)
        });
        self.sync();

        log::debug!("create legacy inode {id} on block {block}");
        Ok(id.into())
    }

    /// 删除文件，回收它占有的全部块
    pub fn remove_file(&mut self, ino: InodeId) -> Result<()> {
        let disk_inode = self.read_inode(ino)?;

        if disk_inode.is_allocated() {
            self.check_metadata_block(&disk_inode)?;

            if disk_inode.format != FileFormat::Legacy {
                match self.read_table(disk_inode.metadata_block) {
                    Some(table) => {
                        for block in table.blocks() {
                            self.dealloc_data(block);
                        }
                    }
                    // 数据块无从得知，inode 原样保留
                    None if disk_inode.allocated_blocks > 1 => {
                        log::error!("inode {ino}: cannot release blocks of a corrupted extent table");
                        return Err(Error::Io);
                    }
                    None => {}
                }
            }
            self.dealloc_data(disk_inode.metadata_block);
        }

        self.write_inode(&DiskInode::new(disk_inode.id));
        self.dealloc_inode(disk_inode.id);
        self.sync();

        log::debug!("remove inode {ino}");
        Ok(())
    }

    pub fn stat(&mut self, ino: InodeId) -> Result<Stat> {
        let disk_inode = self.read_inode(ino)?;

        Ok(Stat {
            inode: ino,
            format: disk_inode.format,
            block_size: BLOCK_SIZE as u64,
            blocks: disk_inode.allocated_blocks as u64,
            size: disk_inode.size,
            mtime: disk_inode.mtime,
            ctime: disk_inode.ctime,
        })
    }

    /// 文件的区段，按逻辑顺序排列；非区段格式的文件返回空表
    pub fn extents(&mut self, ino: InodeId) -> Result<Vec<Extent>> {
        match self.load(ino)?.state {
            AllocState::ExtentTable(table) => Ok(table.extents().to_vec()),
            AllocState::Unallocated | AllocState::Legacy => Ok(Vec::new()),
        }
    }
}

impl OsFileSystem {
    /// 加载 inode 并判定其分配状态
    pub(crate) fn load(&mut self, ino: InodeId) -> Result<Inode> {
        let mut disk = self.read_inode(ino)?;

        if !disk.is_allocated() {
            return Ok(Inode {
                disk,
                state: AllocState::Unallocated,
            });
        }

        self.check_metadata_block(&disk)?;

        let table = match disk.format {
            FileFormat::Legacy => None,
            _ => self.read_table(disk.metadata_block),
        };

        let state = match (disk.format, table) {
            (FileFormat::Legacy, _) => AllocState::Legacy,
            (FileFormat::Extent, Some(table)) => AllocState::ExtentTable(table),
            (FileFormat::Extent, None) if disk.size == 0 => {
                // 还没有内容，直接换成空表
                log::warn!("inode {ino}: reset unreadable extent table");
                let table = ExtentTable::new();
                self.write_table(disk.metadata_block, &table);
                AllocState::ExtentTable(table)
            }
            (FileFormat::Extent, None) => {
                log::error!("inode {ino}: extent table is corrupted");
                return Err(Error::Io);
            }
            (FileFormat::Untagged, Some(table)) => {
                disk.format = FileFormat::Extent;
                self.write_inode(&disk);
                AllocState::ExtentTable(table)
            }
            (FileFormat::Untagged, None) if disk.size == 0 => {
                log::debug!("inode {ino}: no extent table, falling back to single block");
                disk.format = FileFormat::Legacy;
                self.write_inode(&disk);
                AllocState::Legacy
            }
            (FileFormat::Untagged, None) => {
                log::error!("inode {ino}: untagged file with unreadable metadata block");
                return Err(Error::Unsupported);
            }
        };

        Ok(Inode { disk, state })
    }

    fn check_metadata_block(&self, disk: &DiskInode) -> Result<()> {
        if self.data_area().contains(&disk.metadata_block) {
            return Ok(());
        }

        log::error!(
            "inode {}: metadata block {} is outside the data area",
            disk.id,
            disk.metadata_block
        );
        Err(Error::Io)
    }

    /// 写回 inode 与区段表
    pub(crate) fn commit(&mut self, inode: &Inode) {
        self.write_inode(&inode.disk);
        if let AllocState::ExtentTable(table) = &inode.state {
            self.write_table(inode.disk.metadata_block, table);
        }
    }
}
