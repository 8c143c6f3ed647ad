//! 区段表的建立与增长

use crate::efs::OsFileSystem;
use crate::error::{Error, Result};
use crate::inode::{AllocState, Inode};
use crate::layout::{Append, DiskInode, ExtentTable, FileFormat};

impl OsFileSystem {
    /// 保证文件拥有有效的区段表。
    ///
    /// 未分配的文件在此获得元数据块，并写入打好标记的空表。
    pub(crate) fn ensure_table<'a>(&mut self, inode: &'a mut Inode) -> Result<&'a mut ExtentTable> {
        if let AllocState::Unallocated = inode.state {
            let block = self.alloc_data()?;
            let table = ExtentTable::new();
            self.write_table(block, &table);

            inode.disk.metadata_block = block;
            inode.disk.allocated_blocks = 1;
            inode.disk.format = FileFormat::Extent;
            inode.state = AllocState::ExtentTable(table);
            log::debug!("inode {}: extent table on block {block}", inode.disk.id);
        }

        match &mut inode.state {
            AllocState::ExtentTable(table) => Ok(table),
            AllocState::Unallocated | AllocState::Legacy => Err(Error::Unsupported),
        }
    }

    /// 为文件追加一个数据块，返回其物理块号。
    ///
    /// 新块与最后一个区段相邻时并入该区段，否则新开一个区段；
    /// 表已满时归还新块并返回 [`Error::OutOfSpace`]。
    pub(crate) fn append_block(
        &mut self,
        table: &mut ExtentTable,
        disk_inode: &mut DiskInode,
    ) -> Result<u32> {
        let block = self.alloc_data()?;

        match table.try_append(block) {
            Ok(Append::Merged) => {}
            Ok(Append::Opened) => {
                log::debug!(
                    "inode {}: extent #{} starts at block {block}",
                    disk_inode.id,
                    table.count() - 1
                );
            }
            Err(err) => {
                if table.is_full() {
                    log::warn!(
                        "inode {}: extent table is full, block {block} released",
                        disk_inode.id
                    );
                }
                self.dealloc_data(block);
                return Err(err);
            }
        }

        disk_inode.allocated_blocks += 1;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use block_dev::MemDevice;

    use super::*;
    use crate::{BLOCK_SIZE, MAX_EXTENTS};

    fn fs() -> OsFileSystem {
        OsFileSystem::format(Arc::new(MemDevice::new(BLOCK_SIZE, 600)), 600, 1).unwrap()
    }

    #[test]
    fn table_is_created_once() {
        let mut fs = fs();
        let ino = fs.create_file().unwrap();
        let mut inode = fs.load(ino).unwrap();
        assert!(matches!(inode.state, AllocState::Unallocated));

        fs.ensure_table(&mut inode).unwrap();
        let metadata_block = inode.disk.metadata_block;
        assert_ne!(0, metadata_block);
        assert_eq!(1, inode.disk.allocated_blocks);
        assert_eq!(FileFormat::Extent, inode.disk.format);

        let table = fs.ensure_table(&mut inode).unwrap();
        assert_eq!(0, table.count());
        assert_eq!(metadata_block, inode.disk.metadata_block);
        assert_eq!(Some(ExtentTable::new()), fs.read_table(metadata_block));
    }

    #[test]
    fn sequential_appends_share_one_extent() {
        let mut fs = fs();
        let ino = fs.create_file().unwrap();
        let mut inode = fs.load(ino).unwrap();
        fs.ensure_table(&mut inode).unwrap();

        let Inode {
            disk,
            state: AllocState::ExtentTable(table),
        } = &mut inode
        else {
            unreachable!()
        };
        let first = fs.append_block(table, disk).unwrap();
        for i in 1..5 {
            assert_eq!(first + i, fs.append_block(table, disk).unwrap());
        }
        assert_eq!(1, table.count());
        assert_eq!(5, table.total_blocks());
        assert_eq!(6, disk.allocated_blocks);
    }

    #[test]
    fn full_table_releases_the_new_block() {
        let mut fs = fs();
        let ino = fs.create_file().unwrap();
        let mut inode = fs.load(ino).unwrap();
        fs.ensure_table(&mut inode).unwrap();

        let Inode {
            disk,
            state: AllocState::ExtentTable(table),
        } = &mut inode
        else {
            unreachable!()
        };
        // 每次追加之间占掉一块，使区段无法合并
        for _ in 0..MAX_EXTENTS {
            fs.append_block(table, disk).unwrap();
            fs.alloc_data().unwrap();
        }
        assert!(table.is_full());

        let free = fs.free_data_blocks();
        assert_eq!(Err(Error::OutOfSpace), fs.append_block(table, disk));
        assert_eq!(free, fs.free_data_blocks());
        assert_eq!(MAX_EXTENTS as u32 + 1, disk.allocated_blocks);
    }
}
