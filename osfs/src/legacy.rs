//! 旧格式文件：元数据块本身就是唯一的数据块，容量固定为一个块

use crate::efs::OsFileSystem;
use crate::error::{Error, Result};
use crate::layout::DiskInode;
use crate::{BLOCK_SIZE, DataBlock};

impl OsFileSystem {
    pub(crate) fn legacy_read(
        &mut self,
        disk_inode: &DiskInode,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        let end = disk_inode.size.min(BLOCK_SIZE as u64);
        if offset >= end {
            return Ok(0);
        }

        let start = offset as usize;
        let read_size = buf.len().min(end as usize - start);
        self.cache
            .get(disk_inode.metadata_block as usize)
            .lock()
            .map(|data_block: &DataBlock| {
                buf[..read_size].copy_from_slice(&data_block[start..start + read_size])
            });

        Ok(read_size)
    }

    /// 超出块的部分被截断
    pub(crate) fn legacy_write(
        &mut self,
        disk_inode: &mut DiskInode,
        offset: u64,
        buf: &[u8],
    ) -> Result<usize> {
        if offset >= BLOCK_SIZE as u64 {
            log::debug!(
                "inode {}: legacy file cannot grow past one block",
                disk_inode.id
            );
            return Err(Error::OutOfSpace);
        }

        let start = offset as usize;
        let written_size = buf.len().min(BLOCK_SIZE - start);
        self.cache
            .get(disk_inode.metadata_block as usize)
            .lock()
            .map_mut(|data_block: &mut DataBlock| {
                data_block[start..start + written_size].copy_from_slice(&buf[..written_size])
            });

        let end = (start + written_size) as u64;
        if end > disk_inode.size {
            disk_inode.size = end;
        }
        disk_inode.touch(self.now());

        Ok(written_size)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use block_dev::MemDevice;

    use super::*;
    use crate::layout::FileFormat;

    #[test]
    fn write_is_clamped_to_one_block() {
        let mut fs = OsFileSystem::format(Arc::new(MemDevice::new(BLOCK_SIZE, 600)), 600, 1)
            .unwrap()
            .with_clock(|| 7);
        let ino = fs.create_legacy_file().unwrap();
        let mut inode = fs.load(ino).unwrap();
        assert_eq!(FileFormat::Legacy, inode.disk.format);

        let data = [0xab; 300];
        assert_eq!(124, fs.legacy_write(&mut inode.disk, 900, &data).unwrap());
        assert_eq!(BLOCK_SIZE as u64, inode.disk.size);
        assert_eq!(7, inode.disk.mtime);

        let mut buf = [0; 200];
        assert_eq!(124, fs.legacy_read(&inode.disk, 900, &mut buf).unwrap());
        assert_eq!(&data[..124], &buf[..124]);
        assert_eq!(0, fs.legacy_read(&inode.disk, BLOCK_SIZE as u64, &mut buf).unwrap());

        assert_eq!(
            Err(Error::OutOfSpace),
            fs.legacy_write(&mut inode.disk, BLOCK_SIZE as u64, &data)
        );
    }
}
