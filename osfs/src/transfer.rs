//! # 传输层
//!
//! 读写请求按块边界拆分，每次只拷贝一个块内的片段。
//! 区段格式的文件走区段表；旧格式的文件转交 [`crate::legacy`]。

use crate::efs::OsFileSystem;
use crate::error::{Error, Result};
use crate::inode::{AllocState, Inode, InodeId};
use crate::layout::{DiskInode, ExtentTable};
use crate::{BLOCK_SIZE, DataBlock};

impl OsFileSystem {
    /// 从指定位置(字节偏移)读出数据填充`buf`，返回读到的字节数。
    ///
    /// 读取不会越过文件末尾；`offset` 处于或超出末尾时返回 0。
    pub fn read_at(&mut self, ino: InodeId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let inode = self.load(ino)?;

        match &inode.state {
            AllocState::Unallocated => Ok(0),
            AllocState::ExtentTable(table) => self.read_extents(table, &inode.disk, offset, buf),
            AllocState::Legacy => self.legacy_read(&inode.disk, offset, buf),
        }
    }

    /// 把`buf`写到指定位置(字节偏移)，返回写入的字节数。
    ///
    /// 只能覆盖已有的块或紧接着分配前沿追加，不支持带空洞的写入。
    pub fn write_at(&mut self, ino: InodeId, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut inode = self.load(ino)?;

        let written = match inode.state {
            AllocState::Legacy => self.legacy_write(&mut inode.disk, offset, buf),
            AllocState::Unallocated | AllocState::ExtentTable(_) => {
                self.write_extents(&mut inode, offset, buf)
            }
        };

        // 失败时同样写回：已追加的块已经记在区段表里
        self.commit(&inode);
        self.sync();
        written
    }

    /// 从游标处读取`length`字节，并推进游标
    pub fn read(
        &mut self,
        ino: InodeId,
        buf: &mut [u8],
        length: usize,
        pos: &mut u64,
    ) -> Result<usize> {
        let dest = buf.get_mut(..length).ok_or(Error::TransferFault)?;
        let read_size = self.read_at(ino, *pos, dest)?;
        *pos += read_size as u64;
        Ok(read_size)
    }

    /// 在游标处写入`length`字节，并推进游标
    pub fn write(&mut self, ino: InodeId, buf: &[u8], length: usize, pos: &mut u64) -> Result<usize> {
        let src = buf.get(..length).ok_or(Error::TransferFault)?;
        let written_size = self.write_at(ino, *pos, src)?;
        *pos += written_size as u64;
        Ok(written_size)
    }
}

impl OsFileSystem {
    fn read_extents(
        &mut self,
        table: &ExtentTable,
        disk_inode: &DiskInode,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        let size = disk_inode.size;
        if offset >= size {
            return Ok(0);
        }

        let end = offset.saturating_add(buf.len() as u64).min(size);
        let mut pos = offset;
        // 已读取多少字节
        let mut read_size = 0;

        while pos < end {
            let block_offset = (pos % BLOCK_SIZE as u64) as usize;
            // 大小之内的块必然已映射
            let block_id = block_index(pos)
                .and_then(|logical| table.lookup(logical))
                .map_err(|err| {
                    log::error!("inode {}: no block for offset {pos}: {err}", disk_inode.id);
                    Error::Io
                })?;

            let block_read_size = ((end - pos) as usize).min(BLOCK_SIZE - block_offset);
            let dest = &mut buf[read_size..read_size + block_read_size];
            self.cache
                .get(block_id as usize)
                .lock()
                .map(|data_block: &DataBlock| {
                    dest.copy_from_slice(&data_block[block_offset..block_offset + block_read_size])
                });

            read_size += block_read_size;
            pos += block_read_size as u64;
        }

        Ok(read_size)
    }

    fn write_extents(&mut self, inode: &mut Inode, offset: u64, buf: &[u8]) -> Result<usize> {
        let now = self.now();
        self.ensure_table(inode)?;
        let Inode {
            disk,
            state: AllocState::ExtentTable(table),
        } = inode
        else {
            return Err(Error::Unsupported);
        };

        // 已映射的数据块数，即分配前沿
        let mut total_blocks = table.total_blocks();
        let mut pos = offset;
        let mut written_size = 0;

        while written_size < buf.len() {
            let logical = block_index(pos)?;
            let block_offset = (pos % BLOCK_SIZE as u64) as usize;

            let block_id = match table.lookup(logical) {
                Ok(block_id) => block_id,
                Err(Error::NotFound) => {
                    if logical > total_blocks {
                        log::debug!(
                            "inode {}: write at block {logical} skips the frontier {total_blocks}",
                            disk.id
                        );
                        return Err(Error::InvalidArgument);
                    }

                    self.append_block(table, disk)?;
                    total_blocks += 1;
                    table.lookup(logical)?
                }
                Err(err) => return Err(err),
            };

            let block_write_size = (buf.len() - written_size).min(BLOCK_SIZE - block_offset);
            let src = &buf[written_size..written_size + block_write_size];
            self.cache
                .get(block_id as usize)
                .lock()
                .map_mut(|data_block: &mut DataBlock| {
                    data_block[block_offset..block_offset + block_write_size].copy_from_slice(src)
                });

            written_size += block_write_size;
            pos += block_write_size as u64;
        }

        if pos > disk.size {
            disk.size = pos;
        }
        disk.touch(now);

        Ok(written_size)
    }
}

/// 字节偏移所在的逻辑块
fn block_index(pos: u64) -> Result<u32> {
    u32::try_from(pos / BLOCK_SIZE as u64).map_err(|_| Error::InvalidArgument)
}
