//! # 打开文件层
//!
//! 一次打开会话：读写权限与文件内的游标。

use alloc::vec::Vec;

use enumflags2::{BitFlags, bitflags};

use crate::efs::OsFileSystem;
use crate::error::{Error, Result};
use crate::inode::InodeId;

/// 表示被打开的文件
#[derive(Debug)]
pub struct OsFile {
    ino: InodeId,
    readable: bool,
    writable: bool,
    append: bool,
    /// **文件**内的偏移量
    offset: u64,
}

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 只写
    WRONLY = 0b0000_0000_0001,
    /// 读写兼备
    RDWR   = 0b0000_0000_0010,
    /// 每次写入前先把游标移到文件末尾
    APPEND = 0b0100_0000_0000,
}

impl OpenFlag {
    // enumflags2拒绝值为0的标志
    /// 只读
    pub const RDONLY: u32 = 0b0000_0000_0000;

    #[inline]
    pub fn read_only() -> BitFlags<OpenFlag> {
        BitFlags::from_bits_truncate(Self::RDONLY)
    }
}

impl OsFile {
    pub fn open(fs: &mut OsFileSystem, ino: InodeId, flags: BitFlags<OpenFlag>) -> Result<Self> {
        // 确认 inode 存在
        fs.stat(ino)?;

        let [readable, writable] = if flags.contains(OpenFlag::RDWR) {
            [true, true]
        } else if flags.contains(OpenFlag::WRONLY) {
            [false, true]
        } else {
            [true, false]
        };

        Ok(Self {
            ino,
            readable,
            writable,
            append: flags.contains(OpenFlag::APPEND),
            offset: 0,
        })
    }

    #[inline]
    pub fn inode(&self) -> InodeId {
        self.ino
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn seek(&mut self, offset: u64) {
        self.offset = offset;
    }

    #[inline]
    pub fn readable(&self) -> bool {
        self.readable
    }

    #[inline]
    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn read(&mut self, fs: &mut OsFileSystem, buf: &mut [u8]) -> Result<usize> {
        if !self.readable {
            return Err(Error::InvalidArgument);
        }

        let length = buf.len();
        fs.read(self.ino, buf, length, &mut self.offset)
    }

    pub fn write(&mut self, fs: &mut OsFileSystem, buf: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::InvalidArgument);
        }

        if self.append {
            self.offset = fs.stat(self.ino)?.size;
        }
        fs.write(self.ino, buf, buf.len(), &mut self.offset)
    }

    /// 从游标处读到文件末尾
    pub fn read_all(&mut self, fs: &mut OsFileSystem) -> Result<Vec<u8>> {
        let mut buffer = [0u8; 512];

        let mut bytes = Vec::new();
        loop {
            let len = self.read(fs, &mut buffer)?;
            if len == 0 {
                break;
            }
            bytes.extend_from_slice(&buffer[..len]);
        }
        Ok(bytes)
    }
}
