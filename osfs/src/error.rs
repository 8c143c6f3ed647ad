use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 逻辑块超出了区段表的覆盖范围
    NotFound,
    /// 块设备已无空闲块，或区段表已满
    OutOfSpace,
    /// 写入越过了分配前沿
    InvalidArgument,
    /// 区段表损坏
    Io,
    /// 调用者的缓冲区容纳不下请求的长度
    TransferFault,
    /// 无法安全解读的旧格式文件
    Unsupported,
    /// inode 编号越界或未分配
    NoInode,
    /// 超级块校验失败
    Corrupted,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::NotFound => "logical block is not mapped",
            Error::OutOfSpace => "no space left on device",
            Error::InvalidArgument => "invalid argument",
            Error::Io => "corrupted extent table",
            Error::TransferFault => "bad buffer",
            Error::Unsupported => "unsupported file layout",
            Error::NoInode => "no such inode",
            Error::Corrupted => "not an osfs image",
        };
        f.write_str(msg)
    }
}
