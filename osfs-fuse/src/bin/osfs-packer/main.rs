mod cli;

use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use cli::{Cli, Command};
use osfs::{InodeId, OpenFlag, OsFile, OsFileSystem};
use osfs_fuse::BlockFile;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Mkfs {
            blocks,
            inode_bitmap_blocks,
        } => {
            let block_file = Arc::new(BlockFile::create(&cli.image, blocks)?);
            let mut fs = OsFileSystem::format(block_file, blocks, inode_bitmap_blocks)
                .map_err(into_io)?;
            println!(
                "{:?}: {blocks} blocks, {} free data blocks",
                cli.image,
                fs.free_data_blocks()
            );
        }
        Command::Put { source, legacy } => {
            let mut fs = mount(&cli.image)?;
            let data = fs::read(&source)?;
            let ino = if legacy {
                fs.create_legacy_file()
            } else {
                fs.create_file()
            }
            .map_err(into_io)?;

            let mut file = OsFile::open(&mut fs, ino, OpenFlag::WRONLY.into()).map_err(into_io)?;
            let written = file.write(&mut fs, &data).map_err(into_io)?;
            if written < data.len() {
                log::warn!("{source:?}: only {written} of {} bytes stored", data.len());
            }
            println!("{source:?} -> inode {ino}");
        }
        Command::Cat { inode } => {
            let mut fs = mount(&cli.image)?;
            let mut file =
                OsFile::open(&mut fs, InodeId::from(inode), OpenFlag::read_only()).map_err(into_io)?;
            let bytes = file.read_all(&mut fs).map_err(into_io)?;
            io::stdout().write_all(&bytes)?;
        }
        Command::Stat { inode } => {
            let mut fs = mount(&cli.image)?;
            let stat = fs.stat(InodeId::from(inode)).map_err(into_io)?;
            println!("inode:  {}", stat.inode);
            println!("format: {:?}", stat.format);
            println!("size:   {}", stat.size);
            println!("blocks: {} ({} bytes each)", stat.blocks, stat.block_size);
            println!("mtime:  {}", stat.mtime);
            println!("ctime:  {}", stat.ctime);
        }
        Command::Extents { inode } => {
            let mut fs = mount(&cli.image)?;
            let extents = fs.extents(InodeId::from(inode)).map_err(into_io)?;
            let mut logical = 0;
            for (i, extent) in extents.iter().enumerate() {
                println!(
                    "#{i}: logical {logical}..{} -> physical {}..{}",
                    logical + extent.len,
                    extent.start,
                    extent.end()
                );
                logical += extent.len;
            }
        }
        Command::Rm { inode } => {
            let mut fs = mount(&cli.image)?;
            fs.remove_file(InodeId::from(inode)).map_err(into_io)?;
        }
    }

    Ok(())
}

fn mount(image: &Path) -> io::Result<OsFileSystem> {
    let block_file = Arc::new(BlockFile::open(image)?);
    Ok(OsFileSystem::open(block_file)
        .map_err(into_io)?
        .with_clock(unix_now))
}

fn into_io(err: osfs::Error) -> io::Error {
    let kind = match err {
        osfs::Error::NotFound | osfs::Error::NoInode => io::ErrorKind::NotFound,
        osfs::Error::InvalidArgument | osfs::Error::TransferFault => io::ErrorKind::InvalidInput,
        osfs::Error::Unsupported => io::ErrorKind::Unsupported,
        osfs::Error::OutOfSpace | osfs::Error::Io | osfs::Error::Corrupted => io::ErrorKind::Other,
    };
    io::Error::new(kind, err.to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
