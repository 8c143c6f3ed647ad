use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Image file
    #[arg(long, short, default_value = "fs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh image
    Mkfs {
        /// Total blocks of the image
        #[arg(long, short, default_value_t = 16 * 1024)]
        blocks: u32,

        /// Blocks of the inode bitmap
        #[arg(long, default_value_t = 1)]
        inode_bitmap_blocks: u32,
    },

    /// Copy a host file into a new inode
    Put {
        source: PathBuf,

        /// Create the inode in the pre-extent single block layout
        #[arg(long)]
        legacy: bool,
    },

    /// Print the content of an inode to stdout
    Cat { inode: u32 },

    /// Show the metadata of an inode
    Stat { inode: u32 },

    /// List the extents of an inode
    Extents { inode: u32 },

    /// Remove an inode and release its blocks
    Rm { inode: u32 },
}
