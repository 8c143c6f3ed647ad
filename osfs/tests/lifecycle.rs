mod common;

use common::*;
use osfs::{BLOCK_SIZE, Error, FileFormat, OpenFlag, OsFile, OsFileSystem};

#[test]
fn data_survives_remount() {
    let dev = device(BLOCKS);
    let data = pattern(4500, 10);
    let ino = {
        let mut fs = mkfs(&dev).with_clock(|| 1_700_000_000);
        let ino = fs.create_file().unwrap();
        fs.write_at(ino, 0, &data).unwrap();
        ino
    };

    let mut fs = reopen(&dev);
    let stat = fs.stat(ino).unwrap();
    assert_eq!(4500, stat.size);
    assert_eq!(FileFormat::Extent, stat.format);
    assert_eq!(1_700_000_000, stat.mtime);
    assert_eq!(BLOCK_SIZE as u64, stat.block_size);

    let mut file = OsFile::open(&mut fs, ino, OpenFlag::read_only()).unwrap();
    assert_eq!(data, file.read_all(&mut fs).unwrap());
}

#[test]
fn open_rejects_foreign_image() {
    let dev = device(BLOCKS);
    dev.poke(0, 0, b"not an osfs");
    assert_eq!(
        Err(Error::Corrupted),
        OsFileSystem::open(dev.clone()).map(|_| ())
    );
}

#[test]
fn format_rejects_tiny_device() {
    let dev = device(514);
    assert_eq!(
        Err(Error::InvalidArgument),
        OsFileSystem::format(dev.clone(), 514, 1).map(|_| ())
    );
}

#[test]
fn remove_releases_every_block() {
    let dev = device(BLOCKS);
    let mut fs = mkfs(&dev);
    let free = fs.free_data_blocks();

    let ino = fs.create_file().unwrap();
    fs.write_at(ino, 0, &pattern(5000, 11)).unwrap();
    assert_eq!(free - 6, fs.free_data_blocks());

    fs.remove_file(ino).unwrap();
    assert_eq!(free, fs.free_data_blocks());
    assert_eq!(Err(Error::NoInode), fs.stat(ino));

    // 回收的 inode 与块会被重新使用，且内容已清零
    let again = fs.create_file().unwrap();
    assert_eq!(ino, again);
    let stat = fs.stat(again).unwrap();
    assert_eq!(0, stat.size);
    assert_eq!(0, stat.blocks);
    fs.write_at(again, 0, b"x").unwrap();
    let mut buf = [0xff; 2];
    assert_eq!(1, fs.read_at(again, 0, &mut buf).unwrap());
}

#[test]
fn remove_legacy_file() {
    let dev = device(BLOCKS);
    let mut fs = mkfs(&dev);
    let free = fs.free_data_blocks();

    let ino = fs.create_legacy_file().unwrap();
    fs.write_at(ino, 0, b"legacy").unwrap();
    assert_eq!(free - 1, fs.free_data_blocks());

    fs.remove_file(ino).unwrap();
    assert_eq!(free, fs.free_data_blocks());
}

#[test]
fn remove_unwritten_file() {
    let dev = device(BLOCKS);
    let mut fs = mkfs(&dev);
    let free = fs.free_data_blocks();

    let ino = fs.create_file().unwrap();
    fs.remove_file(ino).unwrap();
    assert_eq!(free, fs.free_data_blocks());
    assert_eq!(Err(Error::NoInode), fs.remove_file(ino));
}

#[test]
fn files_do_not_share_blocks() {
    let dev = device(BLOCKS);
    let mut fs = mkfs(&dev);
    let a = fs.create_file().unwrap();
    let b = fs.create_file().unwrap();

    let data_a = pattern(3 * BLOCK_SIZE, 12);
    let data_b = pattern(2 * BLOCK_SIZE + 10, 13);
    for chunk in 0..3 {
        let range = chunk * BLOCK_SIZE..(chunk + 1) * BLOCK_SIZE;
        fs.write_at(a, range.start as u64, &data_a[range.clone()])
            .unwrap();
        let end = range.end.min(data_b.len());
        fs.write_at(b, range.start as u64, &data_b[range.start..end])
            .unwrap();
    }

    let mut file = OsFile::open(&mut fs, a, OpenFlag::read_only()).unwrap();
    assert_eq!(data_a, file.read_all(&mut fs).unwrap());
    let mut file = OsFile::open(&mut fs, b, OpenFlag::read_only()).unwrap();
    assert_eq!(data_b, file.read_all(&mut fs).unwrap());

    assert_eq!(3, fs.extents(a).unwrap().len());
    assert_eq!(3, fs.extents(b).unwrap().len());
}

#[test]
fn append_mode_writes_at_end() {
    let dev = device(BLOCKS);
    let mut fs = mkfs(&dev);
    let ino = fs.create_file().unwrap();

    let mut file = OsFile::open(&mut fs, ino, OpenFlag::WRONLY | OpenFlag::APPEND).unwrap();
    let mut expected = Vec::new();
    for i in 0..5 {
        let chunk = pattern(700, i);
        assert_eq!(700, file.write(&mut fs, &chunk).unwrap());
        expected.extend_from_slice(&chunk);
        // 游标被移走也不影响
        file.seek(0);
    }

    assert_eq!(3500, fs.stat(ino).unwrap().size);
    let mut file = OsFile::open(&mut fs, ino, OpenFlag::RDWR.into()).unwrap();
    assert_eq!(expected, file.read_all(&mut fs).unwrap());
    assert_eq!(3500, file.offset());
}

#[test]
fn remove_keeps_file_with_unreadable_table() {
    let dev = device(BLOCKS);
    let ino = {
        let mut fs = mkfs(&dev);
        let ino = fs.create_file().unwrap();
        fs.write_at(ino, 0, &pattern(3000, 15)).unwrap();
        ino
    };
    // 抹去区段表的魔数
    dev.poke(DATA_AREA as usize, 0, &[0; 4]);

    let mut fs = reopen(&dev);
    let free = fs.free_data_blocks();
    assert_eq!(Err(Error::Io), fs.remove_file(ino));
    assert_eq!(free, fs.free_data_blocks());

    let stat = fs.stat(ino).unwrap();
    assert_eq!(3000, stat.size);
    assert_eq!(4, stat.blocks);
}
