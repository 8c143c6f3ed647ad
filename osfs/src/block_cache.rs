//! # 块缓存层
//!
//! 块设备读写速度一般慢于内存读写速度，因此我们在内存中开辟缓冲区，
//! 把即将操作的块复制到内存中，提高对块设备的操作效率。
//!
//! 缓存属于挂载的文件系统实例，不存在全局的缓存管理器；
//! 块内的结构一律按固定布局编解码（见 [`OnDisk`]），不做指针转换。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::layout::OnDisk;
use crate::{BLOCK_SIZE, DataBlock};

/// 块缓存管理，缓存、调度块缓存
#[derive(Debug)]
pub struct BlockCacheManager {
    block_device: Arc<dyn BlockDevice>,
    queue: Vec<(usize, Arc<Mutex<BlockCache>>)>,
}

/// 内存中的块缓存
#[derive(Debug)]
pub struct BlockCache {
    /// 缓存的数据
    data: DataBlock,
    /// 对应的块ID
    block_id: usize,
    /// 底层块设备的引用
    block_device: Arc<dyn BlockDevice>,
    /// 是否为脏块
    modified: bool,
}

impl BlockCache {
    pub fn new(block_id: usize, block_device: Arc<dyn BlockDevice>) -> Self {
        let mut data = [0; BLOCK_SIZE];
        block_device.read_block(block_id, &mut data);

        Self {
            data,
            block_id,
            block_device,
            modified: false,
        }
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_block(self.block_id, &self.data);
        }
    }

    /// 解码块内 `offset` 处的记录
    pub fn read<T: OnDisk>(&self, offset: usize) -> T {
        assert!(offset + T::SIZE <= BLOCK_SIZE);
        T::decode(&self.data[offset..offset + T::SIZE])
    }

    /// 把记录编码到块内 `offset` 处
    pub fn write<T: OnDisk>(&mut self, offset: usize, value: &T) {
        assert!(offset + T::SIZE <= BLOCK_SIZE);
        self.modified = true;
        value.encode(&mut self.data[offset..offset + T::SIZE]);
    }

    #[inline]
    pub fn map<V>(&self, f: impl FnOnce(&DataBlock) -> V) -> V {
        f(&self.data)
    }

    #[inline]
    pub fn map_mut<V>(&mut self, f: impl FnOnce(&mut DataBlock) -> V) -> V {
        self.modified = true;
        f(&mut self.data)
    }

    #[inline]
    pub fn zeroize(&mut self) {
        self.data.fill(0);
        self.modified = true;
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync();
    }
}

impl BlockCacheManager {
    /// 块缓存个数的上限
    const CAPACITY: usize = 16;

    pub fn new(block_device: Arc<dyn BlockDevice>) -> Self {
        Self {
            block_device,
            queue: Vec::with_capacity(Self::CAPACITY),
        }
    }

    // 块缓存调度策略：踢走闲置块
    pub fn get(&mut self, block_id: usize) -> Arc<Mutex<BlockCache>> {
        // 尝试从缓冲区中读取块
        if let Some(cache) = self
            .queue
            .iter()
            .find_map(|(id, cache)| (block_id == *id).then_some(cache))
        {
            return Arc::clone(cache);
        };

        // 触及上限，写回一个块
        if self.queue.len() == Self::CAPACITY {
            let index = self
                .queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1) // 没有其它引用的才能写回
                .expect("run out of block cache");
            self.queue.remove(index);
        }

        // 缓存新块
        let block_cache = Arc::new(Mutex::new(BlockCache::new(
            block_id,
            self.block_device.clone(),
        )));
        self.queue.push((block_id, block_cache.clone()));

        block_cache
    }

    pub fn sync_all(&self) {
        self.queue.iter().for_each(|(_, cache)| cache.lock().sync());
    }
}
