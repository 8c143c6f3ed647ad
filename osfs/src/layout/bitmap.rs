use crate::block_cache::BlockCacheManager;
use crate::{BLOCK_BITS, DataBlock};

/// 位图区域，记录其指示区域的块分配情况
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始块
    start_block_id: usize,
    /// 位图占用块数
    blocks: usize,
    /// 被指示区域的实际块数，不超过 `blocks * BLOCK_BITS`
    bits: usize,
}

/// 块编号
struct BlockID(u32);

impl Bitmap {
    #[inline]
    pub fn new(start_block_id: usize, blocks: usize, bits: usize) -> Self {
        debug_assert!(bits <= blocks * BLOCK_BITS);
        Self {
            start_block_id,
            blocks,
            bits,
        }
    }

    /// 位图所指示区域的总块数
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits
    }

    /// 在指示区域内分配新的块，返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&self, cache: &mut BlockCacheManager) -> Option<u32> {
        // 起始块ID + 块索引 = 索引指向块的实际ID
        for block_index in 0..self.blocks {
            let bitmap_block = cache.get(self.start_block_id + block_index);
            let mut bitmap_block = bitmap_block.lock();

            let Some((byte_index, inbyte_index)) = bitmap_block.map(|bits: &DataBlock| {
                bits.iter()
                    .position(|&byte| byte != u8::MAX)
                    .map(|byte_index| (byte_index, bits[byte_index].trailing_ones() as usize))
            }) else {
                continue;
            };

            let id = BlockID::encode(block_index, byte_index, inbyte_index);
            // 第一个空位已越过指示区域，之前的位全部占用
            if id.0 as usize >= self.bits {
                return None;
            }

            bitmap_block.map_mut(|bits: &mut DataBlock| bits[byte_index] |= 1 << inbyte_index);
            return Some(id.0);
        }

        None
    }

    pub fn dealloc(&self, cache: &mut BlockCacheManager, block_id: u32) {
        let (block_index, byte_index, inbyte_index) = BlockID(block_id).decode();
        let bitmap_block = cache.get(self.start_block_id + block_index);
        let mut bitmap_block = bitmap_block.lock();

        if bitmap_block.map(|bits: &DataBlock| bits[byte_index] & (1 << inbyte_index) == 0) {
            log::warn!("bit {block_id} is already free");
            return;
        }

        bitmap_block.map_mut(|bits: &mut DataBlock| bits[byte_index] &= !(1 << inbyte_index));
    }

    pub fn is_set(&self, cache: &mut BlockCacheManager, block_id: u32) -> bool {
        if block_id as usize >= self.bits {
            return false;
        }

        let (block_index, byte_index, inbyte_index) = BlockID(block_id).decode();
        cache
            .get(self.start_block_id + block_index)
            .lock()
            .map(|bits: &DataBlock| bits[byte_index] & (1 << inbyte_index) != 0)
    }
}

impl BlockID {
    /// 线性映射编码得到块ID
    #[inline]
    fn encode(block_index: usize, byte_index: usize, inbyte_index: usize) -> Self {
        Self((block_index * BLOCK_BITS + byte_index * 8 + inbyte_index) as u32)
    }

    fn decode(self) -> (usize, usize, usize) {
        let mut block_id = self.0 as usize;

        let block_index = block_id / BLOCK_BITS;
        block_id %= BLOCK_BITS;
        (block_index, block_id / 8, block_id % 8)
    }
}
