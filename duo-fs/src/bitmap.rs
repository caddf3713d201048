use alloc::sync::Arc;

use crate::{block_cache::get_block_cache, block_dev::BlockDevice, BLOCK_SZ, TOTAL_BLOCKS};

/// 位图的 32 位字数
pub const BITMAP_WORDS: usize = 320;
/// 位图占据的块数（镜像末尾的 3 块）
pub const BITMAP_BLOCKS: usize = (BITMAP_WORDS * 4 + BLOCK_SZ - 1) / BLOCK_SZ;
/// 可分配区域的块数。320 个字共 10240 位，末尾 3 位是多余的零头，
/// 永远不会被分配出去。
pub const BITMAP_BITS: usize = TOTAL_BLOCKS - BITMAP_BLOCKS;

/// 每块能装下的 32 位字数
const WORDS_PER_BLOCK: usize = BLOCK_SZ / 4;

/// 把位图所在的一个块解释为 u32 数组。
/// 一位对应可分配区域的一个块：1 表示占用，0 表示空闲。
/// 字内的位序是从最高位开始数的（第 i 位对应掩码 0x8000_0000 >> (i % 32)），
/// 这是镜像格式的既定约定，和已有镜像互操作的工具都依赖它。
type BitmapChunk = [u32; WORDS_PER_BLOCK];

/// 空闲块位图，存放在镜像末尾的连续块里
pub struct Bitmap {
    /// 位图起始块的 ID
    start_block_id: usize,
}

impl Bitmap {
    pub fn new(start_block_id: usize) -> Self {
        Self { start_block_id }
    }

    /// 找出第一个空闲位，返回其对应的块序号；不改动位图本身。
    /// 按字扫描：全 1 的字整个跳过，第一个非满字里从最高位数起的
    /// 第一个 0 位就是答案。位图耗尽时返回 None，调用方必须检查。
    pub fn find_free(&self, block_device: &Arc<dyn BlockDevice>) -> Option<usize> {
        for block_id in 0..BITMAP_BLOCKS {
            let base_word = block_id * WORDS_PER_BLOCK;
            let words_here = WORDS_PER_BLOCK.min(BITMAP_WORDS - base_word);
            let pos = get_block_cache(self.start_block_id + block_id, Arc::clone(block_device))
                .lock()
                .read(0, |chunk: &BitmapChunk| {
                    for (i, word) in chunk[..words_here].iter().enumerate() {
                        if *word == u32::MAX {
                            continue;
                        }
                        let bit = (base_word + i) * 32 + word.leading_ones() as usize;
                        // 末尾零头位不算空闲块
                        if bit < BITMAP_BITS {
                            return Some(bit);
                        }
                        return None;
                    }
                    None
                });
            if pos.is_some() {
                return pos;
            }
        }
        None
    }

    /// 设置或清除恰好一位，其余位保持不变
    pub fn set(&self, block_device: &Arc<dyn BlockDevice>, bit: usize, used: bool) {
        assert!(bit < BITMAP_BITS);
        let (block_pos, word_pos, inner_pos) = decompose(bit);
        let mask = 0x8000_0000u32 >> inner_pos;
        get_block_cache(self.start_block_id + block_pos, Arc::clone(block_device))
            .lock()
            .modify(0, |chunk: &mut BitmapChunk| {
                if used {
                    chunk[word_pos] |= mask;
                } else {
                    assert!(chunk[word_pos] & mask != 0);
                    chunk[word_pos] &= !mask;
                }
            });
    }

    /// 查询一位的当前状态
    pub fn get(&self, block_device: &Arc<dyn BlockDevice>, bit: usize) -> bool {
        assert!(bit < BITMAP_BITS);
        let (block_pos, word_pos, inner_pos) = decompose(bit);
        let mask = 0x8000_0000u32 >> inner_pos;
        get_block_cache(self.start_block_id + block_pos, Arc::clone(block_device))
            .lock()
            .read(0, |chunk: &BitmapChunk| chunk[word_pos] & mask != 0)
    }

    /// 位图能表示的块总数
    pub fn maximum(&self) -> usize {
        BITMAP_BITS
    }
}

/// 把块序号拆成 (位图内的块号, 块内字下标, 字内位号)
fn decompose(mut bit: usize) -> (usize, usize, usize) {
    let block_pos = bit / (WORDS_PER_BLOCK * 32);
    bit %= WORDS_PER_BLOCK * 32;
    (block_pos, bit / 32, bit % 32)
}
