use alloc::{collections::VecDeque, sync::Arc};
use lazy_static::lazy_static;
use spin::Mutex;

use crate::{block_dev::BlockDevice, BLOCK_SZ};

/// 同一时间驻留内存的块缓存数量上限
const BLOCK_CACHE_SIZE: usize = 16;

/// 单个块的写回缓存。
/// 读写都先落在 cache 数组上，modified 标记脏块，在 sync 时写回设备。
#[repr(C)]
pub struct BlockCache {
    /// 块数据。必须位于结构体首部：get_ref/get_mut 直接在此缓冲区上做
    /// 类型转换，首部能保证它继承整个结构体的对齐。
    cache: [u8; BLOCK_SZ],
    /// 对应的块 ID
    block_id: usize,
    /// 本块所属的块设备
    block_device: Arc<dyn BlockDevice>,
    /// 脏标记，sync 时据此决定是否写回
    modified: bool,
}

impl BlockCache {
    /// 从设备加载一个块，生成对应的缓存对象
    pub fn new(block_id: usize, block_device: Arc<dyn BlockDevice>) -> Self {
        let mut cache = [0u8; BLOCK_SZ];
        block_device.read_block(block_id, &mut cache);
        Self {
            cache,
            block_id,
            block_device,
            modified: false,
        }
    }

    fn addr_of_offset(&self, offset: usize) -> usize {
        &self.cache[offset] as *const _ as usize
    }

    /// 把块内 offset 处的数据解释为类型 T 的只读引用
    pub fn get_ref<T>(&self, offset: usize) -> &T
    where
        T: Sized,
    {
        let type_size = core::mem::size_of::<T>();
        assert!(offset + type_size <= BLOCK_SZ);
        let a = self.addr_of_offset(offset);
        unsafe { &*(a as *const T) }
    }

    /// 把块内 offset 处的数据解释为类型 T 的可变引用，同时打上脏标记
    pub fn get_mut<T>(&mut self, offset: usize) -> &mut T
    where
        T: Sized,
    {
        let type_size = core::mem::size_of::<T>();
        assert!(offset + type_size <= BLOCK_SZ);
        self.modified = true;
        let a = self.addr_of_offset(offset);
        unsafe { &mut *(a as *mut T) }
    }

    /// 在块内 offset 处以类型 T 的视角执行只读闭包
    pub fn read<T, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get_ref(offset))
    }

    /// 在块内 offset 处以类型 T 的视角执行修改闭包
    pub fn modify<T, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }

    /// 将脏块写回设备
    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_block(self.block_id, &self.cache);
        }
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync();
    }
}

/// 计算设备的缓存键。
/// 缓存条目以 (block_id, 设备指针) 为键：同一进程里可能同时打开多个镜像
/// （比如测试），只按块号索引会让两个镜像的同号块互相串线。
fn device_key(block_device: &Arc<dyn BlockDevice>) -> usize {
    Arc::as_ptr(block_device) as *const u8 as usize
}

/// 块缓存管理器：维护一个 FIFO 队列，控制驻留内存的缓存数量。
pub struct BlockCacheManager {
    /// (块编号, 设备键, 缓存)。Arc<Mutex<...>> 让管理器保留引用的同时，
    /// 调用方还能共享且互斥地访问缓存内容。
    queue: VecDeque<(usize, usize, Arc<Mutex<BlockCache>>)>,
}

impl BlockCacheManager {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn get_block_cache(
        &mut self,
        block_id: usize,
        block_device: Arc<dyn BlockDevice>,
    ) -> Arc<Mutex<BlockCache>> {
        let dev_key = device_key(&block_device);
        if let Some(entry) = self
            .queue
            .iter()
            .find(|entry| entry.0 == block_id && entry.1 == dev_key)
        {
            // 已缓存，直接复用
            Arc::clone(&entry.2)
        } else {
            if self.queue.len() == BLOCK_CACHE_SIZE {
                // 队列已满，从前往后淘汰第一个只剩管理器自己持有的缓存。
                // 强引用数为 1 说明没有调用方在用，drop 时会自动写回。
                if let Some((idx, _)) = self
                    .queue
                    .iter()
                    .enumerate()
                    .find(|(_, entry)| Arc::strong_count(&entry.2) == 1)
                {
                    self.queue.drain(idx..=idx);
                } else {
                    panic!("Run out of BlockCache!");
                }
            }
            let block_cache = Arc::new(Mutex::new(BlockCache::new(
                block_id,
                Arc::clone(&block_device),
            )));
            self.queue
                .push_back((block_id, dev_key, Arc::clone(&block_cache)));
            block_cache
        }
    }

    /// 把队列里的所有脏块写回各自的设备
    pub fn sync_all(&self) {
        for entry in self.queue.iter() {
            entry.2.lock().sync();
        }
    }
}

lazy_static! {
    static ref BLOCK_CACHE_MANAGER: Mutex<BlockCacheManager> =
        Mutex::new(BlockCacheManager::new());
}

/// 从全局块缓存管理器中取出缓存
pub fn get_block_cache(
    block_id: usize,
    block_device: Arc<dyn BlockDevice>,
) -> Arc<Mutex<BlockCache>> {
    BLOCK_CACHE_MANAGER
        .lock()
        .get_block_cache(block_id, block_device)
}

/// 刷掉所有驻留的脏块。每个会修改镜像的操作结束前都应调用一次，
/// 保证记录在操作返回时已经落盘。
pub fn block_cache_sync_all() {
    BLOCK_CACHE_MANAGER.lock().sync_all();
}
