use alloc::sync::Arc;
use spin::Mutex;

use crate::{
    bitmap::{Bitmap, BITMAP_BLOCKS},
    block_cache::{block_cache_sync_all, get_block_cache},
    block_dev::BlockDevice,
    error::{FsError, FsResult},
    layout::{DataBlock, DirRecord, FileEntry, RootRecord, EXT_LEN, NAME_LEN},
    BLOCK_SZ, TOTAL_BLOCKS,
};

/// 根目录记录固定在 0 号块
const ROOT_BLOCK: usize = 0;

/// 两级目录文件系统：负责把根目录、目录记录、数据块、位图
/// 这几类磁盘结构维持在一致的状态上。
/// 镜像布局（固定 10240 块）：
/// - 0 号块：根目录记录
/// - 1 ~ 10236 号块：按需分配的目录记录和文件数据
/// - 末尾 3 块：空闲块位图（从镜像末尾倒数，与镜像格式约定一致）
///
/// 假设单写者、无并发：进程内靠 Arc<Mutex<Self>> 把每个变更操作
/// 括在一次互斥获取里；进程外的并发访问是未定义行为。
/// 变更顺序固定为"先置位图位，再改写目录记录"，但两步之间
/// 没有崩溃原子性，中断可能留下已分配未登记的块（只是泄漏，不损坏）。
pub struct DuoFileSystem {
    /// 文件系统所属的块设备
    pub block_device: Arc<dyn BlockDevice>,
    /// 空闲块位图
    bitmap: Bitmap,
}

impl DuoFileSystem {
    /// 格式化一个镜像：清零所有块，并把 0 号位标记为占用。
    /// 全零的根目录记录就是合法的空根目录，不需要额外初始化。
    pub fn create(block_device: Arc<dyn BlockDevice>) -> Arc<Mutex<Self>> {
        for i in 0..TOTAL_BLOCKS {
            get_block_cache(i, Arc::clone(&block_device))
                .lock()
                .modify(0, |block: &mut DataBlock| {
                    for byte in block.iter_mut() {
                        *byte = 0;
                    }
                });
        }
        let fs = Self {
            block_device: Arc::clone(&block_device),
            bitmap: Bitmap::new(TOTAL_BLOCKS - BITMAP_BLOCKS),
        };
        fs.bitmap.set(&fs.block_device, 0, true);
        block_cache_sync_all();
        Arc::new(Mutex::new(fs))
    }

    /// 打开一个既有镜像。
    /// 这种布局没有魔数可校验，全零镜像本身就是合法的空文件系统；
    /// 只需要保证根块的 0 号位已被占住。
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Arc<Mutex<Self>> {
        let fs = Self {
            block_device: Arc::clone(&block_device),
            bitmap: Bitmap::new(TOTAL_BLOCKS - BITMAP_BLOCKS),
        };
        if !fs.bitmap.get(&fs.block_device, 0) {
            fs.bitmap.set(&fs.block_device, 0, true);
            block_cache_sync_all();
        }
        Arc::new(Mutex::new(fs))
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// 以根目录记录的视角读 0 号块
    pub fn read_root<V>(&self, f: impl FnOnce(&RootRecord) -> V) -> V {
        get_block_cache(ROOT_BLOCK, Arc::clone(&self.block_device))
            .lock()
            .read(0, f)
    }

    /// 以根目录记录的视角改写 0 号块
    pub fn modify_root<V>(&self, f: impl FnOnce(&mut RootRecord) -> V) -> V {
        get_block_cache(ROOT_BLOCK, Arc::clone(&self.block_device))
            .lock()
            .modify(0, f)
    }

    /// 查目录名对应的起始块号（根记录里的第一个匹配项）
    pub fn dir_start(&self, name: &str) -> Option<usize> {
        self.read_root(|root| {
            root.position(name)
                .map(|idx| (root.entries()[idx].start_block() / BLOCK_SZ as i64) as usize)
        })
    }

    /// 以目录记录的视角读某个目录的起始块
    pub fn read_dir_at<V>(&self, block_id: usize, f: impl FnOnce(&DirRecord) -> V) -> V {
        get_block_cache(block_id, Arc::clone(&self.block_device))
            .lock()
            .read(0, f)
    }

    /// 以目录记录的视角改写某个目录的起始块
    pub fn modify_dir_at<V>(&self, block_id: usize, f: impl FnOnce(&mut DirRecord) -> V) -> V {
        get_block_cache(block_id, Arc::clone(&self.block_device))
            .lock()
            .modify(0, f)
    }

    /// 从位图里取一个空闲块并标记占用
    fn alloc_block(&mut self) -> Option<usize> {
        let bit = self.bitmap.find_free(&self.block_device)?;
        self.bitmap.set(&self.block_device, bit, true);
        Some(bit)
    }

    /// 在根目录下新建目录。
    /// 校验顺序：名字长度 -> 根记录容量 -> 重名 -> 块分配。
    /// 成功路径上先写位图位、再追加根记录表项（尽力而为的顺序，
    /// 不保证崩溃原子性），最后统一刷盘。
    pub fn create_directory(&mut self, name: &str) -> FsResult<()> {
        if name.len() > NAME_LEN {
            return Err(FsError::NameTooLong);
        }
        let (full, duplicate) =
            self.read_root(|root| (root.is_full(), root.position(name).is_some()));
        if full {
            return Err(FsError::CapacityExceeded);
        }
        if duplicate {
            return Err(FsError::AlreadyExists);
        }
        let block_id = self.alloc_block().ok_or(FsError::AllocationFailed)?;
        self.modify_root(|root| root.push(name, (block_id * BLOCK_SZ) as i64));
        block_cache_sync_all();
        Ok(())
    }

    /// 在指定目录下新建一个大小为 0 的文件。
    /// 校验顺序：所属目录存在 -> 名字长度 -> 目录容量 -> 重名 -> 块分配。
    pub fn create_file(&mut self, directory: &str, name: &str, ext: &str) -> FsResult<()> {
        let dir_block = self.dir_start(directory).ok_or(FsError::NotFound)?;
        if name.len() > NAME_LEN || ext.len() > EXT_LEN {
            return Err(FsError::NameTooLong);
        }
        let (full, duplicate) = self.read_dir_at(dir_block, |dir| {
            (dir.is_full(), dir.position_exact(name, ext).is_some())
        });
        if full {
            return Err(FsError::CapacityExceeded);
        }
        if duplicate {
            return Err(FsError::AlreadyExists);
        }
        let block_id = self.alloc_block().ok_or(FsError::AllocationFailed)?;
        self.modify_dir_at(dir_block, |dir| {
            dir.push(name, ext, (block_id * BLOCK_SZ) as i64)
        });
        block_cache_sync_all();
        Ok(())
    }

    /// 把目录从根记录里摘掉。
    /// 目录的起始块故意留在位图里不回收：镜像格式从未定义过
    /// 回收流程，这里保持孤块泄漏的已知行为（见 DESIGN.md）。
    pub fn remove_directory(&mut self, name: &str) -> FsResult<()> {
        let removed = self.modify_root(|root| {
            root.position(name).map(|idx| root.remove(idx)).is_some()
        });
        if !removed {
            return Err(FsError::NotFound);
        }
        block_cache_sync_all();
        Ok(())
    }

    /// 把文件从所属目录记录里摘掉，数据块同样不回收
    pub fn remove_file(&mut self, directory: &str, name: &str, ext: &str) -> FsResult<()> {
        let dir_block = self.dir_start(directory).ok_or(FsError::NotFound)?;
        let removed = self.modify_dir_at(dir_block, |dir| {
            dir.position_match(name, ext)
                .map(|idx| dir.remove(idx))
                .is_some()
        });
        if !removed {
            return Err(FsError::NotFound);
        }
        block_cache_sync_all();
        Ok(())
    }

    /// 查文件大小。扩展名为空时按文件名匹配第一个表项，
    /// 同名多扩展名的歧义按记录顺序解决（第一个命中者胜出）。
    pub fn lookup_file_size(&self, directory: &str, name: &str, ext: &str) -> Option<u64> {
        let dir_block = self.dir_start(directory)?;
        self.read_dir_at(dir_block, |dir| {
            dir.position_match(name, ext).map(|idx| dir.entry(idx).size())
        })
    }

    /// 定位文件表项：返回 (目录起始块, 表项下标, 表项副本)
    fn find_file(
        &self,
        directory: &str,
        name: &str,
        ext: &str,
    ) -> FsResult<(usize, usize, FileEntry)> {
        let dir_block = self.dir_start(directory).ok_or(FsError::NotFound)?;
        self.read_dir_at(dir_block, |dir| {
            dir.position_match(name, ext)
                .map(|idx| (dir_block, idx, dir.entry(idx)))
        })
        .ok_or(FsError::NotFound)
    }

    /// 从文件的 offset 偏移处读数据，返回读到的字节数。
    /// offset 等于文件大小时读 0 字节且不报错（文件末尾），
    /// 超过文件大小则是 InvalidOffset。
    pub fn read_file(
        &self,
        directory: &str,
        name: &str,
        ext: &str,
        buf: &mut [u8],
        offset: usize,
    ) -> FsResult<usize> {
        let (_, _, entry) = self.find_file(directory, name, ext)?;
        let size = entry.size() as usize;
        if offset > size {
            return Err(FsError::InvalidOffset);
        }
        let end = (offset + buf.len()).min(size).min(BLOCK_SZ);
        if offset >= end {
            return Ok(0);
        }
        let read_size = end - offset;
        let data_block = (entry.start_block() / BLOCK_SZ as i64) as usize;
        get_block_cache(data_block, Arc::clone(&self.block_device))
            .lock()
            .read(0, |block: &DataBlock| {
                buf[..read_size].copy_from_slice(&block[offset..end]);
            });
        Ok(read_size)
    }

    /// 向文件的 offset 偏移处写数据，返回实际写入的字节数。
    /// 文件的数据区只有一个块，写入范围被截断在 512 字节以内
    /// （块链从未被定义过，超出部分直接不写，而不是静默扩展）；
    /// 写入延长了逻辑长度时，同步更新目录记录里的 size 字段。
    pub fn write_file(
        &mut self,
        directory: &str,
        name: &str,
        ext: &str,
        buf: &[u8],
        offset: usize,
    ) -> FsResult<usize> {
        let (dir_block, idx, entry) = self.find_file(directory, name, ext)?;
        let size = entry.size() as usize;
        if offset > size {
            return Err(FsError::InvalidOffset);
        }
        let write_size = buf.len().min(BLOCK_SZ.saturating_sub(offset));
        if write_size == 0 {
            return Ok(0);
        }
        let data_block = (entry.start_block() / BLOCK_SZ as i64) as usize;
        get_block_cache(data_block, Arc::clone(&self.block_device))
            .lock()
            .modify(0, |block: &mut DataBlock| {
                block[offset..offset + write_size].copy_from_slice(&buf[..write_size]);
            });
        let new_size = (offset + write_size) as u64;
        if new_size > entry.size() {
            self.modify_dir_at(dir_block, |dir| dir.entry_mut(idx).set_size(new_size));
        }
        block_cache_sync_all();
        Ok(write_size)
    }
}
