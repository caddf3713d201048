use crate::BLOCK_SZ;

/// 目录名 / 文件名长度上限（8.3 命名里的 8）
pub const NAME_LEN: usize = 8;
/// 扩展名长度上限（8.3 命名里的 3）
pub const EXT_LEN: usize = 3;

/// 根目录记录能容纳的目录表项数：(512 - 4) / 17 = 29
pub const ROOT_CAPACITY: usize = (BLOCK_SZ - 4) / DIRENTRY_SZ;
/// 目录记录能容纳的文件表项数：(512 - 4) / 29 = 17
pub const DIR_CAPACITY: usize = (BLOCK_SZ - 4) / FILEENTRY_SZ;

/// 目录表项的磁盘字节数：9 字节名字 + 8 字节起始地址
const DIRENTRY_SZ: usize = NAME_LEN + 1 + 8;
/// 文件表项的磁盘字节数：9 字节名字 + 4 字节扩展名 + 8 字节大小 + 8 字节起始地址
const FILEENTRY_SZ: usize = NAME_LEN + 1 + EXT_LEN + 1 + 8 + 8;

const ROOT_PADDING: usize = BLOCK_SZ - 4 - ROOT_CAPACITY * DIRENTRY_SZ;
const DIR_PADDING: usize = BLOCK_SZ - 4 - DIR_CAPACITY * FILEENTRY_SZ;

/// 数据块：一整块原始字节
pub type DataBlock = [u8; BLOCK_SZ];

/// 根目录里的一个目录表项。
/// 磁盘结构按字节紧排（packed），序列化顺序即字段声明顺序，
/// 与镜像字节一一对应，不依赖编译器的对齐填充。
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DirEntry {
    /// 目录名，0 结尾
    name: [u8; NAME_LEN + 1],
    /// 目录记录所在的镜像字节偏移，必为 BLOCK_SZ 的整数倍
    start_block: i64,
}

impl DirEntry {
    pub fn new(name: &str, start_block: i64) -> Self {
        debug_assert!(name.len() <= NAME_LEN);
        let mut buf = [0u8; NAME_LEN + 1];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            name: buf,
            start_block,
        }
    }

    pub const fn empty() -> Self {
        Self {
            name: [0u8; NAME_LEN + 1],
            start_block: 0,
        }
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|b| *b == 0).unwrap();
        core::str::from_utf8(&self.name[..len]).unwrap()
    }

    pub fn start_block(&self) -> i64 {
        self.start_block
    }
}

/// 目录记录里的一个文件表项
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct FileEntry {
    /// 文件名，0 结尾
    name: [u8; NAME_LEN + 1],
    /// 扩展名，0 结尾，可以为空
    ext: [u8; EXT_LEN + 1],
    /// 文件的逻辑字节数
    size: u64,
    /// 数据块所在的镜像字节偏移
    start_block: i64,
}

impl FileEntry {
    pub fn new(name: &str, ext: &str, start_block: i64) -> Self {
        debug_assert!(name.len() <= NAME_LEN && ext.len() <= EXT_LEN);
        let mut name_buf = [0u8; NAME_LEN + 1];
        name_buf[..name.len()].copy_from_slice(name.as_bytes());
        let mut ext_buf = [0u8; EXT_LEN + 1];
        ext_buf[..ext.len()].copy_from_slice(ext.as_bytes());
        Self {
            name: name_buf,
            ext: ext_buf,
            size: 0,
            start_block,
        }
    }

    pub const fn empty() -> Self {
        Self {
            name: [0u8; NAME_LEN + 1],
            ext: [0u8; EXT_LEN + 1],
            size: 0,
            start_block: 0,
        }
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|b| *b == 0).unwrap();
        core::str::from_utf8(&self.name[..len]).unwrap()
    }

    pub fn ext(&self) -> &str {
        let len = self.ext.iter().position(|b| *b == 0).unwrap();
        core::str::from_utf8(&self.ext[..len]).unwrap()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn start_block(&self) -> i64 {
        self.start_block
    }

    /// 查询用的匹配规则：扩展名为空时只看文件名，否则必须完全一致
    pub fn matches(&self, name: &str, ext: &str) -> bool {
        self.name() == name && (ext.is_empty() || self.ext() == ext)
    }

    /// 精确匹配 (name, ext)，用于创建时的查重
    pub fn is(&self, name: &str, ext: &str) -> bool {
        self.name() == name && self.ext() == ext
    }
}

/// 根目录记录：占据 0 号块，列出所有目录及其起始块。
/// 全零的块就是一个合法的空根目录（dir_count = 0），
/// 所以格式化只需要清零镜像再保留 0 号位。
#[repr(C, packed)]
pub struct RootRecord {
    /// 当前目录数，不超过 ROOT_CAPACITY
    dir_count: i32,
    entries: [DirEntry; ROOT_CAPACITY],
    /// 凑满一个块的填充字节，始终为 0
    padding: [u8; ROOT_PADDING],
}

impl RootRecord {
    pub fn empty() -> Self {
        Self {
            dir_count: 0,
            entries: [DirEntry::empty(); ROOT_CAPACITY],
            padding: [0u8; ROOT_PADDING],
        }
    }

    pub fn count(&self) -> usize {
        (self.dir_count as usize).min(ROOT_CAPACITY)
    }

    pub fn is_full(&self) -> bool {
        self.count() == ROOT_CAPACITY
    }

    /// 已登记的目录表项（按创建顺序）
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries[..self.count()]
    }

    /// 在记录里找目录名，返回第一个匹配项的下标
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.name() == name)
    }

    /// 追加一个目录表项，调用方保证未满且名字合法
    pub fn push(&mut self, name: &str, start_block: i64) {
        let idx = self.count();
        self.entries[idx] = DirEntry::new(name, start_block);
        self.dir_count += 1;
    }

    /// 删除下标处的表项，后续表项前移补位
    pub fn remove(&mut self, idx: usize) {
        let count = self.count();
        for i in idx..count - 1 {
            self.entries[i] = self.entries[i + 1];
        }
        self.entries[count - 1] = DirEntry::empty();
        self.dir_count -= 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(self as *const _ as *const u8, core::mem::size_of::<Self>())
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            core::slice::from_raw_parts_mut(self as *mut _ as *mut u8, core::mem::size_of::<Self>())
        }
    }
}

/// 目录记录：存于该目录的起始块，列出目录下的所有文件
#[repr(C, packed)]
pub struct DirRecord {
    /// 当前文件数，不超过 DIR_CAPACITY
    file_count: i32,
    entries: [FileEntry; DIR_CAPACITY],
    padding: [u8; DIR_PADDING],
}

impl DirRecord {
    pub fn empty() -> Self {
        Self {
            file_count: 0,
            entries: [FileEntry::empty(); DIR_CAPACITY],
            padding: [0u8; DIR_PADDING],
        }
    }

    pub fn count(&self) -> usize {
        (self.file_count as usize).min(DIR_CAPACITY)
    }

    pub fn is_full(&self) -> bool {
        self.count() == DIR_CAPACITY
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries[..self.count()]
    }

    /// 按查询规则（空扩展名通配）找第一个匹配项
    pub fn position_match(&self, name: &str, ext: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.matches(name, ext))
    }

    /// 按精确 (name, ext) 找表项，创建时查重用
    pub fn position_exact(&self, name: &str, ext: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.is(name, ext))
    }

    pub fn entry(&self, idx: usize) -> FileEntry {
        self.entries[idx]
    }

    pub fn entry_mut(&mut self, idx: usize) -> &mut FileEntry {
        &mut self.entries[idx]
    }

    pub fn push(&mut self, name: &str, ext: &str, start_block: i64) {
        let idx = self.count();
        self.entries[idx] = FileEntry::new(name, ext, start_block);
        self.file_count += 1;
    }

    pub fn remove(&mut self, idx: usize) {
        let count = self.count();
        for i in idx..count - 1 {
            self.entries[i] = self.entries[i + 1];
        }
        self.entries[count - 1] = FileEntry::empty();
        self.file_count -= 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(self as *const _ as *const u8, core::mem::size_of::<Self>())
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            core::slice::from_raw_parts_mut(self as *mut _ as *mut u8, core::mem::size_of::<Self>())
        }
    }
}

// 两种记录都必须恰好占满一个块
const _: () = assert!(core::mem::size_of::<RootRecord>() == BLOCK_SZ);
const _: () = assert!(core::mem::size_of::<DirRecord>() == BLOCK_SZ);
