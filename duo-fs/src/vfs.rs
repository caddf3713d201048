use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::{
    error::{FsError, FsResult},
    fs::DuoFileSystem,
    path::{resolve, PathClass},
};

/// 路径实体的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAttr {
    /// 根目录
    Root,
    /// 一级目录
    Directory,
    /// 文件及其逻辑大小
    File { size: u64 },
}

/// 文件系统操作的公共入口。
/// 每次调用都是无状态的请求-响应：解析路径、定位记录、读写、返回；
/// 除了镜像本身没有任何跨调用的会话状态。
/// 持有 Arc<Mutex<DuoFileSystem>>，每个操作在一次互斥获取内完成，
/// 这就是"单写者"纪律在进程内的落点。
pub struct Vfs {
    fs: Arc<Mutex<DuoFileSystem>>,
}

impl Vfs {
    pub fn new(fs: Arc<Mutex<DuoFileSystem>>) -> Self {
        Self { fs }
    }

    /// 查询路径的属性。根永远存在；目录看根记录，文件看目录记录。
    pub fn getattr(&self, path: &str) -> FsResult<NodeAttr> {
        let fs = self.fs.lock();
        match resolve(path) {
            PathClass::Root => Ok(NodeAttr::Root),
            PathClass::Directory(name) => fs
                .dir_start(name)
                .map(|_| NodeAttr::Directory)
                .ok_or(FsError::NotFound),
            PathClass::File {
                directory,
                name,
                extension,
            } => fs
                .lookup_file_size(directory, name, extension)
                .map(|size| NodeAttr::File { size })
                .ok_or(FsError::NotFound),
            PathClass::Invalid => Err(FsError::InvalidPath),
        }
    }

    /// 列出目录内容。根目录列目录名；一级目录列 `name[.ext]`；
    /// 文件路径不可列（NotFound），畸形路径是 InvalidPath。
    pub fn readdir(&self, path: &str) -> FsResult<Vec<String>> {
        let fs = self.fs.lock();
        match resolve(path) {
            PathClass::Root => Ok(fs.read_root(|root| {
                root.entries()
                    .iter()
                    .map(|e| String::from(e.name()))
                    .collect()
            })),
            PathClass::Directory(name) => {
                let dir_block = fs.dir_start(name).ok_or(FsError::NotFound)?;
                Ok(fs.read_dir_at(dir_block, |dir| {
                    dir.entries()
                        .iter()
                        .map(|e| {
                            if e.ext().is_empty() {
                                String::from(e.name())
                            } else {
                                format!("{}.{}", e.name(), e.ext())
                            }
                        })
                        .collect()
                }))
            }
            PathClass::File { .. } => Err(FsError::NotFound),
            PathClass::Invalid => Err(FsError::InvalidPath),
        }
    }

    /// 新建目录。根路径本身和文件形路径都不是合法目标。
    pub fn mkdir(&self, path: &str) -> FsResult<()> {
        match resolve(path) {
            PathClass::Directory(name) => self.fs.lock().create_directory(name),
            _ => Err(FsError::InvalidPath),
        }
    }

    /// 删除目录：从根记录里摘掉名字。
    /// 不要求目录为空，目录的起始块也不回收（孤块泄漏是既定行为）。
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        match resolve(path) {
            PathClass::Directory(name) => self.fs.lock().remove_directory(name),
            _ => Err(FsError::InvalidPath),
        }
    }

    /// 新建文件。路径必须带文件部分。
    pub fn create(&self, path: &str) -> FsResult<()> {
        match resolve(path) {
            PathClass::File {
                directory,
                name,
                extension,
            } => self.fs.lock().create_file(directory, name, extension),
            _ => Err(FsError::InvalidPath),
        }
    }

    /// 删除文件：从目录记录里摘掉表项，数据块不回收。
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        match resolve(path) {
            PathClass::File {
                directory,
                name,
                extension,
            } => self.fs.lock().remove_file(directory, name, extension),
            _ => Err(FsError::InvalidPath),
        }
    }

    /// 从文件 offset 处读数据到 buf，返回读到的字节数
    pub fn read_at(&self, path: &str, buf: &mut [u8], offset: usize) -> FsResult<usize> {
        match resolve(path) {
            PathClass::File {
                directory,
                name,
                extension,
            } => self
                .fs
                .lock()
                .read_file(directory, name, extension, buf, offset),
            _ => Err(FsError::InvalidPath),
        }
    }

    /// 把 buf 写入文件 offset 处，返回写入的字节数（受单块容量截断）
    pub fn write_at(&self, path: &str, buf: &[u8], offset: usize) -> FsResult<usize> {
        match resolve(path) {
            PathClass::File {
                directory,
                name,
                extension,
            } => self
                .fs
                .lock()
                .write_file(directory, name, extension, buf, offset),
            _ => Err(FsError::InvalidPath),
        }
    }
}
