#![no_std]

/// 块大小（字节数）
pub const BLOCK_SZ: usize = 512;

/// 镜像总块数。镜像大小固定为 5 MiB：
/// 0 号块存根目录记录，末尾 3 块存位图，其余为可分配区域。
pub const TOTAL_BLOCKS: usize = 10240;

extern crate alloc;

mod block_dev;
mod block_cache;
mod layout;
mod bitmap;
mod path;
mod error;
mod fs;
mod vfs;

pub use bitmap::Bitmap;
pub use block_cache::block_cache_sync_all;
pub use block_dev::BlockDevice;
pub use error::{FsError, FsResult};
pub use fs::DuoFileSystem;
pub use layout::{
    DirEntry, DirRecord, FileEntry, RootRecord, DIR_CAPACITY, EXT_LEN, NAME_LEN, ROOT_CAPACITY,
};
pub use path::{resolve, PathClass};
pub use vfs::{NodeAttr, Vfs};

#[cfg(test)]
pub(crate) mod test_util {
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use spin::Mutex;

    use crate::{BlockDevice, BLOCK_SZ, TOTAL_BLOCKS};

    /// 基于内存的块设备，测试专用。
    pub struct MemDisk(Mutex<Vec<u8>>);

    impl MemDisk {
        pub fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(vec![0u8; TOTAL_BLOCKS * BLOCK_SZ])))
        }
    }

    impl BlockDevice for MemDisk {
        fn read_block(&self, block_id: usize, buf: &mut [u8]) {
            let data = self.0.lock();
            let start = block_id * BLOCK_SZ;
            buf.copy_from_slice(&data[start..start + BLOCK_SZ]);
        }

        fn write_block(&self, block_id: usize, buf: &[u8]) {
            let mut data = self.0.lock();
            let start = block_id * BLOCK_SZ;
            data[start..start + BLOCK_SZ].copy_from_slice(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;

    use crate::test_util::MemDisk;
    use crate::{DuoFileSystem, FsError, NodeAttr, Vfs, BLOCK_SZ};

    /// 一个镜像上的完整操作流程：建目录、建文件、读写、删除。
    /// 所有对设备有副作用的断言集中在一个场景里，便于核对目录计数的变化。
    #[test]
    fn scenario() {
        let disk: Arc<dyn crate::BlockDevice> = MemDisk::new();
        let fs = DuoFileSystem::create(disk.clone());
        let vfs = Vfs::new(fs.clone());

        // 根路径永远存在
        assert_eq!(vfs.getattr("/").unwrap(), NodeAttr::Root);
        assert_eq!(vfs.readdir("/").unwrap(), alloc::vec::Vec::<String>::new());

        // 建目录并确认属性与列表
        vfs.mkdir("/docs").unwrap();
        assert_eq!(vfs.getattr("/docs").unwrap(), NodeAttr::Directory);
        assert_eq!(vfs.readdir("/").unwrap(), alloc::vec![String::from("docs")]);

        // mkdir 不幂等：重复创建报 AlreadyExists，目录数不变
        assert_eq!(vfs.mkdir("/docs"), Err(FsError::AlreadyExists));
        assert_eq!(vfs.readdir("/").unwrap().len(), 1);

        // 9 个字符的目录名超长，目录数不变
        assert_eq!(vfs.mkdir("/toolongab"), Err(FsError::NameTooLong));
        assert_eq!(vfs.readdir("/").unwrap().len(), 1);

        // 根路径与文件形路径都不是合法的 mkdir 目标
        assert_eq!(vfs.mkdir("/"), Err(FsError::InvalidPath));
        assert_eq!(vfs.mkdir("/docs/a.txt"), Err(FsError::InvalidPath));

        // 新文件大小为 0，列表里出现一次
        vfs.create("/docs/readme.txt").unwrap();
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: 0 }
        );
        assert_eq!(
            vfs.readdir("/docs").unwrap(),
            alloc::vec![String::from("readme.txt")]
        );
        assert_eq!(
            vfs.create("/docs/readme.txt"),
            Err(FsError::AlreadyExists)
        );

        // 所属目录不存在
        assert_eq!(
            vfs.create("/missing/readme.txt"),
            Err(FsError::NotFound)
        );

        // 写入后读回
        let text = b"hello, two level fs";
        assert_eq!(vfs.write_at("/docs/readme.txt", text, 0).unwrap(), text.len());
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: text.len() as u64 }
        );
        let mut buf = [0u8; 64];
        let n = vfs.read_at("/docs/readme.txt", &mut buf, 0).unwrap();
        assert_eq!(&buf[..n], &text[..]);

        // 偏移等于文件大小：读 0 字节且不报错；超过则报 InvalidOffset
        assert_eq!(vfs.read_at("/docs/readme.txt", &mut buf, text.len()).unwrap(), 0);
        assert_eq!(
            vfs.read_at("/docs/readme.txt", &mut buf, text.len() + 1),
            Err(FsError::InvalidOffset)
        );
        assert_eq!(
            vfs.write_at("/docs/readme.txt", b"x", text.len() + 1),
            Err(FsError::InvalidOffset)
        );

        // 单块上限：一次写满 512 字节后，再写只能写 0 字节
        let big = [0xabu8; BLOCK_SZ + 100];
        assert_eq!(vfs.write_at("/docs/readme.txt", &big, 0).unwrap(), BLOCK_SZ);
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: BLOCK_SZ as u64 }
        );
        assert_eq!(vfs.write_at("/docs/readme.txt", &big, BLOCK_SZ).unwrap(), 0);

        // 省略扩展名时按文件名匹配第一个表项
        assert_eq!(
            vfs.getattr("/docs/readme").unwrap(),
            NodeAttr::File { size: BLOCK_SZ as u64 }
        );

        // 删除后名字从列表消失，再次删除报 NotFound
        vfs.unlink("/docs/readme.txt").unwrap();
        assert_eq!(vfs.readdir("/docs").unwrap().len(), 0);
        assert_eq!(vfs.unlink("/docs/readme.txt"), Err(FsError::NotFound));
        assert_eq!(vfs.getattr("/docs/readme.txt"), Err(FsError::NotFound));

        vfs.rmdir("/docs").unwrap();
        assert_eq!(vfs.readdir("/").unwrap().len(), 0);
        assert_eq!(vfs.rmdir("/docs"), Err(FsError::NotFound));

        // 已删除目录的块仍被标记占用（不回收，见 DESIGN.md）
        let bit = fs.lock().bitmap().find_free(&disk).unwrap();
        assert!(bit > 2);
    }

    /// 同名不同扩展名的文件按记录顺序取第一个匹配项。
    #[test]
    fn extensionless_lookup_order() {
        let disk: Arc<dyn crate::BlockDevice> = MemDisk::new();
        let fs = DuoFileSystem::create(disk);
        let vfs = Vfs::new(fs);

        vfs.mkdir("/src").unwrap();
        vfs.create("/src/main.rs").unwrap();
        vfs.create("/src/main.old").unwrap();
        vfs.write_at("/src/main.rs", b"fn main() {}", 0).unwrap();

        // 无扩展名查询命中先创建的 main.rs
        assert_eq!(
            vfs.getattr("/src/main").unwrap(),
            NodeAttr::File { size: 12 }
        );
        // 指明扩展名则必须完全一致
        assert_eq!(
            vfs.getattr("/src/main.old").unwrap(),
            NodeAttr::File { size: 0 }
        );
        assert_eq!(vfs.getattr("/src/main.txt"), Err(FsError::NotFound));
    }
}
