use clap::App;
use clap::Arg;
use duo_fs::{BlockDevice, DuoFileSystem, Vfs, BLOCK_SZ, TOTAL_BLOCKS};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::Mutex;

/// 把一个普通文件当作块设备用
struct BlockFile(Mutex<File>);

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SZ) as u64))
            .expect("Error when seeking!");
        assert_eq!(file.read(buf).unwrap(), BLOCK_SZ, "Not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SZ) as u64))
            .expect("Error when seeking!");
        assert_eq!(file.write(buf).unwrap(), BLOCK_SZ, "Not a complete block!");
    }
}

fn duo_fs_tool() -> std::io::Result<()> {
    let matches = App::new("duo-fs image tool")
        .arg(
            Arg::with_name("image")
                .short("i")
                .long("image")
                .takes_value(true)
                .required(true)
                .help("Backing disk image (5 MiB, created and formatted on demand)"),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .help("Format the image before running other actions"),
        )
        .arg(
            Arg::with_name("mkdir")
                .short("d")
                .long("mkdir")
                .takes_value(true)
                .multiple(true)
                .help("Create a directory, e.g. /docs"),
        )
        .arg(
            Arg::with_name("touch")
                .short("t")
                .long("touch")
                .takes_value(true)
                .multiple(true)
                .help("Create an empty file, e.g. /docs/readme.txt"),
        )
        .arg(
            Arg::with_name("list")
                .short("l")
                .long("list")
                .takes_value(true)
                .multiple(true)
                .help("List a directory, e.g. / or /docs"),
        )
        .get_matches();

    let image_path = matches.value_of("image").unwrap();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(image_path)?;
    let fresh = file.metadata()?.len() == 0;
    file.set_len((TOTAL_BLOCKS * BLOCK_SZ) as u64)?;
    let block_file: Arc<dyn BlockDevice> = Arc::new(BlockFile(Mutex::new(file)));

    let fs = if fresh || matches.is_present("format") {
        println!("formatting {}", image_path);
        DuoFileSystem::create(block_file)
    } else {
        DuoFileSystem::open(block_file)
    };
    let vfs = Vfs::new(fs);

    if let Some(paths) = matches.values_of("mkdir") {
        for path in paths {
            if let Err(e) = vfs.mkdir(path) {
                eprintln!("mkdir {}: {}", path, e);
            }
        }
    }
    if let Some(paths) = matches.values_of("touch") {
        for path in paths {
            if let Err(e) = vfs.create(path) {
                eprintln!("touch {}: {}", path, e);
            }
        }
    }
    let list_paths: Vec<&str> = match matches.values_of("list") {
        Some(values) => values.collect(),
        None => vec!["/"],
    };
    for path in list_paths {
        match vfs.readdir(path) {
            Ok(entries) => {
                println!("{}:", path);
                for name in entries {
                    println!("  {}", name);
                }
            }
            Err(e) => eprintln!("list {}: {}", path, e),
        }
    }
    Ok(())
}

fn main() {
    duo_fs_tool().expect("Error when operating on the duo-fs image!");
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_fs::{FsError, NodeAttr};

    fn open_image(name: &str) -> Arc<dyn BlockDevice> {
        let path = std::env::temp_dir().join(name);
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .unwrap();
        f.set_len((TOTAL_BLOCKS * BLOCK_SZ) as u64).unwrap();
        Arc::new(BlockFile(Mutex::new(f)))
    }

    #[test]
    fn fs_test() -> std::io::Result<()> {
        let block_file = open_image("duo-fs-test.img");
        let fs = DuoFileSystem::create(block_file);
        let vfs = Vfs::new(fs);

        vfs.mkdir("/docs").unwrap();
        assert_eq!(vfs.getattr("/docs").unwrap(), NodeAttr::Directory);
        vfs.create("/docs/readme.txt").unwrap();
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: 0 }
        );
        assert_eq!(vfs.readdir("/docs").unwrap(), vec!["readme.txt"]);

        // 不存在的目录下建文件
        assert_eq!(vfs.create("/missing/readme.txt"), Err(FsError::NotFound));
        // 9 个字符的目录名
        assert_eq!(vfs.mkdir("/ninechars"), Err(FsError::NameTooLong));
        assert_eq!(vfs.readdir("/").unwrap(), vec!["docs"]);

        // 随机内容写入后读回
        let payload: Vec<u8> = (0..300).map(|_| rand::random::<u8>()).collect();
        assert_eq!(vfs.write_at("/docs/readme.txt", &payload, 0).unwrap(), 300);
        let mut buf = [0u8; BLOCK_SZ];
        let n = vfs.read_at("/docs/readme.txt", &mut buf, 0).unwrap();
        assert_eq!(&buf[..n], payload.as_slice());

        // 追加写：从当前大小处继续
        let tail: Vec<u8> = (0..100).map(|_| rand::random::<u8>()).collect();
        assert_eq!(vfs.write_at("/docs/readme.txt", &tail, 300).unwrap(), 100);
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: 400 }
        );
        let n = vfs.read_at("/docs/readme.txt", &mut buf, 300).unwrap();
        assert_eq!(&buf[..n], tail.as_slice());

        // 单块容量：超长写入被截断到 512 字节
        let oversized: Vec<u8> = (0..700).map(|_| rand::random::<u8>()).collect();
        assert_eq!(
            vfs.write_at("/docs/readme.txt", &oversized, 0).unwrap(),
            BLOCK_SZ
        );
        let n = vfs.read_at("/docs/readme.txt", &mut buf, 0).unwrap();
        assert_eq!(n, BLOCK_SZ);
        assert_eq!(&buf[..], &oversized[..BLOCK_SZ]);

        // 重新打开镜像，记录都在
        let reopened = open_image("duo-fs-test.img");
        let fs = DuoFileSystem::open(reopened);
        let vfs = Vfs::new(fs);
        assert_eq!(vfs.readdir("/").unwrap(), vec!["docs"]);
        assert_eq!(
            vfs.getattr("/docs/readme.txt").unwrap(),
            NodeAttr::File { size: BLOCK_SZ as u64 }
        );

        Ok(())
    }

    #[test]
    fn capacity_limits() -> std::io::Result<()> {
        let block_file = open_image("duo-fs-capacity.img");
        let fs = DuoFileSystem::create(block_file);
        let vfs = Vfs::new(fs);

        // 根记录装满 29 个目录后拒绝第 30 个
        for i in 0..duo_fs::ROOT_CAPACITY {
            vfs.mkdir(&format!("/d{:02}", i)).unwrap();
        }
        assert_eq!(vfs.mkdir("/onemore"), Err(FsError::CapacityExceeded));
        assert_eq!(vfs.readdir("/").unwrap().len(), duo_fs::ROOT_CAPACITY);

        // 目录记录装满 17 个文件后拒绝第 18 个
        for i in 0..duo_fs::DIR_CAPACITY {
            vfs.create(&format!("/d00/f{:02}.txt", i)).unwrap();
        }
        assert_eq!(
            vfs.create("/d00/onemore.txt"),
            Err(FsError::CapacityExceeded)
        );
        assert_eq!(vfs.readdir("/d00").unwrap().len(), duo_fs::DIR_CAPACITY);

        Ok(())
    }
}
