use core::fmt;

/// 文件系统操作的错误种类。
/// 目录层的错误原样向上传递给操作层和调用方，不做重试和兜底；
/// 同样的输入永远得到同一种错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 路径没有对应的实体
    NotFound,
    /// 同名实体已存在
    AlreadyExists,
    /// 名字或扩展名超出 8/3 字符上限
    NameTooLong,
    /// 根记录或目录记录已满
    CapacityExceeded,
    /// 位图里没有空闲块了
    AllocationFailed,
    /// 路径形状不合法（比如对根执行文件操作）
    InvalidPath,
    /// 读写偏移超出了文件的当前大小
    InvalidOffset,
}

pub type FsResult<T> = Result<T, FsError>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "no such directory or file",
            FsError::AlreadyExists => "name already exists",
            FsError::NameTooLong => "name exceeds the 8.3 limit",
            FsError::CapacityExceeded => "record is full",
            FsError::AllocationFailed => "no free block left",
            FsError::InvalidPath => "malformed path",
            FsError::InvalidOffset => "offset beyond end of file",
        };
        write!(f, "{}", msg)
    }
}
