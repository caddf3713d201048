use core::any::Any;

/// 块设备操作接口
/// 向上隐藏镜像文件 / 内存盘等具体介质的读写细节。
/// 本层只支持整块读写，调用方需要自行做"读出-修改-写回"。
pub trait BlockDevice: Send + Sync + Any {
    /// 读取 block_id 对应的整块数据到 buf
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    /// 将 buf 整块写入 block_id 对应的位置
    fn write_block(&self, block_id: usize, buf: &[u8]);
}
