use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// 提供每个通道最新滤波读数的数据源。
///
/// 分发引擎和校准流程只通过它读取数据，从不写入。
pub trait FilteredSource {
    fn filtered(&self, channel: usize) -> u16;
}

impl<const N: usize> FilteredSource for [u16; N] {
    fn filtered(&self, channel: usize) -> u16 {
        self[channel]
    }
}

/// 采样上下文与分发上下文之间共享的滤波读数数组。
///
/// 采样端（中断、定时器或后台任务）写入，分发端只读。
/// 每次访问都在临界区内完成，因此不要求目标平台的字读写是原子的。
pub struct FilteredValues<const N: usize> {
    values: Mutex<CriticalSectionRawMutex, Cell<[u16; N]>>,
}

impl<const N: usize> FilteredValues<N> {
    pub const fn new(initial: [u16; N]) -> Self {
        Self {
            values: Mutex::new(Cell::new(initial)),
        }
    }

    /// 写入单个通道的读数。
    pub fn store(&self, channel: usize, value: u16) {
        self.values.lock(|values| {
            let mut current = values.get();
            current[channel] = value;
            values.set(current);
        });
    }

    /// 一次性写入所有通道的读数。
    pub fn store_all(&self, new_values: [u16; N]) {
        self.values.lock(|values| values.set(new_values));
    }

    /// 获取所有通道读数的一份拷贝。
    pub fn snapshot(&self) -> [u16; N] {
        self.values.lock(|values| values.get())
    }
}

impl<const N: usize> FilteredSource for FilteredValues<N> {
    fn filtered(&self, channel: usize) -> u16 {
        self.values.lock(|values| values.get()[channel])
    }
}
