use embassy_time::{Duration, Timer};

use crate::source::FilteredValues;

/// 本地定义的异步触摸传感器读取trait，一次读出所有通道的原始值。
pub trait TouchSensor<const N: usize> {
    type Error;
    async fn read(&mut self) -> Result<[u16; N], Self::Error>;
}

/// 触摸读数滤波器的trait。
///
/// 滤波算法由使用者提供，这里只定义接口。
pub trait TouchFilter<const N: usize> {
    /// 处理一组新的原始读数。
    /// 如果滤波器已准备好输出有效值，则返回 `Some(values)`，否则返回 `None`。
    fn process(&mut self, raw: [u16; N]) -> Option<[u16; N]>;
}

pub mod filter {
    use super::*;

    /// 原始值滤波器，直接输出传感器读数。
    #[derive(Default)]
    pub struct RawFilter;

    impl<const N: usize> TouchFilter<N> for RawFilter {
        fn process(&mut self, raw: [u16; N]) -> Option<[u16; N]> {
            Some(raw)
        }
    }
}

/// 【后台采样器】拥有传感器，把滤波后的读数写入共享的 [`FilteredValues`]。
pub struct SamplerDriver<'a, S: TouchSensor<N>, F: TouchFilter<N>, const N: usize> {
    sensor: S,
    filter: F,
    values: &'a FilteredValues<N>,
    period: Duration,
}

impl<'a, S: TouchSensor<N>, F: TouchFilter<N>, const N: usize> SamplerDriver<'a, S, F, N> {
    /// 创建一个新的采样器。
    ///
    /// # 参数
    /// * `sensor`: 提供原始读数的传感器。
    /// * `filter`: 对原始读数做平滑处理的滤波器。
    /// * `values`: 与分发引擎共享的读数存储。
    /// * `period`: 两次采样之间的间隔。
    pub fn new(sensor: S, filter: F, values: &'a FilteredValues<N>, period: Duration) -> Self {
        Self {
            sensor,
            filter,
            values,
            period,
        }
    }

    /// 运行采样循环。需要被 spawn 到后台任务中。
    pub async fn run(mut self) -> ! {
        loop {
            match self.sensor.read().await {
                Ok(raw) => {
                    if let Some(filtered) = self.filter.process(raw) {
                        self.values.store_all(filtered);
                    }
                }
                Err(_) => warn!("touch sensor read failed"),
            }
            Timer::after(self.period).await;
        }
    }
}
