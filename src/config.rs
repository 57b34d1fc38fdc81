use embassy_time::Duration;

use crate::{DurationClass, Error};

/// 按压时长分级的边界表。
///
/// 每个等级对应一个最小持续时间，三者必须严格递增。
/// 判定时从最高等级向下查找，第一个满足条件的等级即为结果。
///
/// 注意：持续按压即使未达到 `short` 也会被判定为 `Short`（见 [`classify`](crate::classify::classify)），
/// 所以 `short` 不会过滤掉短暂的毛刺：跨过两次分发的触碰在 `Rise` 模式下就会触发短按回调。
/// `short` 只参与边界递增的校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundaryTable {
    short: Duration,
    medium: Duration,
    long: Duration,
}

impl BoundaryTable {
    /// 创建一个新的边界表。
    ///
    /// 如果 `short < medium < long` 不成立，返回 [`Error::InvalidBoundaries`]。
    pub fn new(short: Duration, medium: Duration, long: Duration) -> Result<Self, Error> {
        if short < medium && medium < long {
            Ok(Self {
                short,
                medium,
                long,
            })
        } else {
            Err(Error::InvalidBoundaries)
        }
    }

    /// 返回某个等级的最小持续时间。`NoPress` 没有边界。
    pub fn minimum(&self, class: DurationClass) -> Option<Duration> {
        match class {
            DurationClass::NoPress => None,
            DurationClass::Short => Some(self.short),
            DurationClass::Medium => Some(self.medium),
            DurationClass::Long => Some(self.long),
        }
    }

    /// 按从高到低的顺序返回 (等级, 最小持续时间)。
    pub fn descending(&self) -> [(DurationClass, Duration); 3] {
        [
            (DurationClass::Long, self.long),
            (DurationClass::Medium, self.medium),
            (DurationClass::Short, self.short),
        ]
    }
}

impl Default for BoundaryTable {
    /// - 短按: 50ms
    /// - 中按: 300ms
    /// - 长按: 2000ms
    fn default() -> Self {
        Self {
            short: Duration::from_millis(50),
            medium: Duration::from_millis(300),
            long: Duration::from_millis(2000),
        }
    }
}

/// 分发引擎的配置参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchConfig {
    /// 周期性分发的间隔。
    ///
    /// `run` 循环每隔这么久推进一次所有通道的状态机。必须大于 0，
    /// 否则 `run` 会变成忙等循环。
    pub dispatch_period: Duration,

    /// 按压时长分级边界。
    pub boundaries: BoundaryTable,

    /// 释放迟滞（传感器单位）。
    ///
    /// 为 0 时只有一个阈值：读数低于阈值即为按下。
    /// 大于 0 时，已按下的通道需要读数回到 `threshold + release_hysteresis`
    /// 及以上才会判定为释放，用来抑制阈值附近的抖动。
    pub release_hysteresis: u16,
}

impl DispatchConfig {
    /// 检查配置是否可用。
    pub fn validate(&self) -> Result<(), Error> {
        if self.dispatch_period == Duration::from_ticks(0) {
            return Err(Error::InvalidDispatchPeriod);
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    /// - 分发周期: 20ms
    /// - 边界表: [`BoundaryTable::default`]
    /// - 释放迟滞: 0
    fn default() -> Self {
        Self {
            dispatch_period: Duration::from_millis(20),
            boundaries: BoundaryTable::default(),
            release_hysteresis: 0,
        }
    }
}
