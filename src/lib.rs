#![no_std]
#![allow(async_fn_in_trait)]

#[macro_use]
mod fmt;

mod channel;
pub mod classify;
pub mod config;
pub mod sampler;
pub mod source;

pub use channel::PressState;
pub use config::*;
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Instant, Ticker};
pub use source::{FilteredSource, FilteredValues};

use crate::channel::Channel;

/// 用户回调。回调在分发循环中同步执行，应尽快返回且不能 panic。
pub type Callback<'a> = &'a dyn Fn();

/// 一次连续按压的时长等级，按 `NoPress < Short < Medium < Long` 排序。
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DurationClass {
    NoPress,
    Short,
    Medium,
    Long,
}

impl DurationClass {
    pub const COUNT: usize = 4;
}

/// 回调的触发方式，每个通道只有一个。
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// 进入某个时长等级时触发该等级的回调。
    Rise,
    /// 从按下回到未按下时，触发释放前所处等级的回调。
    /// 这样即使一个通道注册了多个等级，每次按压也只会触发一次。
    Fall,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 通道号超出范围。
    InvalidChannel(usize),
    /// 阈值百分比大于 100。
    InvalidThresholdPercent(u8),
    /// 边界表的最小时间不是严格递增的。
    InvalidBoundaries,
    /// 分发周期为 0。
    InvalidDispatchPeriod,
    /// 通道已启用，但阈值仍为初始值 0。
    NotCalibrated(usize),
}

/// 单个通道的只读诊断快照。
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub enabled: bool,
    pub threshold_percent: u8,
    pub threshold: u16,
    pub filtered_value: u16,
    pub press_state: PressState,
    pub duration_class: DurationClass,
}

/// 一组电容触摸按键及其周期性回调分发引擎。
///
/// 通道数 `N` 在编译期确定。所有配置都保存在这个结构体里，
/// 分发循环持有它的唯一可变引用。
pub struct TouchButtons<'a, const N: usize> {
    config: DispatchConfig,
    channels: [Channel<'a>; N],
    last_callback_at: Option<Instant>,
}

impl<'a, const N: usize> TouchButtons<'a, N> {
    /// 创建一组新的按键，所有通道都处于禁用状态。
    ///
    /// `config.dispatch_period` 为 0 时 panic。
    pub fn new(config: DispatchConfig) -> Self {
        assert!(
            config.validate().is_ok(),
            "dispatch period must be greater than zero"
        );
        Self {
            config,
            channels: [Channel::new(); N],
            last_callback_at: None,
        }
    }

    /// 将通道配置为触摸输入，并为指定的时长等级注册回调。
    ///
    /// # 参数
    /// * `channel`: 通道号，范围 `0..N`。
    /// * `threshold_percent`: 校准时使用的阈值，占空闲读数的百分比。
    /// * `callback`: 该等级的回调，`None` 表示清除已注册的回调。
    /// * `class`: 回调对应的时长等级。
    /// * `trigger_mode`: 触发方式。它是通道级别的，最后一次调用生效。
    ///
    /// 只修改配置，不触碰运行时状态：按住期间重新配置不会让时长等级回退。
    pub fn configure(
        &mut self,
        channel: usize,
        threshold_percent: u8,
        callback: Option<Callback<'a>>,
        class: DurationClass,
        trigger_mode: TriggerMode,
    ) -> Result<(), Error> {
        if threshold_percent > 100 {
            return Err(Error::InvalidThresholdPercent(threshold_percent));
        }
        let ch = self.channel_mut(channel)?;
        debug!("registering callback for touch input {}", channel);
        ch.enabled = true;
        ch.threshold_percent = threshold_percent;
        ch.callbacks[class as usize] = callback;
        ch.trigger_mode = trigger_mode;
        Ok(())
    }

    /// 禁用通道，清除所有回调并将其重置为初始状态。
    pub fn disable(&mut self, channel: usize) -> Result<(), Error> {
        *self.channel_mut(channel)? = Channel::new();
        Ok(())
    }

    pub fn disable_all(&mut self) {
        self.channels.fill(Channel::new());
    }

    /// 在通道观察到一次释放之前，抑制它的所有回调。
    ///
    /// 用于回调改变了按键行为的场景：手指仍按在按键上时不会立即触发新注册的回调。
    pub fn wait_for_release(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_mut(channel)?.armed = false;
        Ok(())
    }

    /// 根据空闲读数重新计算所有已启用通道的阈值。
    ///
    /// 调用时所有按键都必须处于未按下状态，这里不做检查。
    pub fn calibrate<S: FilteredSource + ?Sized>(&mut self, source: &S) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if !ch.enabled {
                continue;
            }
            let baseline = source.filtered(i);
            ch.threshold = (u32::from(baseline) * u32::from(ch.threshold_percent) / 100) as u16;
            info!(
                "touch input {}: baseline {}, threshold {}",
                i,
                baseline,
                ch.threshold
            );
        }
    }

    /// 检查所有已启用通道是否已经校准。
    pub fn ensure_calibrated(&self) -> Result<(), Error> {
        match self
            .channels
            .iter()
            .position(|ch| ch.enabled && ch.threshold == 0)
        {
            Some(i) => Err(Error::NotCalibrated(i)),
            None => Ok(()),
        }
    }

    /// 推进一次所有已启用通道的状态机，并按触发方式分发回调。
    ///
    /// 每个通道每次最多触发一个回调，回调同步执行。
    pub fn tick<S: FilteredSource + ?Sized>(&mut self, source: &S, now: Instant) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if !ch.enabled {
                continue;
            }
            let armed = ch.armed;
            let previous = ch.advance(source.filtered(i), now, &self.config);
            if ch.press_state == PressState::NotPressed {
                ch.armed = true;
            }
            if !armed {
                continue;
            }
            let Some(class) = ch.due_class(previous) else {
                continue;
            };
            if let Some(callback) = ch.callback(class) {
                trace!("dispatching {} callback for touch input {}", class, i);
                callback();
                self.last_callback_at = Some(now);
            }
        }
    }

    /// 以 `dispatch_period` 为周期不停地分发回调。
    pub async fn run<S: FilteredSource + ?Sized>(&mut self, source: &S) -> ! {
        self.warn_uncalibrated();
        let mut ticker = Ticker::every(self.config.dispatch_period);
        loop {
            ticker.next().await;
            self.tick(source, Instant::now());
        }
    }

    /// 与 [`run`](Self::run) 相同，但在 `stop` 收到信号后返回。
    pub async fn run_until<S: FilteredSource + ?Sized>(
        &mut self,
        source: &S,
        stop: &Signal<CriticalSectionRawMutex, ()>,
    ) {
        self.warn_uncalibrated();
        let mut ticker = Ticker::every(self.config.dispatch_period);
        loop {
            match select(stop.wait(), ticker.next()).await {
                Either::First(_) => {
                    debug!("touch dispatch stopped");
                    return;
                }
                Either::Second(_) => self.tick(source, Instant::now()),
            }
        }
    }

    /// 校准所有已启用通道，然后开始周期性分发。
    ///
    /// 必须在所有回调都注册完之后调用。
    pub async fn begin<S: FilteredSource + ?Sized>(&mut self, source: &S) -> ! {
        self.calibrate(source);
        self.run(source).await
    }

    /// 距离上一次回调触发经过的时间。从未触发过时返回 `None`。
    pub fn time_since_last_callback(&self) -> Option<Duration> {
        self.time_since_last_callback_at(Instant::now())
    }

    pub fn time_since_last_callback_at(&self, now: Instant) -> Option<Duration> {
        self.last_callback_at.map(|at| now.saturating_duration_since(at))
    }

    /// 通过日志输出所有已启用通道的当前读数和阈值。
    pub fn diagnostics(&self) {
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.enabled {
                info!(
                    "touch input {}: value {}, threshold {}",
                    i,
                    ch.filtered_value,
                    ch.threshold
                );
            }
        }
    }

    pub fn status(&self, channel: usize) -> Result<ChannelStatus, Error> {
        let ch = self.channel_ref(channel)?;
        Ok(ChannelStatus {
            enabled: ch.enabled,
            threshold_percent: ch.threshold_percent,
            threshold: ch.threshold,
            filtered_value: ch.filtered_value,
            press_state: ch.press_state,
            duration_class: ch.duration_class,
        })
    }

    pub fn is_enabled(&self, channel: usize) -> Result<bool, Error> {
        Ok(self.channel_ref(channel)?.enabled)
    }

    pub fn has_callback(&self, channel: usize, class: DurationClass) -> Result<bool, Error> {
        Ok(self.channel_ref(channel)?.callback(class).is_some())
    }

    pub fn threshold(&self, channel: usize) -> Result<u16, Error> {
        Ok(self.channel_ref(channel)?.threshold)
    }

    pub fn filtered_value(&self, channel: usize) -> Result<u16, Error> {
        Ok(self.channel_ref(channel)?.filtered_value)
    }

    pub fn press_state(&self, channel: usize) -> Result<PressState, Error> {
        Ok(self.channel_ref(channel)?.press_state)
    }

    pub fn duration_class(&self, channel: usize) -> Result<DurationClass, Error> {
        Ok(self.channel_ref(channel)?.duration_class)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// 替换配置。分发周期为 0 时返回 [`Error::InvalidDispatchPeriod`]，原配置保持不变。
    pub fn set_config(&mut self, new_config: DispatchConfig) -> Result<(), Error> {
        new_config.validate()?;
        self.config = new_config;
        Ok(())
    }

    fn warn_uncalibrated(&self) {
        if let Err(Error::NotCalibrated(i)) = self.ensure_calibrated() {
            warn!("touch input {} is enabled but not calibrated", i);
        }
    }

    fn channel_ref(&self, channel: usize) -> Result<&Channel<'a>, Error> {
        self.channels
            .get(channel)
            .ok_or(Error::InvalidChannel(channel))
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut Channel<'a>, Error> {
        self.channels
            .get_mut(channel)
            .ok_or(Error::InvalidChannel(channel))
    }
}
