use embassy_time::Instant;

use crate::{classify::classify, config::DispatchConfig, Callback, DurationClass, TriggerMode};

/// 通道的瞬时按压状态，只由读数与阈值比较得出，不含时间信息。
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressState {
    Pressed,
    NotPressed,
}

/// 单个触摸通道的静态配置与运行时状态。
///
/// 通道数组在整个生命周期内复用，禁用只是把记录重置为初始值。
#[derive(Clone, Copy)]
pub(crate) struct Channel<'a> {
    pub(crate) enabled: bool,
    pub(crate) threshold_percent: u8,
    pub(crate) threshold: u16,
    pub(crate) trigger_mode: TriggerMode,
    pub(crate) callbacks: [Option<Callback<'a>>; DurationClass::COUNT],
    pub(crate) press_state: PressState,
    pub(crate) duration_class: DurationClass,
    pub(crate) press_started_at: Instant,
    pub(crate) filtered_value: u16,
    /// 为 false 时，在观察到一次释放之前不触发任何回调。
    pub(crate) armed: bool,
}

impl<'a> Channel<'a> {
    pub(crate) const fn new() -> Self {
        Self {
            enabled: false,
            threshold_percent: 0,
            threshold: 0,
            trigger_mode: TriggerMode::Rise,
            callbacks: [None; DurationClass::COUNT],
            press_state: PressState::NotPressed,
            duration_class: DurationClass::NoPress,
            press_started_at: Instant::from_ticks(0),
            filtered_value: 0,
            armed: true,
        }
    }

    pub(crate) fn callback(&self, class: DurationClass) -> Option<Callback<'a>> {
        self.callbacks[class as usize]
    }

    fn instantaneous_state(&self, filtered_value: u16, release_hysteresis: u16) -> PressState {
        let cutoff = match self.press_state {
            PressState::Pressed => self.threshold.saturating_add(release_hysteresis),
            PressState::NotPressed => self.threshold,
        };
        if filtered_value < cutoff {
            PressState::Pressed
        } else {
            PressState::NotPressed
        }
    }

    /// 用最新的滤波读数推进状态机，返回本次推进前的时长等级。
    pub(crate) fn advance(
        &mut self,
        filtered_value: u16,
        now: Instant,
        config: &DispatchConfig,
    ) -> DurationClass {
        let previous = self.duration_class;
        let current = self.instantaneous_state(filtered_value, config.release_hysteresis);

        match (current, self.press_state) {
            (PressState::Pressed, PressState::NotPressed) => {
                // 刚接触，还没有累计任何时长
                self.press_started_at = now;
            }
            (PressState::Pressed, PressState::Pressed) => {
                let elapsed = now.saturating_duration_since(self.press_started_at);
                // 一次连续按压内等级只升不降
                self.duration_class = self
                    .duration_class
                    .max(classify(elapsed, &config.boundaries));
            }
            (PressState::NotPressed, _) => {
                self.duration_class = DurationClass::NoPress;
            }
        }

        self.press_state = current;
        self.filtered_value = filtered_value;
        previous
    }

    /// 根据触发模式决定本次应触发哪个等级的回调。
    pub(crate) fn due_class(&self, previous: DurationClass) -> Option<DurationClass> {
        let current = self.duration_class;
        match self.trigger_mode {
            TriggerMode::Rise if current != DurationClass::NoPress && current != previous => {
                Some(current)
            }
            TriggerMode::Fall
                if current == DurationClass::NoPress && previous != DurationClass::NoPress =>
            {
                Some(previous)
            }
            _ => None,
        }
    }
}
