use embassy_time::Duration;

use crate::{config::BoundaryTable, DurationClass};

/// 将一次持续按压的已用时间映射为时长等级。
///
/// 从最高等级向下查找，返回第一个满足最小时间的等级。
/// 一个也不满足时返回 `Short`：调用方只会在通道持续按下时调用它，
/// 所以这里永远不会返回 `NoPress`，`NoPress` 只来自状态机的释放转换。
pub fn classify(elapsed: Duration, boundaries: &BoundaryTable) -> DurationClass {
    boundaries
        .descending()
        .into_iter()
        .find(|(_, minimum)| elapsed >= *minimum)
        .map(|(class, _)| class)
        .unwrap_or(DurationClass::Short)
}
