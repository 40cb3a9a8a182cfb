//! Tick-driven таймеры и resumable tasks
//!
//! Никаких wall-clock callbacks: всё двигается накопленным `dt` из tick loop.
//!
//! - `ProgressTween` — нормализованное значение from → to за duration (equip, zoom)
//! - `ScheduledTask<T>` — "подожди N секунд, потом continuation T"
//! - `TaskSlot<T>` — максимум одна живая задача + generation-based cancellation
//!
//! Cancellation = generation++ → continuation старой задачи никогда не вернётся.

/// Потолок для накопительных таймеров (time since last shot, cooldowns)
pub const TIMER_CEILING: f32 = 60.0;

/// Clamp накопительного таймера в [0, TIMER_CEILING]
pub fn clamp_timer(value: f32) -> f32 {
    value.clamp(0.0, TIMER_CEILING)
}

/// Шаг tween'а
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenStep {
    /// Значение изменилось, tween продолжается
    Changed(f32),
    /// Достигли `to` на этом tick'е
    Completed(f32),
}

impl TweenStep {
    pub fn value(self) -> f32 {
        match self {
            TweenStep::Changed(value) | TweenStep::Completed(value) => value,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, TweenStep::Completed(_))
    }
}

/// Линейный tween нормализованного значения
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl ProgressTween {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    /// Advance на dt. Нулевая duration завершается на первом tick'е.
    pub fn tick(&mut self, dt: f32) -> TweenStep {
        self.elapsed += dt.max(0.0);

        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return TweenStep::Completed(self.to);
        }

        let t = self.elapsed / self.duration;
        TweenStep::Changed(self.from + (self.to - self.from) * t)
    }
}

/// Обратный отсчёт (reload, recoil recovery)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// true когда время вышло (на этом или прошлых tick'ах)
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        self.remaining <= 0.0
    }
}

/// "Подожди `remaining` секунд → отдай continuation"
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask<T> {
    countdown: Countdown,
    continuation: Option<T>,
}

impl<T> ScheduledTask<T> {
    pub fn new(wait: f32, continuation: T) -> Self {
        Self {
            countdown: Countdown::new(wait),
            continuation: Some(continuation),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.countdown.remaining()
    }

    /// Continuation отдаётся ровно один раз
    pub fn tick(&mut self, dt: f32) -> Option<T> {
        if self.countdown.tick(dt) {
            self.continuation.take()
        } else {
            None
        }
    }
}

/// Слот под одну живую задачу
///
/// `start` отменяет предыдущую (её continuation больше не вернётся).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSlot<T> {
    task: Option<ScheduledTask<T>>,
    generation: u64,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self {
            task: None,
            generation: 0,
        }
    }
}

impl<T> TaskSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запустить задачу, отменив текущую. Возвращает generation новой.
    pub fn start(&mut self, wait: f32, continuation: T) -> u64 {
        self.generation += 1;
        self.task = Some(ScheduledTask::new(wait, continuation));
        self.generation
    }

    /// Отмена без запуска новой
    pub fn cancel(&mut self) -> bool {
        let was_live = self.task.is_some();
        if was_live {
            self.generation += 1;
        }
        self.task = None;
        was_live
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn remaining(&self) -> Option<f32> {
        self.task.as_ref().map(ScheduledTask::remaining)
    }

    /// Advance. Continuation отдаётся вместе с generation, под которой задача стартовала.
    pub fn tick(&mut self, dt: f32) -> Option<(u64, T)> {
        let task = self.task.as_mut()?;
        let continuation = task.tick(dt)?;
        self.task = None;
        Some((self.generation, continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tween_progress_and_completion() {
        let mut tween = ProgressTween::new(0.0, 1.0, 1.0);
        assert_eq!(tween.tick(0.25), TweenStep::Changed(0.25));
        assert_eq!(tween.tick(0.25), TweenStep::Changed(0.5));
        assert!((tween.remaining() - 0.5).abs() < 1e-6);
        assert_eq!(tween.tick(0.75), TweenStep::Completed(1.0));
    }

    #[test]
    fn test_tween_reverse_from_partial() {
        let mut tween = ProgressTween::new(0.5, 0.0, 0.5);
        assert_eq!(tween.tick(0.25), TweenStep::Changed(0.25));
        assert!(tween.tick(0.25).is_completed());
    }

    #[test]
    fn test_zero_duration_tween_completes_immediately() {
        let mut tween = ProgressTween::new(1.0, 1.0, 0.0);
        assert_eq!(tween.tick(0.0), TweenStep::Completed(1.0));
    }

    #[test]
    fn test_countdown() {
        let mut countdown = Countdown::new(0.5);
        assert!(!countdown.tick(0.25));
        assert!(countdown.tick(0.25));
        assert!(countdown.tick(0.25)); // остаётся завершённым
    }

    #[test]
    fn test_scheduled_task_fires_once() {
        let mut task = ScheduledTask::new(0.2, "done");
        assert_eq!(task.tick(0.1), None);
        assert_eq!(task.tick(0.1), Some("done"));
        assert_eq!(task.tick(0.1), None);
    }

    #[test]
    fn test_task_slot_restart_cancels_previous() {
        let mut slot = TaskSlot::new();
        let first = slot.start(1.0, 1);
        slot.tick(0.5);

        let second = slot.start(1.0, 2);
        assert_ne!(first, second);

        // Старая задача истекла бы здесь — но её continuation уже потерян
        assert_eq!(slot.tick(0.5), None);
        assert_eq!(slot.tick(0.5), Some((second, 2)));
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_task_slot_cancel() {
        let mut slot = TaskSlot::new();
        slot.start(0.1, ());
        assert!(slot.cancel());
        assert_eq!(slot.tick(1.0), None);
        assert!(!slot.cancel());
    }

    #[test]
    fn test_clamp_timer() {
        assert_eq!(clamp_timer(-1.0), 0.0);
        assert_eq!(clamp_timer(75.0), TIMER_CEILING);
        assert_eq!(clamp_timer(3.5), 3.5);
    }
}
