use std::time::Duration;

/// Runtime knobs for the timing controller.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Display tick. Only recomputes elapsed times; never touches distance,
    /// speed or lap state.
    pub tick_interval: Duration,

    /// Emit a full `Tick` event every N ticks (1 = every tick).
    pub tick_events_every: u32,

    /// Buffer for location fixes between the sampler and the sample loop.
    pub sample_channel_capacity: usize,

    /// Buffer for outgoing timing events.
    pub event_channel_capacity: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            tick_events_every: 1,
            sample_channel_capacity: 256,
            event_channel_capacity: 64,
        }
    }
}

impl TimingConfig {
    /// Defaults overridden by `LAPKEEPER_TICK_MS` and `LAPKEEPER_DEBUG`.
    ///
    /// Outside debug mode tick events are thinned to one per second so a
    /// log subscriber is not flooded.
    pub fn from_env() -> Self {
        let debug_mode = std::env::var("LAPKEEPER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = Self::default();
        if let Some(ms) = std::env::var("LAPKEEPER_TICK_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.tick_interval = Duration::from_millis(ms);
        }
        if !debug_mode {
            let per_second = 1000 / config.tick_interval.as_millis().max(1);
            config.tick_events_every = u32::try_from(per_second).unwrap_or(u32::MAX).max(1);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ticks_every_100ms() {
        let config = TimingConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.tick_events_every, 1);
    }
}
