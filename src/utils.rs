use std::time::Duration;

/// Evaluates an expression, logs how long it took at debug level and
/// yields its value.
macro_rules! timed {
    ($expr:expr, $label:expr) => {{
        let start = std::time::Instant::now();
        let result = $expr;
        log::debug!("{} took {:?}", $label, start.elapsed());
        result
    }};
}
pub(crate) use timed;

/// Running average of meshing pass durations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarchStats {
    passes: u32,
    total: Duration,
}

impl MarchStats {
    pub fn record(&mut self, elapsed: Duration) {
        self.passes += 1;
        self.total += elapsed;
    }

    #[inline]
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn average(&self) -> Option<Duration> {
        (self.passes > 0).then(|| self.total / self.passes)
    }
}

#[test]
fn running_average() {
    let mut stats = MarchStats::default();
    assert_eq!(stats.average(), None);
    stats.record(Duration::from_millis(10));
    stats.record(Duration::from_millis(30));
    assert_eq!(stats.passes(), 2);
    assert_eq!(stats.average(), Some(Duration::from_millis(20)));
}

#[test]
fn timed_yields_value() {
    let value = timed!(2 + 2, "addition");
    assert_eq!(value, 4);
}
