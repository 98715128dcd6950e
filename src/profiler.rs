use std::time::{Duration, Instant};

/// Accumulates wall time spent in one named block.
#[derive(Debug, Clone)]
pub struct Profiler {
    name: String,
    started: Option<Instant>,
    passed: Duration,
    invocations: u32,
    display: String,
}

impl Profiler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: None,
            passed: Duration::ZERO,
            invocations: 0,
            display: format!("{name}: 0 ms"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.passed += started.elapsed();
            self.invocations += 1;
        }
    }

    pub fn invocations(&self) -> u32 {
        self.invocations
    }

    /// Average milliseconds per invocation (or per `divisor` when non-zero),
    /// then resets the counters.
    pub fn take_average_ms(&mut self, divisor: u32) -> f64 {
        let divisor = if divisor == 0 { self.invocations } else { divisor };
        let result = if divisor == 0 {
            0.0
        } else {
            self.passed.as_secs_f64() / divisor as f64 * 1000.0
        };
        self.display = format!("{}: {result:.02} ms", self.name);
        self.passed = Duration::ZERO;
        self.invocations = 0;
        result
    }

    /// Last computed readout, e.g. `update: 0.42 ms`.
    pub fn display(&self) -> &str {
        &self.display
    }
}

/// Named profilers owned by the engine.
#[derive(Debug, Clone, Default)]
pub struct ProfilerSet {
    profilers: Vec<Profiler>,
}

impl ProfilerSet {
    /// The profiler called `name`, created on first use.
    pub fn get(&mut self, name: &str) -> &mut Profiler {
        let index = match self.profilers.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.profilers.push(Profiler::new(name));
                self.profilers.len() - 1
            }
        };
        &mut self.profilers[index]
    }

    /// Times `f` under `name`.
    pub fn measure<R>(&mut self, name: &str, f: impl FnOnce() -> R) -> R {
        self.get(name).start();
        let result = f();
        self.get(name).stop();
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profiler> {
        self.profilers.iter()
    }

    /// Resets every profiler and returns their readouts.
    pub fn report(&mut self) -> Vec<String> {
        self.profilers
            .iter_mut()
            .map(|profiler| {
                profiler.take_average_ms(0);
                profiler.display().to_string()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_invocations_and_resets() {
        let mut set = ProfilerSet::default();
        set.measure("update", || std::thread::sleep(Duration::from_millis(2)));
        set.measure("update", || ());
        assert_eq!(set.get("update").invocations(), 2);
        let average = set.get("update").take_average_ms(0);
        assert!(average >= 1.0, "{average}");
        assert_eq!(set.get("update").invocations(), 0);
        assert_eq!(set.get("update").take_average_ms(0), 0.0);
    }

    #[test]
    fn stop_without_start_is_ignored() {
        let mut profiler = Profiler::new("draw");
        profiler.stop();
        assert_eq!(profiler.invocations(), 0);
        assert_eq!(profiler.display(), "draw: 0 ms");
        let report = {
            let mut set = ProfilerSet::default();
            set.get("draw");
            set.report()
        };
        assert_eq!(report, vec!["draw: 0.00 ms"]);
    }
}
